//! HashFS archive parsing and extraction.
//!
//! HashFS is the hash-indexed, read-only container format SCS games use to
//! pack their asset tree. Member names are never stored in the entry table;
//! each member is keyed by the CityHash64 of its path (see [`hash`]), and
//! the hierarchy is only recoverable from the content of directory entries.
//!
//! ## Architecture
//!
//! - [`structures`]: headers, table records, flags and the shared [`Entry`] model
//! - [`v1`]: flat 32-byte entry table, text directory listings
//! - [`v2`]: compressed entry and metadata tables, binary directory listings
//! - [`reader`]: the version-dispatching [`HashFsReader`]
//!
//! ## Container Overview
//!
//! Both versions start with the magic `SCS#` and a `u16` version, followed
//! by the version specific header. All integers are little-endian.
//!
//! ## Limitations
//!
//! - No write or repack support
//! - Packed tobj/dds hybrid entries (v2) are returned undecoded

mod error;
pub mod hash;
mod reader;
mod structures;
pub mod v1;
pub mod v2;

pub use error::{Error, Result};
pub use hash::hash_path;
pub use reader::{HashFsReader, ReaderOptions, normalize};
pub use structures::*;
