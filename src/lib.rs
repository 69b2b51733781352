//! # hashfs
//!
//! A reader for the HashFS archives SCS Software packs its game assets into.
//!
//! This library opens `.scs` containers of both on-disk layouts (v1 and v2),
//! resolves members by the salted CityHash64 of their path, decodes
//! directory listings and extracts content, inflating zlib-compressed
//! members on the way.
//!
//! ## Features
//!
//! - HashFS v1 (flat entry table, text directory listings)
//! - HashFS v2 (compressed entry/metadata tables, binary directory listings)
//! - Extraction to memory or to disk
//! - A [`FileSystem`] abstraction over archives and unpacked directories
//!
//! ## Example
//!
//! ```no_run
//! use hashfs::{EntryKind, HashFsReader};
//!
//! fn main() -> anyhow::Result<()> {
//!     let reader = HashFsReader::open("def.scs")?;
//!
//!     // List the root directory
//!     let root = reader.get_directory_listing("/", false, true)?;
//!     for file in &root.files {
//!         println!("{file}");
//!     }
//!
//!     if reader.entry_exists("/manifest.sii") == EntryKind::File {
//!         let manifest = reader.extract("/manifest.sii")?;
//!         println!("{}", String::from_utf8_lossy(&manifest));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod hashfs;
pub mod io;
pub mod vfs;

pub use cli::Cli;
pub use hashfs::{v1, v2};
pub use hashfs::{
    DirectoryListing, Entry, EntryKind, Error, HashFsReader, ReaderOptions, Result, Version,
    hash_path,
};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use vfs::{DiskFileSystem, FileSystem};
