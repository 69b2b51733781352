//! HashFS v1 layout.
//!
//! A v1 archive is a 20-byte header followed by member data, with a flat
//! table of 32-byte entry records usually found at `start_offset`.
//! Directory listings are newline separated text where a leading `*`
//! marks a subdirectory.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::io::{self, Cursor};

use tracing::{debug, trace};

use crate::io::ReadAt;

use super::error::Result;
use super::reader::check_hash_method;
use super::structures::*;

/// Parsed v1 header and entry table
#[derive(Debug)]
pub struct HashFsV1 {
    header: HeaderV1,
    entries: HashMap<u64, Entry>,
    /// Extra directory records sharing a hash with the one in `entries`
    fragments: HashMap<u64, Vec<Entry>>,
}

impl HashFsV1 {
    /// Parse the header and the full entry table.
    ///
    /// With `force_entry_table_at_end` the table is read from the last
    /// `entries_count * 32` bytes of the source instead of `start_offset`.
    pub fn parse<R: ReadAt>(source: &R, force_entry_table_at_end: bool) -> Result<Self> {
        let mut buf = [0u8; HeaderV1::SIZE];
        source.read_exact_at(PREAMBLE_SIZE as u64, &mut buf)?;
        let header = HeaderV1::from_bytes(&buf)?;
        check_hash_method(&header.hash_method)?;

        let table_len = u64::from(header.entries_count) * EntryRecordV1::SIZE as u64;
        let table_offset = if force_entry_table_at_end {
            source.size().checked_sub(table_len).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry table of {table_len} bytes does not fit in the archive"),
                )
            })?
        } else {
            u64::from(header.start_offset)
        };

        debug!(
            "v1 archive: salt {}, {} entries, table at {:#x}",
            header.salt, header.entries_count, table_offset
        );

        let table = source.read_vec_at(table_offset, table_len)?;

        let mut cursor = Cursor::new(&table);
        let mut entries = HashMap::with_capacity(header.entries_count as usize);
        let mut fragments: HashMap<u64, Vec<Entry>> = HashMap::new();

        for _ in 0..header.entries_count {
            let entry = EntryRecordV1::read_from(&mut cursor)?.into_entry();
            trace!("v1 entry {:#018x} at {:#x}", entry.hash, entry.offset);

            match entries.entry(entry.hash) {
                MapEntry::Vacant(slot) => {
                    slot.insert(entry);
                }
                MapEntry::Occupied(existing) => {
                    if existing.get().is_directory && entry.is_directory {
                        fragments.entry(entry.hash).or_default().push(entry);
                    } else {
                        debug!("discarding duplicate entry {:#018x}", entry.hash);
                    }
                }
            }
        }

        if !fragments.is_empty() {
            debug!("{} directories are split into fragments", fragments.len());
        }

        Ok(Self {
            header,
            entries,
            fragments,
        })
    }

    pub fn header(&self) -> &HeaderV1 {
        &self.header
    }

    pub fn salt(&self) -> u16 {
        self.header.salt
    }

    pub fn entries(&self) -> &HashMap<u64, Entry> {
        &self.entries
    }

    /// Additional fragments of the directory with this hash, in table order.
    pub fn fragments(&self, hash: u64) -> &[Entry] {
        self.fragments.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Parse the text content of one v1 directory record.
pub fn parse_listing(data: &[u8], files_only: bool) -> DirectoryListing {
    let text = String::from_utf8_lossy(data);
    let mut listing = DirectoryListing::default();

    for line in text.split(['\r', '\n']).filter(|line| !line.is_empty()) {
        match line.strip_prefix('*') {
            Some(dir) => {
                if !files_only {
                    listing.subdirectories.push(format!("{dir}/"));
                }
            }
            None => listing.files.push(line.to_string()),
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_splits_on_cr_and_lf() {
        let listing = parse_listing(b"*def\r\nmanifest.sii\n\n*map\rversion.sii\r\n", false);
        assert_eq!(listing.subdirectories, vec!["def/", "map/"]);
        assert_eq!(listing.files, vec!["manifest.sii", "version.sii"]);
    }

    #[test]
    fn files_only_drops_subdirectories() {
        let listing = parse_listing(b"*def\nmanifest.sii", true);
        assert!(listing.subdirectories.is_empty());
        assert_eq!(listing.files, vec!["manifest.sii"]);
    }

    #[test]
    fn empty_content_is_empty_listing() {
        assert!(parse_listing(b"", false).is_empty());
        assert!(parse_listing(b"\r\n\r\n", false).is_empty());
    }
}
