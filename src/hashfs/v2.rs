//! HashFS v2 layout.
//!
//! The v2 header points at two separately zlib-compressed tables:
//!
//! - the entry table, an array of 16-byte `{hash, index, flags}` records
//! - the metadata table, a stream of variable-width records keyed by a
//!   3-byte index
//!
//! An entry resolves to the metadata record at `index + (flags & 0xFF)`.
//! Metadata records come in two shapes: regular records (bit 7 of the first
//! flag byte set) and packed tobj/dds hybrids, whose content is stored in a
//! form this crate does not decode.
//!
//! Directory listings are binary: a `u32` count, `count` length bytes, then
//! the concatenated names. Names starting with `/` are subdirectories.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, trace, warn};

use crate::io::ReadAt;

use super::error::{Error, Result};
use super::reader::{check_hash_method, inflate};
use super::structures::*;

/// Metadata offsets are stored in 16-byte blocks
const OFFSET_BLOCK_SIZE: u64 = 16;

/// Parsed v2 header and resolved entries
#[derive(Debug)]
pub struct HashFsV2 {
    header: HeaderV2,
    entries: HashMap<u64, Entry>,
}

impl HashFsV2 {
    /// Parse the header, inflate both tables and resolve every entry
    /// against its metadata record.
    pub fn parse<R: ReadAt>(source: &R) -> Result<Self> {
        let mut buf = [0u8; HeaderV2::SIZE];
        source.read_exact_at(PREAMBLE_SIZE as u64, &mut buf)?;
        let header = HeaderV2::from_bytes(&buf)?;
        check_hash_method(&header.hash_method)?;

        debug!(
            "v2 archive: salt {}, {} entries, entry table {} bytes at {:#x}, metadata table {} bytes at {:#x}",
            header.salt,
            header.entries_count,
            header.entry_table_length,
            header.entry_table_start,
            header.metadata_table_length,
            header.metadata_table_start
        );

        let entry_table = read_table(
            source,
            header.entry_table_start,
            header.entry_table_length,
            "entry table",
        )?;
        let mut records = parse_entry_table(&entry_table)?;
        if records.len() != header.entries_count as usize {
            warn!(
                "entry table holds {} records, header says {}",
                records.len(),
                header.entries_count
            );
        }
        records.sort_by_key(|record| record.index);

        let metadata_table = read_table(
            source,
            header.metadata_table_start,
            header.metadata_table_length,
            "metadata table",
        )?;
        let metadata = parse_metadata_table(&metadata_table)?;
        debug!("parsed {} metadata records", metadata.len());

        let entries = resolve_entries(&records, &metadata)?;

        Ok(Self { header, entries })
    }

    pub fn header(&self) -> &HeaderV2 {
        &self.header
    }

    pub fn salt(&self) -> u16 {
        self.header.salt
    }

    pub fn entries(&self) -> &HashMap<u64, Entry> {
        &self.entries
    }
}

fn read_table<R: ReadAt>(source: &R, start: u64, length: u32, what: &str) -> Result<Vec<u8>> {
    let stored = source.read_vec_at(start, u64::from(length))?;
    inflate(&stored, length as usize * 4).map_err(|source| Error::Decompress {
        target: what.to_string(),
        source,
    })
}

/// Reinterpret an inflated entry table as packed 16-byte records.
pub fn parse_entry_table(data: &[u8]) -> Result<Vec<EntryRecordV2>> {
    let count = data.len() / EntryRecordV2::SIZE;
    if data.len() % EntryRecordV2::SIZE != 0 {
        warn!(
            "entry table has {} trailing bytes",
            data.len() % EntryRecordV2::SIZE
        );
    }

    let mut cursor = Cursor::new(data);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(EntryRecordV2::read_from(&mut cursor)?);
    }
    Ok(records)
}

/// Parse an inflated metadata table into records keyed by their index.
pub fn parse_metadata_table(data: &[u8]) -> Result<HashMap<u32, MetadataRecord>> {
    let mut cursor = Cursor::new(data);
    let mut records = HashMap::new();

    while (cursor.position() as usize) < data.len() {
        let record = read_metadata_record(&mut cursor)?;
        trace!(
            "metadata {} flags {:#04x} offset {:#x} stored {}",
            record.index, record.flags.flags1, record.offset, record.compressed_size
        );
        records.insert(record.index, record);
    }

    Ok(records)
}

fn read_metadata_record<R: Read>(reader: &mut R) -> io::Result<MetadataRecord> {
    let index = reader.read_u24::<LittleEndian>()?;
    let flags1 = reader.read_u8()?;

    if flags1 & MetadataFlags::REGULAR != 0 {
        let compressed_size = reader.read_u24::<LittleEndian>()?;
        let flags2 = reader.read_u8()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let unknown = reader.read_u32::<LittleEndian>()?;
        let offset_block = reader.read_u32::<LittleEndian>()?;

        return Ok(MetadataRecord {
            index,
            flags: MetadataFlags { flags1, flags2 },
            compressed_size,
            size: Some(size),
            unknown,
            offset: u64::from(offset_block) * OFFSET_BLOCK_SIZE,
            texture: None,
        });
    }

    let unknown1 = reader.read_u64::<LittleEndian>()?;
    let width = u32::from(reader.read_u16::<LittleEndian>()?) + 1;
    let height = u32::from(reader.read_u16::<LittleEndian>()?) + 1;
    let unknown2 = reader.read_u64::<LittleEndian>()?;
    let compressed_size = reader.read_u24::<LittleEndian>()?;
    let mut unknown3 = [0u8; 9];
    reader.read_exact(&mut unknown3)?;
    let offset_block = reader.read_u32::<LittleEndian>()?;

    Ok(MetadataRecord {
        index,
        flags: MetadataFlags { flags1, flags2: 0 },
        compressed_size,
        size: None,
        unknown: 0,
        offset: u64::from(offset_block) * OFFSET_BLOCK_SIZE,
        texture: Some(PackedTexture {
            width,
            height,
            unknown1,
            unknown2,
            unknown3,
        }),
    })
}

/// Build the hash map of entries from index-sorted entry records.
///
/// The first record seen for a hash wins.
pub fn resolve_entries(
    records: &[EntryRecordV2],
    metadata: &HashMap<u32, MetadataRecord>,
) -> Result<HashMap<u64, Entry>> {
    let mut entries = HashMap::with_capacity(records.len());

    for record in records {
        let key = record.metadata_key();
        let meta = metadata.get(&key).ok_or(Error::MissingMetadata {
            hash: record.hash,
            key,
        })?;

        let is_tobj = meta.is_tobj();
        let entry = Entry {
            hash: record.hash,
            offset: meta.offset,
            size: meta.size.unwrap_or(meta.compressed_size),
            compressed_size: meta.compressed_size,
            is_directory: !is_tobj && meta.flags.is_directory(),
            is_compressed: !is_tobj && meta.flags.is_compressed(),
            is_tobj,
            detail: EntryDetail::V2 {
                flags: meta.flags,
                unknown: meta.unknown,
                texture: meta.texture.clone(),
            },
        };

        if entries.contains_key(&record.hash) {
            debug!("discarding duplicate entry {:#018x}", record.hash);
            continue;
        }
        entries.insert(record.hash, entry);
    }

    Ok(entries)
}

/// Parse the binary content of a v2 directory record.
pub fn parse_listing(data: &[u8], files_only: bool) -> Result<DirectoryListing> {
    let truncated = |_: io::Error| Error::InvalidListing("truncated directory record".into());

    let mut cursor = Cursor::new(data);
    let count = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
    if count > data.len() - 4 {
        return Err(Error::InvalidListing(format!(
            "{count} names do not fit in {} bytes",
            data.len()
        )));
    }

    let mut lengths = vec![0u8; count];
    cursor.read_exact(&mut lengths).map_err(truncated)?;

    let mut listing = DirectoryListing::default();
    for len in lengths {
        let mut name = vec![0u8; usize::from(len)];
        cursor.read_exact(&mut name).map_err(truncated)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::InvalidListing("name is not utf8".into()))?;

        match name.strip_prefix('/') {
            Some(dir) => {
                if !files_only {
                    listing.subdirectories.push(format!("{dir}/"));
                }
            }
            None => listing.files.push(name),
        }
    }

    Ok(listing)
}
