//! Builders that synthesize small HashFS archives in memory.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use hashfs::hash_path;

pub const MAGIC: &[u8; 4] = b"SCS#";

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Text body of a v1 directory record
pub fn v1_listing(subdirs: &[&str], files: &[&str]) -> Vec<u8> {
    let mut out = String::new();
    for dir in subdirs {
        out.push_str(&format!("*{dir}\n"));
    }
    for file in files {
        out.push_str(file);
        out.push('\n');
    }
    out.into_bytes()
}

/// Binary body of a v2 directory record
pub fn v2_listing(subdirs: &[&str], files: &[&str]) -> Vec<u8> {
    let names: Vec<String> = subdirs
        .iter()
        .map(|d| format!("/{d}"))
        .chain(files.iter().map(|f| f.to_string()))
        .collect();

    let mut out = (names.len() as u32).to_le_bytes().to_vec();
    out.extend(names.iter().map(|n| n.len() as u8));
    for name in &names {
        out.extend_from_slice(name.as_bytes());
    }
    out
}

struct V1Record {
    hash: u64,
    flags: u32,
    crc: u32,
    size: u32,
    stored: Vec<u8>,
}

pub struct V1Builder {
    salt: u16,
    hash_method: [u8; 4],
    records: Vec<V1Record>,
}

impl V1Builder {
    pub fn new(salt: u16) -> Self {
        Self {
            salt,
            hash_method: *b"CITY",
            records: Vec::new(),
        }
    }

    pub fn hash_method(mut self, method: &[u8; 4]) -> Self {
        self.hash_method = *method;
        self
    }

    pub fn record(mut self, hash: u64, flags: u32, size: u32, stored: Vec<u8>) -> Self {
        self.records.push(V1Record {
            hash,
            flags,
            crc: 0x1234_5678,
            size,
            stored,
        });
        self
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        let hash = hash_path(path, self.salt);
        self.record(hash, 0, data.len() as u32, data.to_vec())
    }

    pub fn compressed_file(self, path: &str, data: &[u8]) -> Self {
        let hash = hash_path(path, self.salt);
        self.record(hash, 0x2, data.len() as u32, zlib(data))
    }

    pub fn dir(self, path: &str, subdirs: &[&str], files: &[&str]) -> Self {
        let hash = hash_path(path, self.salt);
        let body = v1_listing(subdirs, files);
        self.record(hash, 0x1, body.len() as u32, body)
    }

    pub fn compressed_dir(self, path: &str, subdirs: &[&str], files: &[&str]) -> Self {
        let hash = hash_path(path, self.salt);
        let body = v1_listing(subdirs, files);
        self.record(hash, 0x3, body.len() as u32, zlib(&body))
    }

    /// Archive with the entry table after the data and `start_offset`
    /// pointing at it.
    pub fn build(&self) -> Vec<u8> {
        self.build_inner(None)
    }

    /// Archive whose header `start_offset` is wrong.
    pub fn build_with_start_offset(&self, start_offset: u32) -> Vec<u8> {
        self.build_inner(Some(start_offset))
    }

    fn build_inner(&self, start_offset: Option<u32>) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&self.salt.to_le_bytes());
        data.extend_from_slice(&self.hash_method);
        data.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        let start_offset_pos = data.len();
        data.extend_from_slice(&0u32.to_le_bytes());

        let mut offsets = Vec::new();
        for record in &self.records {
            offsets.push(data.len() as u64);
            data.extend_from_slice(&record.stored);
        }

        let table_offset = data.len() as u32;
        let start = start_offset.unwrap_or(table_offset);
        data[start_offset_pos..start_offset_pos + 4].copy_from_slice(&start.to_le_bytes());

        for (record, offset) in self.records.iter().zip(offsets) {
            data.extend_from_slice(&record.hash.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&record.flags.to_le_bytes());
            data.extend_from_slice(&record.crc.to_le_bytes());
            data.extend_from_slice(&record.size.to_le_bytes());
            data.extend_from_slice(&(record.stored.len() as u32).to_le_bytes());
        }

        data
    }
}

enum V2Kind {
    Regular { flags1: u8, flags2: u8, size: u32 },
    Texture { width: u16, height: u16 },
}

struct V2Member {
    hash: u64,
    kind: V2Kind,
    stored: Vec<u8>,
}

pub struct V2Builder {
    salt: u16,
    members: Vec<V2Member>,
}

impl V2Builder {
    pub fn new(salt: u16) -> Self {
        Self {
            salt,
            members: Vec::new(),
        }
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.members.push(V2Member {
            hash: hash_path(path, self.salt),
            kind: V2Kind::Regular { flags1: 0x80, flags2: 0, size: data.len() as u32 },
            stored: data.to_vec(),
        });
        self
    }

    pub fn compressed_file(mut self, path: &str, data: &[u8]) -> Self {
        self.members.push(V2Member {
            hash: hash_path(path, self.salt),
            kind: V2Kind::Regular { flags1: 0x80, flags2: 0x10, size: data.len() as u32 },
            stored: zlib(data),
        });
        self
    }

    pub fn dir(mut self, path: &str, subdirs: &[&str], files: &[&str]) -> Self {
        let body = v2_listing(subdirs, files);
        self.members.push(V2Member {
            hash: hash_path(path, self.salt),
            kind: V2Kind::Regular { flags1: 0x81, flags2: 0x10, size: body.len() as u32 },
            stored: zlib(&body),
        });
        self
    }

    pub fn texture(mut self, path: &str, width: u16, height: u16, blob: &[u8]) -> Self {
        self.members.push(V2Member {
            hash: hash_path(path, self.salt),
            kind: V2Kind::Texture { width, height },
            stored: blob.to_vec(),
        });
        self
    }

    /// Entry records point at index `2 * i`, with a low flag byte of 1,
    /// so every lookup goes through the index offset. Records are written
    /// in reverse order so the reader has to sort them.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&2u16.to_le_bytes());
        let header_pos = data.len();
        data.resize(header_pos + 42, 0);
        pad16(&mut data);

        let mut blocks = Vec::new();
        for member in &self.members {
            blocks.push((data.len() / 16) as u32);
            data.extend_from_slice(&member.stored);
            pad16(&mut data);
        }

        let mut entry_table = Vec::new();
        for (i, member) in self.members.iter().enumerate().rev() {
            entry_table.extend_from_slice(&member.hash.to_le_bytes());
            entry_table.extend_from_slice(&((i * 2) as u32).to_le_bytes());
            entry_table.extend_from_slice(&0xAB00_0001u32.to_le_bytes());
        }

        let mut metadata = Vec::new();
        for (i, (member, block)) in self.members.iter().zip(&blocks).enumerate() {
            let index = (i * 2 + 1) as u32;
            metadata.extend_from_slice(&index.to_le_bytes()[..3]);
            match member.kind {
                V2Kind::Regular { flags1, flags2, size } => {
                    metadata.push(flags1);
                    metadata.extend_from_slice(&(member.stored.len() as u32).to_le_bytes()[..3]);
                    metadata.push(flags2);
                    metadata.extend_from_slice(&size.to_le_bytes());
                    metadata.extend_from_slice(&0u32.to_le_bytes());
                    metadata.extend_from_slice(&block.to_le_bytes());
                }
                V2Kind::Texture { width, height } => {
                    metadata.push(0x00);
                    metadata.extend_from_slice(&0u64.to_le_bytes());
                    metadata.extend_from_slice(&(width - 1).to_le_bytes());
                    metadata.extend_from_slice(&(height - 1).to_le_bytes());
                    metadata.extend_from_slice(&0u64.to_le_bytes());
                    metadata.extend_from_slice(&(member.stored.len() as u32).to_le_bytes()[..3]);
                    metadata.extend_from_slice(&[0u8; 9]);
                    metadata.extend_from_slice(&block.to_le_bytes());
                }
            }
        }

        let entry_table = zlib(&entry_table);
        let metadata = zlib(&metadata);
        let entry_table_start = data.len() as u64;
        data.extend_from_slice(&entry_table);
        let metadata_table_start = data.len() as u64;
        data.extend_from_slice(&metadata);

        let mut header = Vec::new();
        header.extend_from_slice(&self.salt.to_le_bytes());
        header.extend_from_slice(b"CITY");
        header.extend_from_slice(&(self.members.len() as u32).to_le_bytes());
        header.extend_from_slice(&(entry_table.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.members.len() as u32).to_le_bytes());
        header.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        header.extend_from_slice(&entry_table_start.to_le_bytes());
        header.extend_from_slice(&metadata_table_start.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        data[header_pos..header_pos + 42].copy_from_slice(&header);

        data
    }
}

fn pad16(data: &mut Vec<u8>) {
    let padded = data.len().div_ceil(16) * 16;
    data.resize(padded, 0);
}
