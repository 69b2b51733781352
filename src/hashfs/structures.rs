use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

/// "SCS#" read as a little-endian `u32`
pub const MAGIC: u32 = 0x23534353;

/// "PK" read as a little-endian `u16`; the start of every ZIP local header
pub const ZIP_SIGNATURE: u16 = 0x4B50;

/// The only supported path hash method
pub const HASH_METHOD_CITY: &[u8; 4] = b"CITY";

/// Magic (4 bytes) followed by the version (2 bytes)
pub const PREAMBLE_SIZE: usize = 6;

/// On-disk layout revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V1,
    V2,
}

impl Version {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Version::V1),
            2 => Some(Version::V2),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Version::V1 => 1,
            Version::V2 => 2,
        }
    }
}

/// Outcome of probing a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    NotFound,
    File,
    Directory,
}

/// v1 entry flag word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(pub u32);

impl EntryFlags {
    pub const DIRECTORY: u32 = 0x01;
    pub const COMPRESSED: u32 = 0x02;
    /// Meaning undocumented
    pub const VERIFY: u32 = 0x04;
    /// Meaning undocumented
    pub const ENCRYPTED: u32 = 0x08;

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_directory(&self) -> bool {
        self.0 & Self::DIRECTORY != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn verify(&self) -> bool {
        self.0 & Self::VERIFY != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }
}

/// v2 metadata record flag bytes
///
/// `flags1` follows the 3-byte record index and selects the record shape.
/// `flags2` only exists on regular records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetadataFlags {
    pub flags1: u8,
    pub flags2: u8,
}

impl MetadataFlags {
    /// flags1: record is a regular file/directory record
    pub const REGULAR: u8 = 0x80;
    /// flags1: record is a directory listing
    pub const DIRECTORY: u8 = 0x01;
    /// flags2: content is zlib compressed
    pub const COMPRESSED: u8 = 0x10;

    pub fn is_regular(&self) -> bool {
        self.flags1 & Self::REGULAR != 0
    }

    pub fn is_packed_texture(&self) -> bool {
        !self.is_regular()
    }

    pub fn is_directory(&self) -> bool {
        self.flags1 & Self::DIRECTORY != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags2 & Self::COMPRESSED != 0
    }
}

/// Texture descriptor carried by a packed tobj/dds hybrid record.
///
/// Only the dimensions are understood; the rest is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedTexture {
    pub width: u32,
    pub height: u32,
    pub unknown1: u64,
    pub unknown2: u64,
    pub unknown3: [u8; 9],
}

/// Version-specific data that has no meaning outside its layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDetail {
    V1 {
        flags: EntryFlags,
        crc: u32,
    },
    V2 {
        flags: MetadataFlags,
        /// The `u32` between size and offset block on regular records
        unknown: u32,
        texture: Option<PackedTexture>,
    },
}

/// Metadata for one archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub hash: u64,
    pub offset: u64,
    pub size: u32,
    pub compressed_size: u32,
    pub is_directory: bool,
    pub is_compressed: bool,
    /// Packed texture hybrid; content is stored in a non-zlib form
    pub is_tobj: bool,
    pub detail: EntryDetail,
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        if self.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    /// CRC stored by v1 archives
    pub fn crc(&self) -> Option<u32> {
        match self.detail {
            EntryDetail::V1 { crc, .. } => Some(crc),
            EntryDetail::V2 { .. } => None,
        }
    }

    pub fn texture(&self) -> Option<&PackedTexture> {
        match &self.detail {
            EntryDetail::V2 { texture, .. } => texture.as_ref(),
            EntryDetail::V1 { .. } => None,
        }
    }

    /// Number of bytes occupied in the container
    pub fn stored_size(&self) -> u32 {
        if self.is_compressed || self.is_tobj {
            self.compressed_size
        } else {
            self.size
        }
    }
}

/// Decoded content of a directory entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Subdirectory names, each ending in `/`
    pub subdirectories: Vec<String>,
    pub files: Vec<String>,
}

impl DirectoryListing {
    pub fn is_empty(&self) -> bool {
        self.subdirectories.is_empty() && self.files.is_empty()
    }

    /// Append another fragment of the same directory.
    pub fn extend(&mut self, other: DirectoryListing) {
        self.subdirectories.extend(other.subdirectories);
        self.files.extend(other.files);
    }

    /// Prefix every name with `parent`, inserting a separator if needed.
    pub fn make_absolute(&mut self, parent: &str) {
        let prefix = if parent.ends_with('/') {
            parent.to_string()
        } else {
            format!("{parent}/")
        };
        for name in self.subdirectories.iter_mut().chain(self.files.iter_mut()) {
            name.insert_str(0, &prefix);
        }
    }
}

/// v1 header, following the preamble - 14 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV1 {
    pub salt: u16,
    pub hash_method: [u8; 4],
    pub entries_count: u32,
    pub start_offset: u32,
}

impl HeaderV1 {
    pub const SIZE: usize = 14;

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let salt = cursor.read_u16::<LittleEndian>()?;
        let mut hash_method = [0u8; 4];
        cursor.read_exact(&mut hash_method)?;

        Ok(Self {
            salt,
            hash_method,
            entries_count: cursor.read_u32::<LittleEndian>()?,
            start_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// v2 header, following the preamble - 42 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV2 {
    pub salt: u16,
    pub hash_method: [u8; 4],
    pub entries_count: u32,
    /// Compressed byte length of the entry table
    pub entry_table_length: u32,
    /// Meaning undocumented
    pub reserved1: u32,
    /// Compressed byte length of the metadata table
    pub metadata_table_length: u32,
    pub entry_table_start: u64,
    pub metadata_table_start: u64,
    /// Meaning undocumented
    pub reserved2: u32,
}

impl HeaderV2 {
    pub const SIZE: usize = 42;

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let salt = cursor.read_u16::<LittleEndian>()?;
        let mut hash_method = [0u8; 4];
        cursor.read_exact(&mut hash_method)?;

        Ok(Self {
            salt,
            hash_method,
            entries_count: cursor.read_u32::<LittleEndian>()?,
            entry_table_length: cursor.read_u32::<LittleEndian>()?,
            reserved1: cursor.read_u32::<LittleEndian>()?,
            metadata_table_length: cursor.read_u32::<LittleEndian>()?,
            entry_table_start: cursor.read_u64::<LittleEndian>()?,
            metadata_table_start: cursor.read_u64::<LittleEndian>()?,
            reserved2: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// v1 entry table record - 32 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecordV1 {
    pub hash: u64,
    pub offset: u64,
    pub flags: EntryFlags,
    pub crc: u32,
    pub size: u32,
    pub compressed_size: u32,
}

impl EntryRecordV1 {
    pub const SIZE: usize = 32;

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            hash: reader.read_u64::<LittleEndian>()?,
            offset: reader.read_u64::<LittleEndian>()?,
            flags: EntryFlags(reader.read_u32::<LittleEndian>()?),
            crc: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
            compressed_size: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn into_entry(self) -> Entry {
        Entry {
            hash: self.hash,
            offset: self.offset,
            size: self.size,
            compressed_size: self.compressed_size,
            is_directory: self.flags.is_directory(),
            is_compressed: self.flags.is_compressed(),
            is_tobj: false,
            detail: EntryDetail::V1 {
                flags: self.flags,
                crc: self.crc,
            },
        }
    }
}

/// v2 entry table record - 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRecordV2 {
    pub hash: u64,
    /// Position in the metadata table, not a byte offset
    pub index: u32,
    pub flags_and_offset: u32,
}

impl EntryRecordV2 {
    pub const SIZE: usize = 16;

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            hash: reader.read_u64::<LittleEndian>()?,
            index: reader.read_u32::<LittleEndian>()?,
            flags_and_offset: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Key of the metadata record this entry resolves to.
    ///
    /// The low byte of the flag word is added to the entry's own index.
    pub fn metadata_key(&self) -> u32 {
        self.index.wrapping_add(self.flags_and_offset & 0xFF)
    }
}

/// v2 metadata record, either shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub index: u32,
    pub flags: MetadataFlags,
    pub compressed_size: u32,
    /// Absent on packed texture records
    pub size: Option<u32>,
    pub unknown: u32,
    /// Byte offset, already scaled from 16-byte blocks
    pub offset: u64,
    pub texture: Option<PackedTexture>,
}

impl MetadataRecord {
    pub fn is_tobj(&self) -> bool {
        self.texture.is_some()
    }
}
