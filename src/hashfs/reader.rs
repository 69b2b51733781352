use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;
use tracing::{debug, warn};

use crate::io::{LocalFileReader, ReadAt};

use super::error::{Error, Result};
use super::hash;
use super::structures::*;
use super::v1::{self, HashFsV1};
use super::v2::{self, HashFsV2};

/// Upper bound for speculative output allocation when inflating
const MAX_PREALLOCATION: usize = 64 << 20;

/// Options applied when opening an archive
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// v1 only: read the entry table from the end of the file rather than
    /// from the offset in the header.
    pub force_entry_table_at_end: bool,
}

#[derive(Debug)]
enum Layout {
    V1(HashFsV1),
    V2(HashFsV2),
}

/// Read-only view of a HashFS archive.
///
/// All tables are parsed when the archive is opened; afterwards the entry
/// map never changes. Extraction reads from the byte source on demand.
///
/// ## Example
///
/// ```no_run
/// use hashfs::{EntryKind, HashFsReader};
///
/// fn main() -> hashfs::Result<()> {
///     let reader = HashFsReader::open("base.scs")?;
///
///     if reader.entry_exists("/def/city.sii") == EntryKind::File {
///         let data = reader.extract("/def/city.sii")?;
///         println!("{} bytes", data.len());
///     }
///
///     let listing = reader.get_directory_listing("/", false, true)?;
///     for dir in &listing.subdirectories {
///         println!("{dir}");
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct HashFsReader<R: ReadAt = LocalFileReader> {
    source: R,
    layout: Layout,
}

impl HashFsReader<LocalFileReader> {
    /// Open an archive on disk with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &ReaderOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening {}", path.display());
        Self::from_reader(LocalFileReader::new(path)?, options)
    }
}

impl<R: ReadAt> HashFsReader<R> {
    /// Detect the layout version and parse all tables from `source`.
    ///
    /// # Errors
    ///
    /// Fails if the source is a ZIP file, does not carry the HashFS magic,
    /// uses an unknown version or hash method, or its tables are malformed.
    pub fn from_reader(source: R, options: &ReaderOptions) -> Result<Self> {
        let mut magic = [0u8; 4];
        source.read_exact_at(0, &mut magic)?;
        let magic = u32::from_le_bytes(magic);

        if magic as u16 == ZIP_SIGNATURE {
            return Err(Error::ZipFile);
        }
        if magic != MAGIC {
            return Err(Error::NotHashFs(magic));
        }

        let mut version = [0u8; 2];
        source.read_exact_at(4, &mut version)?;
        let version = u16::from_le_bytes(version);

        let layout = match Version::from_u16(version) {
            Some(Version::V1) => Layout::V1(HashFsV1::parse(
                &source,
                options.force_entry_table_at_end,
            )?),
            Some(Version::V2) => Layout::V2(HashFsV2::parse(&source)?),
            None => return Err(Error::UnsupportedVersion(version)),
        };

        let reader = Self { source, layout };
        debug!(
            "opened HashFS v{} with {} entries",
            reader.version().as_u16(),
            reader.len()
        );
        Ok(reader)
    }

    pub fn version(&self) -> Version {
        match self.layout {
            Layout::V1(_) => Version::V1,
            Layout::V2(_) => Version::V2,
        }
    }

    /// Salt read from the archive header
    pub fn salt(&self) -> u16 {
        match &self.layout {
            Layout::V1(archive) => archive.salt(),
            Layout::V2(archive) => archive.salt(),
        }
    }

    pub fn entries(&self) -> &HashMap<u64, Entry> {
        match &self.layout {
            Layout::V1(archive) => archive.entries(),
            Layout::V2(archive) => archive.entries(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn entry_by_hash(&self, hash: u64) -> Option<&Entry> {
        self.entries().get(&hash)
    }

    /// Extra v1 directory fragments stored under `hash`. Always empty for v2.
    pub fn fragments(&self, hash: u64) -> &[Entry] {
        match &self.layout {
            Layout::V1(archive) => archive.fragments(hash),
            Layout::V2(_) => &[],
        }
    }

    /// Hash `path` with `salt`, or with the archive salt if `None`.
    pub fn hash_path(&self, path: &str, salt: Option<u16>) -> u64 {
        hash::hash_path(path, salt.unwrap_or_else(|| self.salt()))
    }

    fn lookup(&self, path: &str) -> Option<&Entry> {
        self.entry_by_hash(self.hash_path(normalize(path), None))
    }

    pub fn entry_exists(&self, path: &str) -> EntryKind {
        self.lookup(path)
            .map_or(EntryKind::NotFound, Entry::kind)
    }

    pub fn get_entry(&self, path: &str) -> Result<&Entry> {
        self.lookup(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Extract a file to memory.
    pub fn extract(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self.get_entry(path)?;
        if entry.is_directory {
            return Err(Error::IsADirectory(path.to_string()));
        }
        self.read_content(entry)
    }

    /// Extract a file entry to memory.
    ///
    /// Packed texture entries come back as their raw stored bytes.
    pub fn extract_entry(&self, entry: &Entry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Err(Error::IsADirectory(describe(entry)));
        }
        self.read_content(entry)
    }

    /// Extract a file to disk, creating parent directories as needed.
    pub fn extract_to_file(&self, path: &str, output_path: &Path) -> Result<()> {
        let entry = self.get_entry(path)?;
        if entry.is_directory {
            return Err(Error::IsADirectory(path.to_string()));
        }
        self.write_entry(entry, output_path)
    }

    pub fn extract_entry_to_file(&self, entry: &Entry, output_path: &Path) -> Result<()> {
        if entry.is_directory {
            return Err(Error::IsADirectory(describe(entry)));
        }
        self.write_entry(entry, output_path)
    }

    fn write_entry(&self, entry: &Entry, output_path: &Path) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Empty files never touch the archive
        if entry.size == 0 {
            fs::File::create(output_path)?;
            return Ok(());
        }

        let data = self.read_content(entry)?;
        fs::write(output_path, data)?;
        Ok(())
    }

    /// Decode the directory at `path`.
    ///
    /// With `absolute`, every name is prefixed with the (normalized) queried
    /// path so the results can be fed straight back into the reader.
    pub fn get_directory_listing(
        &self,
        path: &str,
        files_only: bool,
        absolute: bool,
    ) -> Result<DirectoryListing> {
        let path = normalize(path);
        let entry = self
            .entry_by_hash(self.hash_path(path, None))
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        if !entry.is_directory {
            return Err(Error::NotADirectory(path.to_string()));
        }

        let mut listing = self.entry_directory_listing(entry, files_only)?;
        if absolute {
            listing.make_absolute(path);
        }
        Ok(listing)
    }

    /// Decode a directory entry. Names are relative to the directory.
    pub fn entry_directory_listing(
        &self,
        entry: &Entry,
        files_only: bool,
    ) -> Result<DirectoryListing> {
        if !entry.is_directory {
            return Err(Error::NotADirectory(describe(entry)));
        }

        match &self.layout {
            Layout::V1(archive) => {
                let mut listing = v1::parse_listing(&self.read_content(entry)?, files_only);
                for fragment in archive.fragments(entry.hash) {
                    listing.extend(v1::parse_listing(&self.read_content(fragment)?, files_only));
                }
                Ok(listing)
            }
            Layout::V2(_) => v2::parse_listing(&self.read_content(entry)?, files_only),
        }
    }

    /// Release the archive, handing back the byte source.
    pub fn close(self) -> R {
        self.source
    }

    /// Stored bytes of `entry`, inflated if the entry is compressed.
    fn read_content(&self, entry: &Entry) -> Result<Vec<u8>> {
        let stored = self
            .source
            .read_vec_at(entry.offset, u64::from(entry.stored_size()))?;

        if !entry.is_compressed {
            return Ok(stored);
        }

        let data = inflate(&stored, entry.size as usize).map_err(|source| Error::Decompress {
            target: describe(entry),
            source,
        })?;
        if data.len() != entry.size as usize {
            warn!(
                "entry {:#018x} inflated to {} bytes, expected {}",
                entry.hash,
                data.len(),
                entry.size
            );
        }
        Ok(data)
    }
}

/// Strip one trailing `/`, leaving the root path alone.
pub fn normalize(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}

fn describe(entry: &Entry) -> String {
    format!("entry {:#018x}", entry.hash)
}

pub(crate) fn check_hash_method(method: &[u8; 4]) -> Result<()> {
    if method != HASH_METHOD_CITY {
        return Err(Error::UnsupportedHashMethod(
            String::from_utf8_lossy(method).into_owned(),
        ));
    }
    Ok(())
}

/// Inflate a zlib stream.
pub(crate) fn inflate(data: &[u8], size_hint: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint.min(MAX_PREALLOCATION));
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}
