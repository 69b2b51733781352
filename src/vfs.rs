//! Generic file system capability.
//!
//! Consumers that load game data (map sectors, definitions) only need to
//! probe, read and list paths. [`FileSystem`] lets them do that against a
//! packed archive or an unpacked directory tree interchangeably. Paths are
//! archive-style: `/`-separated and rooted at `/`.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::hashfs::{EntryKind, Error, HashFsReader, Result, normalize};
use crate::io::ReadAt;

pub trait FileSystem {
    fn file_exists(&self, path: &str) -> bool;

    fn directory_exists(&self, path: &str) -> bool;

    /// Read the whole file at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn open(&self, path: &str) -> Result<Box<dyn Read>>;

    /// Absolute paths of the files directly inside `path`.
    fn files(&self, path: &str) -> Result<Vec<String>>;

    /// Absolute paths of the subdirectories directly inside `path`, each
    /// ending in `/`.
    fn directories(&self, path: &str) -> Result<Vec<String>>;
}

impl<R: ReadAt> FileSystem for HashFsReader<R> {
    fn file_exists(&self, path: &str) -> bool {
        self.entry_exists(path) == EntryKind::File
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.entry_exists(path) == EntryKind::Directory
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.extract(path)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read>> {
        Ok(Box::new(Cursor::new(self.extract(path)?)))
    }

    fn files(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.get_directory_listing(path, true, true)?.files)
    }

    fn directories(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.get_directory_listing(path, false, true)?.subdirectories)
    }
}

/// A directory on the local disk, seen through archive-style paths
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Names under `path` whose file type matches `want_dirs`, sorted.
    fn children(&self, path: &str, want_dirs: bool) -> Result<Vec<String>> {
        let path = normalize(path);
        let dir = self.resolve(path);
        let read_dir = fs::read_dir(&dir).map_err(|e| not_found(e, path))?;

        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };

        let mut out = Vec::new();
        for item in read_dir {
            let item = item?;
            if item.file_type()?.is_dir() != want_dirs {
                continue;
            }
            let name = item.file_name().to_string_lossy().into_owned();
            if want_dirs {
                out.push(format!("{prefix}{name}/"));
            } else {
                out.push(format!("{prefix}{name}"));
            }
        }
        out.sort();
        Ok(out)
    }
}

fn not_found(err: io::Error, path: &str) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.to_string())
    } else {
        Error::Io(err)
    }
}

impl FileSystem for DiskFileSystem {
    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)).map_err(|e| not_found(e, path))
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read>> {
        let file = fs::File::open(self.resolve(path)).map_err(|e| not_found(e, path))?;
        Ok(Box::new(file))
    }

    fn files(&self, path: &str) -> Result<Vec<String>> {
        self.children(path, false)
    }

    fn directories(&self, path: &str) -> Result<Vec<String>> {
        self.children(path, true)
    }
}
