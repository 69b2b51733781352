use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ReadAt;

/// In-memory archive source
///
/// Keeps a running count of bytes served so callers can tell whether an
/// operation touched the archive at all.
#[derive(Debug, Default)]
pub struct MemoryReader {
    data: Vec<u8>,
    transferred_bytes: AtomicU64,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            transferred_bytes: AtomicU64::new(0),
        }
    }

    /// Get total bytes served so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for MemoryReader {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ReadAt for MemoryReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || offset >= self.data.len() as u64 {
            return Ok(0);
        }

        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);

        self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
