use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("this is a zip file, not a HashFS archive")]
    ZipFile,

    #[error("not a HashFS file (magic {0:#010x})")]
    NotHashFs(u32),

    #[error("unsupported HashFS version {0}")]
    UnsupportedVersion(u16),

    #[error("unsupported hash method {0:?}")]
    UnsupportedHashMethod(String),

    #[error("no entry for {0}")]
    NotFound(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("{0} is a directory")]
    IsADirectory(String),

    #[error("failed to decompress {target}: {source}")]
    Decompress {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("entry {hash:#018x} points at missing metadata record {key}")]
    MissingMetadata { hash: u64, key: u32 },

    #[error("malformed directory listing: {0}")]
    InvalidListing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
