use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("missing input file: {}", path.display())]
    MissingInputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("partition file {name} is {size} bytes, smaller than its sub-header")]
    InvalidPartitionFile { name: String, size: u64 },
    #[error("expected {expected} partition(s), got {actual}")]
    PartitionCountMismatch { expected: usize, actual: usize },
    #[error("partition {name} yielded {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("certificate must be 2048 bytes, got {len}")]
    InvalidCertificate { len: usize },
    #[error("image offset overflows 32 bits at partition {name}")]
    OffsetOverflow { name: String },
    #[error("image layout misaligned: expected offset {expected:#x}, at {actual:#x}")]
    LayoutMisaligned { expected: usize, actual: usize },
    #[error("image of {len} bytes ends inside the directory table")]
    TruncatedImage { len: usize },
}

pub mod directory;
