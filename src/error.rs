use std::io;
use thiserror::Error;

/// Failures reported by a [`BlockDevice`](crate::device::BlockDevice).
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("access of {len} bytes at offset {offset} is outside a device of {size} bytes")]
    OutOfBounds { offset: u64, len: u64, size: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no entry named {0:?}")]
    NotFound(String),
    #[error("name {name:?} is {len} bytes long, at most {max} are allowed")]
    NameTooLong { name: String, len: usize, max: usize },
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("an entry named {0:?} already exists")]
    DuplicateName(String),
    #[error("no free inode or directory slot left")]
    CapacityExhausted,
    #[error("content of {len} bytes exceeds the per-file capacity of {max} bytes")]
    ContentTooLarge { len: usize, max: usize },
    #[error("{0:?} is a directory")]
    IsADirectory(String),
    #[error("{0:?} is not a directory")]
    NotADirectory(String),
    #[error("device I/O failure: {0}")]
    Device(#[from] DeviceError),
    #[error("device holds {actual} bytes but {required} are needed")]
    DeviceTooSmall { required: u64, actual: u64 },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("record encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("corrupted metadata: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
