//! A minimal persistent file system over a byte-addressable block device.
//!
//! Layout, from offset 0:
//! - Superblock (magic, version and geometry)
//! - Inode table, one record per inode
//! - Directory: entry count followed by the entries, in creation order
//! - Data slots, one fixed-size slot per inode
//!
//! There is a single flat root directory and no cached state between calls:
//! every operation reads the metadata it needs straight from the device.

pub mod device;
pub mod error;
pub mod mkfs;
pub mod myfs;

pub use device::{BlockDevice, ImageDevice, MemDevice};
pub use error::{DeviceError, Error, Result};
pub use myfs::{
    fs::{MyFs, StatFs},
    types::{DirEntry, Geometry},
    NAME_MAX,
};
