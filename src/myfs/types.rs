use super::{
    directory,
    util::{self, Record},
    CURRENT_VERSION, DIR_ENTRY_SIZE, DIR_HEADER_SIZE, INODE_RECORD_SIZE, MYFS_MAGIC, NAME_MAX,
    SUPERBLOCK_SIZE,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Number of inodes and size of each data slot. Every on-device offset is
/// derived from these two values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub inode_count: u32,
    pub slot_size: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            inode_count: 512,
            slot_size: 512,
        }
    }
}

impl Geometry {
    pub fn new(inode_count: u32, slot_size: u32) -> Self {
        Self {
            inode_count,
            slot_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.inode_count == 0 {
            return Err(Error::InvalidGeometry("inode count must be non-zero".into()));
        }
        if self.slot_size == 0 {
            return Err(Error::InvalidGeometry("slot size must be non-zero".into()));
        }
        // data offsets are stored as u32
        let required =
            self.data_region_offset() as u128 + self.inode_count as u128 * self.slot_size as u128;
        if required > u32::MAX as u128 {
            return Err(Error::InvalidGeometry(format!(
                "layout needs {} bytes, more than 32-bit offsets can address",
                required
            )));
        }

        Ok(())
    }

    pub fn inode_table_offset(&self) -> u64 {
        SUPERBLOCK_SIZE
    }

    pub fn inode_offset(&self, index: u32) -> u64 {
        self.inode_table_offset() + index as u64 * INODE_RECORD_SIZE
    }

    pub fn directory_offset(&self) -> u64 {
        self.inode_table_offset() + util::inode_table_size(self.inode_count)
    }

    pub fn entry_offset(&self, position: usize) -> u64 {
        self.directory_offset() + DIR_HEADER_SIZE + position as u64 * DIR_ENTRY_SIZE
    }

    pub fn data_region_offset(&self) -> u64 {
        self.directory_offset() + util::directory_size(self.inode_count)
    }

    pub fn slot_offset(&self, index: u32) -> u64 {
        self.data_region_offset() + index as u64 * self.slot_size as u64
    }

    pub fn device_size(&self) -> u64 {
        self.data_region_offset() + util::data_region_size(self.inode_count, self.slot_size)
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub magic: [u8; 4],
    pub version: u32,
    pub inode_count: u32,
    pub slot_size: u32,
    pub checksum: u32,
}

impl Superblock {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            magic: MYFS_MAGIC,
            version: CURRENT_VERSION,
            inode_count: geometry.inode_count,
            slot_size: geometry.slot_size,
            checksum: 0,
        }
    }

    pub fn is_current(&self) -> bool {
        self.magic == MYFS_MAGIC && self.version == CURRENT_VERSION
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.inode_count, self.slot_size)
    }
}

impl Record for Superblock {
    const SIZE: u64 = SUPERBLOCK_SIZE;
    const KIND: &'static str = "superblock";

    fn checksum_mut(&mut self) -> &mut u32 {
        &mut self.checksum
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InodeRecord {
    pub index: u32,
    /// Device offset of the inode's slot, 0 while the inode is free.
    pub data_offset: u32,
    pub size: u32,
    pub checksum: u32,
}

impl InodeRecord {
    pub fn free(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn is_free(&self) -> bool {
        self.data_offset == 0
    }
}

impl Record for InodeRecord {
    const SIZE: u64 = INODE_RECORD_SIZE;
    const KIND: &'static str = "inode";

    fn checksum_mut(&mut self) -> &mut u32 {
        &mut self.checksum
    }
}

/// Leading record of the directory region. Only the first `entry_count`
/// entry records after it are meaningful.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirHeader {
    pub entry_count: u32,
    pub checksum: u32,
}

impl DirHeader {
    pub fn new(entry_count: u32) -> Self {
        Self {
            entry_count,
            checksum: 0,
        }
    }
}

impl Record for DirHeader {
    const SIZE: u64 = DIR_HEADER_SIZE;
    const KIND: &'static str = "directory header";

    fn checksum_mut(&mut self) -> &mut u32 {
        &mut self.checksum
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntryRecord {
    pub name_len: u8,
    pub name: [u8; NAME_MAX],
    pub is_directory: bool,
    pub logical_size: u32,
    pub inode_index: u32,
    pub checksum: u32,
}

impl Record for DirEntryRecord {
    const SIZE: u64 = DIR_ENTRY_SIZE;
    const KIND: &'static str = "directory entry";

    fn checksum_mut(&mut self) -> &mut u32 {
        &mut self.checksum
    }
}

/// A directory entry as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
    pub logical_size: u32,
    pub inode_index: u32,
}

impl DirEntry {
    pub fn new(name: &str, is_directory: bool, inode_index: u32) -> Self {
        Self {
            name: name.to_owned(),
            is_directory,
            logical_size: 0,
            inode_index,
        }
    }
}

impl TryFrom<&DirEntry> for DirEntryRecord {
    type Error = Error;

    fn try_from(entry: &DirEntry) -> Result<Self> {
        directory::validate_name(&entry.name)?;
        let bytes = entry.name.as_bytes();
        let mut name = [0u8; NAME_MAX];
        name[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            name_len: bytes.len() as u8,
            name,
            is_directory: entry.is_directory,
            logical_size: entry.logical_size,
            inode_index: entry.inode_index,
            checksum: 0,
        })
    }
}

impl TryFrom<DirEntryRecord> for DirEntry {
    type Error = Error;

    fn try_from(record: DirEntryRecord) -> Result<Self> {
        let len = record.name_len as usize;
        if len == 0 || len > NAME_MAX {
            return Err(Error::Corrupted(format!(
                "directory entry has a name length of {}",
                len
            )));
        }
        let name = std::str::from_utf8(&record.name[..len])
            .map_err(|_| Error::Corrupted("directory entry name is not UTF-8".into()))?;

        Ok(Self {
            name: name.to_owned(),
            is_directory: record.is_directory,
            logical_size: record.logical_size,
            inode_index: record.inode_index,
        })
    }
}
