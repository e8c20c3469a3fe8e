use super::{DIR_ENTRY_SIZE, DIR_HEADER_SIZE, INODE_RECORD_SIZE};
use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn calculate_checksum<S>(s: &S) -> Result<u32>
where
    S: Serialize,
{
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bincode::serialize(s)?);
    Ok(hasher.finalize())
}

pub fn inode_table_size(inode_count: u32) -> u64 {
    inode_count as u64 * INODE_RECORD_SIZE
}

pub fn directory_size(inode_count: u32) -> u64 {
    DIR_HEADER_SIZE + // entry count
        inode_count as u64 * DIR_ENTRY_SIZE
}

pub fn data_region_size(inode_count: u32, slot_size: u32) -> u64 {
    inode_count as u64 * slot_size as u64
}

/// A fixed-size, checksummed on-disk record.
pub trait Record: Serialize + DeserializeOwned {
    const SIZE: u64;
    const KIND: &'static str;

    fn checksum_mut(&mut self) -> &mut u32;

    fn checksum(&mut self) -> Result<()> {
        *self.checksum_mut() = 0;
        let checksum = calculate_checksum(self)?;
        *self.checksum_mut() = checksum;
        Ok(())
    }

    fn verify_checksum(&mut self) -> Result<bool> {
        let checksum = *self.checksum_mut();
        *self.checksum_mut() = 0;
        let computed = calculate_checksum(self);
        *self.checksum_mut() = checksum;

        Ok(computed? == checksum)
    }

    /// Encodes the record, padded with zeroes to exactly `SIZE` bytes.
    fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.checksum()?;
        let mut buf = bincode::serialize(self)?;
        debug_assert!(buf.len() as u64 <= Self::SIZE);
        buf.resize(Self::SIZE as usize, 0);
        Ok(buf)
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut record: Self = bincode::deserialize(buf)
            .map_err(|err| Error::Corrupted(format!("{} does not decode: {}", Self::KIND, err)))?;
        if !record.verify_checksum()? {
            return Err(Error::Corrupted(format!(
                "{} checksum verification failed",
                Self::KIND
            )));
        }

        Ok(record)
    }
}
