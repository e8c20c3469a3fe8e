//! The fixed-capacity inode table stored right after the superblock.
//!
//! Records are always loaded fresh from the device; allocation scans that
//! fresh copy and never touches the device itself.

use super::{
    types::{Geometry, InodeRecord},
    util::{self, Record},
    INODE_RECORD_SIZE,
};
use crate::{
    device::BlockDevice,
    error::{Error, Result},
};

pub fn load<D>(device: &D, geometry: &Geometry) -> Result<Vec<InodeRecord>>
where
    D: BlockDevice,
{
    let buf = device.read(
        geometry.inode_table_offset(),
        util::inode_table_size(geometry.inode_count) as usize,
    )?;

    let mut table = Vec::with_capacity(geometry.inode_count as usize);
    for (position, chunk) in buf.chunks_exact(INODE_RECORD_SIZE as usize).enumerate() {
        let record = InodeRecord::from_bytes(chunk)?;
        if record.index as usize != position {
            return Err(Error::Corrupted(format!(
                "inode at position {} claims index {}",
                position, record.index
            )));
        }
        table.push(record);
    }

    Ok(table)
}

/// Index of the first free inode.
pub fn allocate(table: &[InodeRecord]) -> Result<u32> {
    table
        .iter()
        .find(|inode| inode.is_free())
        .map(|inode| inode.index)
        .ok_or(Error::CapacityExhausted)
}

pub fn find<D>(device: &D, geometry: &Geometry, index: u32) -> Result<InodeRecord>
where
    D: BlockDevice,
{
    if index >= geometry.inode_count {
        return Err(Error::Corrupted(format!(
            "inode index {} is outside a table of {}",
            index, geometry.inode_count
        )));
    }

    let buf = device.read(geometry.inode_offset(index), INODE_RECORD_SIZE as usize)?;
    let inode = InodeRecord::from_bytes(&buf)?;
    if inode.index != index {
        return Err(Error::Corrupted(format!(
            "inode at position {} claims index {}",
            index, inode.index
        )));
    }

    Ok(inode)
}

/// Writes `record` back at its own position, leaving every other record
/// untouched.
pub fn persist_one<D>(device: &mut D, geometry: &Geometry, record: &mut InodeRecord) -> Result<()>
where
    D: BlockDevice,
{
    if record.index >= geometry.inode_count {
        return Err(Error::Corrupted(format!(
            "inode index {} is outside a table of {}",
            record.index, geometry.inode_count
        )));
    }

    let buf = record.to_bytes()?;
    Ok(device.write_at(geometry.inode_offset(record.index), &buf)?)
}

/// Writes a free record for every index, contiguously.
pub fn format<D>(device: &mut D, geometry: &Geometry) -> Result<()>
where
    D: BlockDevice,
{
    let mut buf = Vec::with_capacity(util::inode_table_size(geometry.inode_count) as usize);
    for index in 0..geometry.inode_count {
        buf.extend(InodeRecord::free(index).to_bytes()?);
    }

    Ok(device.write_at(geometry.inode_table_offset(), &buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn formatted(geometry: &Geometry) -> anyhow::Result<MemDevice> {
        let mut device = MemDevice::new(geometry.device_size() as usize);
        format(&mut device, geometry)?;
        Ok(device)
    }

    #[test]
    fn format_and_load() -> anyhow::Result<()> {
        let geometry = Geometry::new(8, 32);
        let device = formatted(&geometry)?;

        let table = load(&device, &geometry)?;
        assert_eq!(table.len(), 8);
        for (i, inode) in table.iter().enumerate() {
            assert_eq!(inode.index as usize, i);
            assert!(inode.is_free());
            assert_eq!(inode.size, 0);
        }

        Ok(())
    }

    #[test]
    fn allocate_first_free() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 32);
        let mut table: Vec<_> = (0..4).map(InodeRecord::free).collect();
        assert_eq!(allocate(&table)?, 0);

        table[0].data_offset = geometry.slot_offset(0) as u32;
        table[2].data_offset = geometry.slot_offset(2) as u32;
        assert_eq!(allocate(&table)?, 1);

        for i in 0..4 {
            table[i].data_offset = geometry.slot_offset(i as u32) as u32;
        }
        assert!(matches!(allocate(&table), Err(Error::CapacityExhausted)));

        Ok(())
    }

    #[test]
    fn persist_one_touches_only_its_record() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 32);
        let mut device = formatted(&geometry)?;
        let before = device.as_bytes().to_vec();

        let mut inode = find(&device, &geometry, 2)?;
        inode.data_offset = geometry.slot_offset(2) as u32;
        inode.size = 5;
        persist_one(&mut device, &geometry, &mut inode)?;

        let start = geometry.inode_offset(2) as usize;
        let end = start + INODE_RECORD_SIZE as usize;
        let after = device.as_bytes();
        assert_eq!(&before[..start], &after[..start]);
        assert_eq!(&before[end..], &after[end..]);

        let table = load(&device, &geometry)?;
        assert_eq!(table[2].size, 5);
        assert!(!table[2].is_free());
        assert!(table[1].is_free() && table[3].is_free());

        Ok(())
    }

    #[test]
    fn corrupted_record() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 32);
        let mut device = formatted(&geometry)?;
        device.as_bytes_mut()[geometry.inode_offset(1) as usize] ^= 0xff;

        assert!(matches!(load(&device, &geometry), Err(Error::Corrupted(_))));
        assert!(matches!(find(&device, &geometry, 1), Err(Error::Corrupted(_))));
        assert!(find(&device, &geometry, 0).is_ok());
        assert!(matches!(find(&device, &geometry, 4), Err(Error::Corrupted(_))));

        Ok(())
    }
}
