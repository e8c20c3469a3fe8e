use super::{inode_table, types::{Geometry, InodeRecord}};
use crate::{
    device::BlockDevice,
    error::{Error, Result},
};

fn check_allocated(inode: &InodeRecord, geometry: &Geometry) -> Result<()> {
    if inode.is_free() {
        return Err(Error::Corrupted(format!(
            "inode {} is referenced but free",
            inode.index
        )));
    }
    if inode.data_offset as u64 != geometry.slot_offset(inode.index) {
        return Err(Error::Corrupted(format!(
            "inode {} points at offset {}, outside its slot",
            inode.index, inode.data_offset
        )));
    }

    Ok(())
}

pub fn read_content<D>(device: &D, geometry: &Geometry, inode: &InodeRecord) -> Result<Vec<u8>>
where
    D: BlockDevice,
{
    check_allocated(inode, geometry)?;
    if inode.size > geometry.slot_size {
        return Err(Error::Corrupted(format!(
            "inode {} has size {} beyond the slot size {}",
            inode.index, inode.size, geometry.slot_size
        )));
    }

    Ok(device.read(inode.data_offset as u64, inode.size as usize)?)
}

/// Replaces the content of `inode`'s slot and persists the new size.
pub fn write_content<D>(
    device: &mut D,
    geometry: &Geometry,
    inode: &InodeRecord,
    content: &[u8],
) -> Result<InodeRecord>
where
    D: BlockDevice,
{
    if content.len() > geometry.slot_size as usize {
        return Err(Error::ContentTooLarge {
            len: content.len(),
            max: geometry.slot_size as usize,
        });
    }
    check_allocated(inode, geometry)?;

    device.write_at(inode.data_offset as u64, content)?;
    let mut updated = InodeRecord {
        size: content.len() as u32,
        ..*inode
    };
    inode_table::persist_one(device, geometry, &mut updated)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn allocated(geometry: &Geometry, index: u32) -> anyhow::Result<(MemDevice, InodeRecord)> {
        let mut device = MemDevice::new(geometry.device_size() as usize);
        inode_table::format(&mut device, geometry)?;
        let mut inode = InodeRecord {
            data_offset: geometry.slot_offset(index) as u32,
            ..InodeRecord::free(index)
        };
        inode_table::persist_one(&mut device, geometry, &mut inode)?;
        Ok((device, inode))
    }

    #[test]
    fn write_then_read() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let (mut device, inode) = allocated(&geometry, 1)?;
        assert!(read_content(&device, &geometry, &inode)?.is_empty());

        let updated = write_content(&mut device, &geometry, &inode, b"hello")?;
        assert_eq!(updated.size, 5);
        assert_eq!(read_content(&device, &geometry, &updated)?, b"hello");
        assert_eq!(inode_table::find(&device, &geometry, 1)?, updated);

        let full = [7u8; 16];
        let updated = write_content(&mut device, &geometry, &updated, &full)?;
        assert_eq!(read_content(&device, &geometry, &updated)?, full);

        // shrinking exposes only the new bytes
        let updated = write_content(&mut device, &geometry, &updated, b"ab")?;
        assert_eq!(read_content(&device, &geometry, &updated)?, b"ab");

        Ok(())
    }

    #[test]
    fn slots_do_not_overlap() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 8);
        let (mut device, first) = allocated(&geometry, 0)?;
        let mut second = InodeRecord {
            data_offset: geometry.slot_offset(1) as u32,
            ..InodeRecord::free(1)
        };
        inode_table::persist_one(&mut device, &geometry, &mut second)?;

        let first = write_content(&mut device, &geometry, &first, &[1u8; 8])?;
        let second = write_content(&mut device, &geometry, &second, &[2u8; 8])?;
        assert_eq!(read_content(&device, &geometry, &first)?, [1u8; 8]);
        assert_eq!(read_content(&device, &geometry, &second)?, [2u8; 8]);

        Ok(())
    }

    #[test]
    fn too_large_leaves_device_untouched() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let (mut device, inode) = allocated(&geometry, 0)?;
        let before = device.as_bytes().to_vec();

        let res = write_content(&mut device, &geometry, &inode, &[0u8; 17]);
        assert!(matches!(res, Err(Error::ContentTooLarge { len: 17, max: 16 })));
        assert_eq!(device.as_bytes(), &before[..]);

        Ok(())
    }

    #[test]
    fn free_inode_is_corrupted() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let (mut device, _) = allocated(&geometry, 0)?;
        let free = InodeRecord::free(2);

        assert!(matches!(
            read_content(&device, &geometry, &free),
            Err(Error::Corrupted(_))
        ));
        assert!(matches!(
            write_content(&mut device, &geometry, &free, b"x"),
            Err(Error::Corrupted(_))
        ));

        Ok(())
    }
}
