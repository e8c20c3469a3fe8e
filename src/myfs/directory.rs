//! The single flat directory: a header holding the entry count, followed by
//! that many fixed-size entries in insertion order.

use super::{
    types::{DirEntry, DirEntryRecord, DirHeader, Geometry},
    util::{self, Record},
    DIR_ENTRY_SIZE, DIR_HEADER_SIZE, NAME_MAX,
};
use crate::{
    device::BlockDevice,
    error::{Error, Result},
};
use std::convert::TryFrom;

pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidName(name.to_owned()));
    }
    if name.len() > NAME_MAX {
        return Err(Error::NameTooLong {
            name: name.to_owned(),
            len: name.len(),
            max: NAME_MAX,
        });
    }

    Ok(())
}

pub fn load<D>(device: &D, geometry: &Geometry) -> Result<Vec<DirEntry>>
where
    D: BlockDevice,
{
    let buf = device.read(geometry.directory_offset(), DIR_HEADER_SIZE as usize)?;
    let header = DirHeader::from_bytes(&buf)?;
    if header.entry_count > geometry.inode_count {
        return Err(Error::Corrupted(format!(
            "directory claims {} entries but holds at most {}",
            header.entry_count, geometry.inode_count
        )));
    }

    let count = header.entry_count as usize;
    let buf = device.read(geometry.entry_offset(0), count * DIR_ENTRY_SIZE as usize)?;
    buf.chunks_exact(DIR_ENTRY_SIZE as usize)
        .map(|chunk| DirEntryRecord::from_bytes(chunk).and_then(DirEntry::try_from))
        .collect()
}

pub fn find<'a>(entries: &'a [DirEntry], name: &str) -> Option<(usize, &'a DirEntry)> {
    entries
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.name == name)
}

/// Adds `entry` to the in-memory listing. Nothing is written to the device.
pub fn append(entries: &mut Vec<DirEntry>, entry: DirEntry, capacity: u32) -> Result<()> {
    validate_name(&entry.name)?;
    if find(entries, &entry.name).is_some() {
        return Err(Error::DuplicateName(entry.name));
    }
    if entries.len() >= capacity as usize {
        return Err(Error::CapacityExhausted);
    }

    entries.push(entry);
    Ok(())
}

/// Rewrites the header and every entry.
pub fn persist<D>(device: &mut D, geometry: &Geometry, entries: &[DirEntry]) -> Result<()>
where
    D: BlockDevice,
{
    if entries.len() > geometry.inode_count as usize {
        return Err(Error::CapacityExhausted);
    }

    let mut buf = DirHeader::new(entries.len() as u32).to_bytes()?;
    for entry in entries {
        buf.extend(DirEntryRecord::try_from(entry)?.to_bytes()?);
    }

    Ok(device.write_at(geometry.directory_offset(), &buf)?)
}

/// Rewrites the single entry at `position`.
pub fn persist_entry<D>(
    device: &mut D,
    geometry: &Geometry,
    position: usize,
    entry: &DirEntry,
) -> Result<()>
where
    D: BlockDevice,
{
    if position >= geometry.inode_count as usize {
        return Err(Error::CapacityExhausted);
    }

    let buf = DirEntryRecord::try_from(entry)?.to_bytes()?;
    Ok(device.write_at(geometry.entry_offset(position), &buf)?)
}

/// Writes an empty header and zeroes the entry region.
pub fn format<D>(device: &mut D, geometry: &Geometry) -> Result<()>
where
    D: BlockDevice,
{
    let mut buf = DirHeader::new(0).to_bytes()?;
    buf.resize(util::directory_size(geometry.inode_count) as usize, 0);

    Ok(device.write_at(geometry.directory_offset(), &buf)?)
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
    fn names() {
        assert!(validate_name("a.txt").is_ok());
        assert!(validate_name(&"x".repeat(NAME_MAX)).is_ok());
        assert!(matches!(
            validate_name(&"x".repeat(NAME_MAX + 1)),
            Err(Error::NameTooLong { len: 28, .. })
        ));
        assert!(matches!(validate_name(""), Err(Error::InvalidName(_))));
        assert!(matches!(validate_name("a/b"), Err(Error::InvalidName(_))));
        assert!(matches!(validate_name("a\0b"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn empty_after_format() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let device = formatted(&geometry)?;
        assert!(load(&device, &geometry)?.is_empty());

        Ok(())
    }

    #[test]
    fn append_rules() -> anyhow::Result<()> {
        let mut entries = Vec::new();
        append(&mut entries, DirEntry::new("a", false, 0), 2)?;

        assert!(matches!(
            append(&mut entries, DirEntry::new("a", true, 1), 2),
            Err(Error::DuplicateName(name)) if name == "a"
        ));
        append(&mut entries, DirEntry::new("b", true, 1), 2)?;
        assert!(matches!(
            append(&mut entries, DirEntry::new("c", false, 2), 2),
            Err(Error::CapacityExhausted)
        ));
        assert_eq!(entries.len(), 2);

        Ok(())
    }

    #[test]
    fn persist_and_reload_in_order() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let mut device = formatted(&geometry)?;

        let mut entries = Vec::new();
        append(&mut entries, DirEntry::new("zeta", false, 2), 4)?;
        append(&mut entries, DirEntry::new("alpha", true, 0), 4)?;
        append(&mut entries, DirEntry::new("mid", false, 1), 4)?;
        persist(&mut device, &geometry, &entries)?;

        let loaded = load(&device, &geometry)?;
        assert_eq!(loaded, entries);
        assert_eq!(find(&loaded, "alpha").map(|(i, _)| i), Some(1));
        assert!(find(&loaded, "beta").is_none());

        let mut updated = loaded[2].clone();
        updated.logical_size = 11;
        persist_entry(&mut device, &geometry, 2, &updated)?;
        let loaded = load(&device, &geometry)?;
        assert_eq!(loaded[2].logical_size, 11);
        assert_eq!(loaded[0], entries[0]);

        Ok(())
    }

    #[test]
    fn bogus_count_is_rejected() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let mut device = formatted(&geometry)?;
        let buf = DirHeader::new(5).to_bytes()?;
        device.write_at(geometry.directory_offset(), &buf)?;

        assert!(matches!(load(&device, &geometry), Err(Error::Corrupted(_))));

        Ok(())
    }

    #[test]
    fn persist_rejects_what_it_cannot_store() -> anyhow::Result<()> {
        let geometry = Geometry::new(4, 16);
        let mut device = formatted(&geometry)?;
        let before = device.as_bytes().to_vec();

        let long = DirEntry::new(&"x".repeat(40), false, 0);
        assert!(matches!(
            persist(&mut device, &geometry, &[DirEntry::new("ok", false, 1), long.clone()]),
            Err(Error::NameTooLong { len: 40, .. })
        ));
        assert!(matches!(
            persist_entry(&mut device, &geometry, 0, &long),
            Err(Error::NameTooLong { .. })
        ));
        assert!(matches!(
            persist_entry(&mut device, &geometry, 4, &DirEntry::new("ok", false, 1)),
            Err(Error::CapacityExhausted)
        ));
        assert_eq!(device.as_bytes(), &before[..]);
        assert!(load(&device, &geometry)?.is_empty());

        Ok(())
    }
}
