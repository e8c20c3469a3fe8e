use super::{
    content, directory, inode_table,
    types::{DirEntry, Geometry, InodeRecord, Superblock},
    util::Record,
    SUPERBLOCK_SIZE,
};
use crate::{
    device::BlockDevice,
    error::{Error, Result},
};
use log::{debug, info, warn};

/// Usage summary, the counterpart of `statvfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub inode_count: u32,
    pub free_inodes: u32,
    pub slot_size: u32,
    pub entry_count: u32,
    pub device_size: u64,
}

/// A mounted file system. Only the geometry read from the superblock is kept
/// between calls; the inode table and directory are re-read every time.
#[derive(Debug)]
pub struct MyFs<D> {
    device: D,
    geometry: Geometry,
}

impl<D> MyFs<D>
where
    D: BlockDevice,
{
    /// Mounts `device`, formatting it with `geometry` when no valid file
    /// system is found on it.
    pub fn mount(device: D, geometry: Geometry) -> Result<Self> {
        check_device_size(&device, SUPERBLOCK_SIZE)?;

        match read_superblock(&device)? {
            Some(sb) => {
                let geometry = sb.geometry();
                debug!("mounted myfs with {:?}", geometry);
                Ok(Self { device, geometry })
            }
            None => {
                info!("did not find a myfs instance on the device, creating one");
                let fs = Self::format(device, geometry)?;
                info!("finished formatting");
                Ok(fs)
            }
        }
    }

    /// Initializes every metadata region, discarding whatever the device held.
    pub fn format(mut device: D, geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        check_device_size(&device, geometry.device_size())?;

        info!(
            "formatting {} inodes with {} byte slots",
            geometry.inode_count, geometry.slot_size
        );
        let buf = Superblock::new(geometry).to_bytes()?;
        device.write_at(0, &buf)?;
        inode_table::format(&mut device, &geometry)?;
        directory::format(&mut device, &geometry)?;
        device.flush()?;

        Ok(Self { device, geometry })
    }

    pub fn create_file(&mut self, path: &str, is_directory: bool) -> Result<()> {
        let name = entry_name(path);
        debug!("creating {:?} (directory: {})", name, is_directory);
        directory::validate_name(name)?;

        let mut entries = directory::load(&self.device, &self.geometry)?;
        if directory::find(&entries, name).is_some() {
            return Err(Error::DuplicateName(name.to_owned()));
        }
        let table = inode_table::load(&self.device, &self.geometry)?;
        let index = inode_table::allocate(&table)?;
        directory::append(
            &mut entries,
            DirEntry::new(name, is_directory, index),
            self.geometry.inode_count,
        )?;

        let mut inode = InodeRecord {
            data_offset: self.geometry.slot_offset(index) as u32,
            ..InodeRecord::free(index)
        };
        inode_table::persist_one(&mut self.device, &self.geometry, &mut inode)?;
        directory::persist(&mut self.device, &self.geometry, &entries)?;

        Ok(self.device.flush()?)
    }

    /// Lists the root directory. Naming a directory entry yields an empty
    /// listing since nothing can live below the root.
    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let name = entry_name(path);
        let entries = directory::load(&self.device, &self.geometry)?;
        if name.is_empty() {
            return Ok(entries);
        }

        match directory::find(&entries, name) {
            Some((_, entry)) if entry.is_directory => Ok(Vec::new()),
            Some(_) => Err(Error::NotADirectory(name.to_owned())),
            None => Err(Error::NotFound(name.to_owned())),
        }
    }

    pub fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        let name = entry_name(path);
        debug!("reading {:?}", name);
        let entries = directory::load(&self.device, &self.geometry)?;
        let (_, entry) = resolve_file(&entries, name)?;

        let inode = self.referenced_inode(entry)?;
        content::read_content(&self.device, &self.geometry, &inode)
    }

    pub fn set_content(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let name = entry_name(path);
        debug!("writing {} bytes to {:?}", content.len(), name);
        let entries = directory::load(&self.device, &self.geometry)?;
        let (position, entry) = resolve_file(&entries, name)?;
        if content.len() > self.geometry.slot_size as usize {
            return Err(Error::ContentTooLarge {
                len: content.len(),
                max: self.geometry.slot_size as usize,
            });
        }

        let inode = self.referenced_inode(entry)?;
        let inode = content::write_content(&mut self.device, &self.geometry, &inode, content)?;
        if inode.size != entry.logical_size {
            let updated = DirEntry {
                logical_size: inode.size,
                ..entry.clone()
            };
            directory::persist_entry(&mut self.device, &self.geometry, position, &updated)?;
        }

        Ok(self.device.flush()?)
    }

    pub fn statfs(&self) -> Result<StatFs> {
        let table = inode_table::load(&self.device, &self.geometry)?;
        let entries = directory::load(&self.device, &self.geometry)?;

        Ok(StatFs {
            inode_count: self.geometry.inode_count,
            free_inodes: table.iter().filter(|inode| inode.is_free()).count() as u32,
            slot_size: self.geometry.slot_size,
            entry_count: entries.len() as u32,
            device_size: self.geometry.device_size(),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    fn referenced_inode(&self, entry: &DirEntry) -> Result<InodeRecord> {
        let inode = inode_table::find(&self.device, &self.geometry, entry.inode_index)?;
        if inode.is_free() {
            return Err(Error::Corrupted(format!(
                "entry {:?} references free inode {}",
                entry.name, entry.inode_index
            )));
        }

        Ok(inode)
    }
}

/// Strips the optional leading separator of a root-relative path.
fn entry_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn resolve_file<'a>(entries: &'a [DirEntry], name: &str) -> Result<(usize, &'a DirEntry)> {
    match directory::find(entries, name) {
        Some((_, entry)) if entry.is_directory => Err(Error::IsADirectory(name.to_owned())),
        Some(found) => Ok(found),
        None => Err(Error::NotFound(name.to_owned())),
    }
}

fn check_device_size<D>(device: &D, required: u64) -> Result<()>
where
    D: BlockDevice,
{
    if device.size() < required {
        return Err(Error::DeviceTooSmall {
            required,
            actual: device.size(),
        });
    }

    Ok(())
}

/// Returns the superblock when it describes a current, intact file system
/// that fits on `device`. Device failures are reported, never taken as an
/// absent header.
fn read_superblock<D>(device: &D) -> Result<Option<Superblock>>
where
    D: BlockDevice,
{
    let buf = device.read(0, SUPERBLOCK_SIZE as usize)?;
    let sb = match Superblock::from_bytes(&buf) {
        Ok(sb) => sb,
        Err(err) => {
            debug!("rejecting superblock: {}", err);
            return Ok(None);
        }
    };
    if !sb.is_current() {
        debug!("superblock magic {:?} version {} is not current", sb.magic, sb.version);
        return Ok(None);
    }
    if let Err(err) = sb.geometry().validate() {
        warn!("superblock passed its checksum but {}", err);
        return Ok(None);
    }
    if sb.geometry().device_size() > device.size() {
        warn!(
            "superblock describes {} bytes but the device holds {}",
            sb.geometry().device_size(),
            device.size()
        );
        return Ok(None);
    }

    Ok(Some(sb))
}
