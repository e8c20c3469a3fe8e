//! Byte-addressable storage the file system lives on.
//!
//! Two backings are provided: [`MemDevice`], a plain vector used by tests,
//! and [`ImageDevice`], a memory-mapped image file used by the command line.

use crate::error::DeviceError;
use memmap::MmapMut;
use std::{fs::OpenOptions, path::Path};

pub trait BlockDevice {
    /// Total number of addressable bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Overwrites the bytes starting at `offset` with `buf`.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError>;

    fn flush(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>, DeviceError> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

/// Returns the byte range `[offset, offset + len)` if it fits in `size`.
fn checked_range(offset: u64, len: usize, size: u64) -> Result<(usize, usize), DeviceError> {
    let out_of_bounds = DeviceError::OutOfBounds {
        offset,
        len: len as u64,
        size,
    };
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok((offset as usize, end as usize)),
        _ => Err(out_of_bounds),
    }
}

#[derive(Debug, Clone)]
pub struct MemDevice {
    bytes: Vec<u8>,
}

impl MemDevice {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl BlockDevice for MemDevice {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let (start, end) = checked_range(offset, buf.len(), self.size())?;
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let (start, end) = checked_range(offset, buf.len(), self.size())?;
        self.bytes[start..end].copy_from_slice(buf);
        Ok(())
    }
}

/// An image file mapped into memory. Writes land in the mapping and reach
/// the file on [`flush`](BlockDevice::flush).
#[derive(Debug)]
pub struct ImageDevice {
    mmap: MmapMut,
}

impl ImageDevice {
    pub fn open<P>(image_path: P) -> Result<Self, DeviceError>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { mmap })
    }
}

impl BlockDevice for ImageDevice {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let (start, end) = checked_range(offset, buf.len(), self.size())?;
        buf.copy_from_slice(&self.mmap[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let (start, end) = checked_range(offset, buf.len(), self.size())?;
        self.mmap[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        Ok(self.mmap.flush()?)
    }
}
