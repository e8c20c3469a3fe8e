use crate::{
    device::ImageDevice,
    error::{DeviceError, Result},
    myfs::{fs::MyFs, types::Geometry},
};
use log::{info, warn};
use std::{
    fs::{File, OpenOptions},
    path::Path,
};

/// Creates a new image file sized for `geometry` and formats it. A failure
/// after the file was created removes it again.
pub fn make<P>(path: P, geometry: Geometry) -> Result<MyFs<ImageDevice>>
where
    P: AsRef<Path>,
{
    geometry.validate()?;

    let path = path.as_ref();
    let file = create_file(path)?;
    remove_on_error(path, size_and_format(path, file, geometry))
}

fn size_and_format(path: &Path, file: File, geometry: Geometry) -> Result<MyFs<ImageDevice>> {
    file.set_len(geometry.device_size())
        .map_err(DeviceError::from)?;
    drop(file);
    info!(
        "created {} with {} bytes",
        path.display(),
        geometry.device_size()
    );

    let device = ImageDevice::open(path)?;
    MyFs::format(device, geometry)
}

fn remove_on_error<T>(path: &Path, res: Result<T>) -> Result<T> {
    if res.is_err() {
        if let Err(err) = std::fs::remove_file(path) {
            warn!("could not remove {}: {}", path.display(), err);
        }
    }

    res
}

fn create_file<P: AsRef<Path>>(name: P) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(name)
        .map_err(DeviceError::from)?;

    Ok(file)
}
