use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use gdal::Dataset;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::Result;
use crate::io::RasterError;

/// A buffer registered in GDAL's `/vsimem` filesystem; unregistered on drop
#[derive(Debug)]
pub struct MemFile {
    path: PathBuf,
}

impl MemFile {
    pub fn register(path: PathBuf, data: Vec<u8>) -> std::result::Result<Self, RasterError> {
        gdal::vsi::create_mem_file(&path, data)?;
        Ok(MemFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> std::result::Result<Dataset, RasterError> {
        Ok(Dataset::open(&self.path)?)
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if let Err(e) = gdal::vsi::unlink_mem_file(&self.path) {
            warn!("Failed to release {:?}: {}", self.path, e);
        }
    }
}

/// Zip archive of raster tiles
pub struct RasterArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl RasterArchive {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let zip = ZipArchive::new(file)?;
        Ok(RasterArchive {
            path: path.to_path_buf(),
            zip,
        })
    }

    /// Archive file name without the `.zip` suffix
    pub fn stem(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.strip_suffix(".zip").unwrap_or(&name).to_string()
    }

    pub fn member_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    /// Read `members` into `/vsimem/<stem>/<member>` buffers
    pub fn buffer_members(&mut self, members: &[String]) -> Result<Vec<MemFile>> {
        let root = PathBuf::from("/vsimem").join(self.stem());
        let mut buffered = Vec::with_capacity(members.len());
        for name in members {
            let mut entry = self.zip.by_name(name)?;
            let mut data = Vec::with_capacity(capacity_hint(entry.size()));
            entry.read_to_end(&mut data)?;
            debug!("Buffered {} ({} bytes)", name, data.len());
            buffered.push(MemFile::register(root.join(name), data)?);
        }
        Ok(buffered)
    }
}

/// Declared sizes come from the zip header and are not trusted beyond this
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}
