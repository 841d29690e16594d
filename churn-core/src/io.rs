//! File I/O for serialized artifacts
//!
//! Artifacts are read through a read-only memory map and written with a
//! write-to-temp-then-rename sequence, so a reader only ever observes a
//! complete old file or a complete new one.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Memory-mapped file for zero-copy reads
pub struct MemoryMappedFile {
    /// The memory map; `None` for empty files, which cannot be mapped
    mmap: Option<Mmap>,

    /// The path to the file
    path: PathBuf,

    /// The size of the file in bytes
    size: usize,
}

impl MemoryMappedFile {
    /// Open a file for memory-mapped reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(&path),
            _ => Error::Io(e),
        })?;
        let size = usize::try_from(file.metadata()?.len()).map_err(|_| {
            Error::InvalidArgument(format!("{} is too large to map", path.display()))
        })?;

        let mmap = if size == 0 { None } else { Some(map_readonly(&file)?) };

        Ok(Self { mmap, path, size })
    }

    /// Get a slice of the memory-mapped file
    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Get the path to the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the size of the file
    pub fn size(&self) -> usize {
        self.size
    }
}

// The map is read-only and writers replace files by rename, never in place.
#[allow(unsafe_code)]
fn map_readonly(file: &File) -> io::Result<Mmap> {
    unsafe { MmapOptions::new().map(file) }
}

/// Deserialize a bincode artifact.
///
/// Fails with `NotFound` if `path` is missing and `CorruptArtifact` if its
/// bytes do not decode.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = MemoryMappedFile::open(path)?;
    bincode::deserialize(file.as_slice()).map_err(|e| Error::CorruptArtifact {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize `value` with bincode and atomically replace `path` with it
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(|e| {
        Error::persistence(path, io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    })?;
    write_atomic(path, &bytes)
}

/// Atomically replace `path` with `bytes`, creating parent directories.
///
/// Any failure is reported as `Persistence` and leaves `path` untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::persistence(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidArgument(format!("{} has no file name", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp_path = path.with_file_name(tmp_name);

    let result = write_file(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::persistence(path, e));
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()
}
