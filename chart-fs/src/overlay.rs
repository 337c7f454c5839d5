use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::OverlayError;
use crate::tarball::{EmbeddedTarball, clean_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A read-only two-layer filesystem: the embedded tarball is probed first,
/// then the local working directory. Directory listings are the union of
/// both layers, embedded entries shadowing local entries of the same name.
pub struct ChartFs {
    embedded: EmbeddedTarball,
    local_root: PathBuf,
}

impl ChartFs {
    pub fn new(embedded: EmbeddedTarball, local_root: impl Into<PathBuf>) -> Self {
        Self {
            embedded,
            local_root: local_root.into(),
        }
    }

    pub fn embedded(&self) -> &EmbeddedTarball {
        &self.embedded
    }

    fn local_path(&self, path: &str) -> PathBuf {
        self.local_root.join(clean_path(path))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, OverlayError> {
        if let Some(file) = self.embedded.file(path)? {
            return Ok(file.data.clone());
        }
        match std::fs::read(self.local_path(path)) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(OverlayError::NotFound(path.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn read_to_string(&self, path: &str) -> Result<String, OverlayError> {
        let data = self.read(path)?;
        String::from_utf8(data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
    }

    pub fn exists(&self, path: &str) -> bool {
        matches!(self.embedded.file(path), Ok(Some(_)))
            || matches!(self.embedded.is_dir(path), Ok(true))
            || self.local_path(path).exists()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.embedded.is_dir(path), Ok(true)) || self.local_path(path).is_dir()
    }

    /// Union listing of both layers, sorted by name.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, OverlayError> {
        let embedded_dir = self.embedded.is_dir(path)?;
        let local = self.local_path(path);
        if !embedded_dir && !local.is_dir() {
            return Err(OverlayError::NotFound(path.to_owned()));
        }

        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        if local.is_dir() {
            for entry in std::fs::read_dir(&local)? {
                let entry = entry?;
                entries.insert(
                    entry.file_name().to_string_lossy().into_owned(),
                    entry.file_type()?.is_dir(),
                );
            }
        }
        if embedded_dir {
            for (name, is_dir) in self.embedded.list(path)? {
                entries.insert(name, is_dir);
            }
        }
        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    /// Write operations are not supported on the overlay.
    pub fn write(&self, path: &str, _data: &[u8]) -> Result<(), OverlayError> {
        Err(OverlayError::ReadOnly(path.to_owned()))
    }

    /// Extracts the embedded layer only; the local layer already lives on
    /// disk.
    pub fn extract_embedded(&self, root: &Path) -> Result<(), OverlayError> {
        self.embedded.extract_to(root)
    }
}
