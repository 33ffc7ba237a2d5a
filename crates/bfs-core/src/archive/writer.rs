//! Destinations for decoded entries

use crate::security::sanitize_path;
use crate::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Receives decoded files
pub trait FileSystemWriter {
    /// Store `data` under the archive path `relative`, replacing any
    /// existing file at that path.
    fn write_file(&mut self, relative: &str, data: &[u8]) -> Result<()>;
}

/// Writes entries below a root directory on disk
#[derive(Debug, Clone)]
pub struct DiskWriter {
    root: PathBuf,
}

impl DiskWriter {
    /// Create a writer rooted at `root`, creating the directory if needed
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSystemWriter for DiskWriter {
    fn write_file(&mut self, relative: &str, data: &[u8]) -> Result<()> {
        let target = sanitize_path(&self.root, relative)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = ?target, size = data.len(), "Writing file");
        fs::write(&target, data)?;
        Ok(())
    }
}

/// Collects entries in memory, keyed by archive path
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn into_files(self) -> BTreeMap<String, Vec<u8>> {
        self.files
    }
}

impl FileSystemWriter for MemoryWriter {
    fn write_file(&mut self, relative: &str, data: &[u8]) -> Result<()> {
        let parts = crate::security::safe_components(relative)?;
        self.files.insert(parts.join("/"), data.to_vec());
        Ok(())
    }
}
