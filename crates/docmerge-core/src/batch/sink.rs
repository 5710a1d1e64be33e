use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::DocmergeError;

const STAGING_SUBDIR: &str = "generated";

/// Destination for generated documents.
pub trait OutputSink {
    /// Store one document and return where it went. Writing a name twice
    /// replaces the earlier document.
    fn write(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DocmergeError>;
}

/// Writes documents as files into one directory.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    // Keeps a staging directory alive; removed on drop.
    _staging: Option<TempDir>,
}

impl DirectorySink {
    /// Write into `root`, creating it on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _staging: None,
        }
    }

    /// Write into a fresh temporary directory that lives as long as the sink.
    pub fn staging() -> Result<Self, DocmergeError> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join(STAGING_SUBDIR);
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _staging: Some(dir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_staging(&self) -> bool {
        self._staging.is_some()
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DocmergeError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(filename);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote document");
        Ok(path)
    }
}

/// Keeps documents in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outputs: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.outputs
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn into_outputs(self) -> Vec<(String, Vec<u8>)> {
        self.outputs
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DocmergeError> {
        match self.outputs.iter_mut().find(|(name, _)| name == filename) {
            Some(entry) => entry.1 = bytes.to_vec(),
            None => self.outputs.push((filename.to_string(), bytes.to_vec())),
        }
        Ok(PathBuf::from(filename))
    }
}
