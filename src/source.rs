//! Caller-owned file content handed to the coordinator.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

/// A named, immutable byte buffer queued for upload. Cloning is cheap;
/// the bytes are shared, never copied.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    bytes: Bytes,
}

impl FileSource {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming it after its final path component.
    #[tracing::instrument(fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).context(format!(
            "Failed to read file for upload: {}",
            path.display()
        ))?;

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("File has no usable name: {}", path.display()))?
            .to_string();

        Ok(Self {
            name,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the content.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
