// SPDX-License-Identifier: MIT

//! Text artifact output (reports written at the end of a run)

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Create or replace the artifact at `path` with `content`
    async fn write_text(&self, path: &str, content: &str) -> io::Result<()>;
}

/// Writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    root: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactWriter for FsArtifactWriter {
    async fn write_text(&self, path: &str, content: &str) -> io::Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        log::debug!("Wrote {} bytes to {}", content.len(), target.display());
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by path
#[derive(Debug, Default)]
pub struct MemoryArtifactWriter {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactWriter for MemoryArtifactWriter {
    async fn write_text(&self, path: &str, content: &str) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "artifact store poisoned"))?;
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_writer_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path());

        writer.write_text("reports/out.md", "first").await.unwrap();
        writer.write_text("reports/out.md", "second").await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("reports/out.md")).unwrap();
        assert_eq!(written, "second");
    }

    #[tokio::test]
    async fn test_fs_writer_reports_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), "file").unwrap();
        let writer = FsArtifactWriter::new(dir.path().join("blocker"));

        assert!(writer.write_text("out.md", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_writer() {
        let writer = MemoryArtifactWriter::new();
        writer.write_text("b.md", "B").await.unwrap();
        writer.write_text("a.md", "A").await.unwrap();

        assert_eq!(writer.get("a.md").as_deref(), Some("A"));
        assert_eq!(writer.paths(), vec!["a.md", "b.md"]);
        assert!(writer.get("c.md").is_none());
    }
}
