//! Recent-clips archive.
//!
//! Layout under the archive root:
//!
//! ```text
//! index.json              newest-first RecentClipIndex
//! <id>/source.<ext>       full copy of the exported source
//! <id>/thumb.jpg          poster frame (optional)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rampcut_common::{ArchiveConfig, RampcutError, RampcutResult};
use rampcut_project_model::{RecentClipEntry, RecentClipIndex};
use rampcut_render_engine::Thumbnailer;

const INDEX_FILE: &str = "index.json";
const THUMBNAIL_FILE: &str = "thumb.jpg";

/// What the archive stored for one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedClip {
    pub id: String,
    pub thumbnail: Option<PathBuf>,
    pub full_copy: PathBuf,
}

#[async_trait]
pub trait ClipArchive: Send + Sync {
    async fn archive(&self, source: &Path) -> RampcutResult<ArchivedClip>;

    /// Archived clips, newest first.
    async fn list(&self) -> RampcutResult<Vec<RecentClipEntry>>;
}

/// Capacity-bounded archive stored in a plain directory.
pub struct DirectoryArchive {
    root: PathBuf,
    capacity: usize,
    max_entry_bytes: u64,
    thumbnailer: Option<Arc<dyn Thumbnailer>>,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>, capacity: usize, max_entry_bytes: u64) -> Self {
        Self {
            root: root.into(),
            capacity,
            max_entry_bytes,
            thumbnailer: None,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.dir.clone(), config.capacity, config.max_entry_bytes)
    }

    pub fn with_thumbnailer(mut self, thumbnailer: Arc<dyn Thumbnailer>) -> Self {
        self.thumbnailer = Some(thumbnailer);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_index(&self) -> RampcutResult<RecentClipIndex> {
        let path = self.root.join(INDEX_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(index) => Ok(index),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Archive index is malformed, starting a new one"
                    );
                    Ok(RecentClipIndex::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RecentClipIndex::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_index(&self, index: &RecentClipIndex) -> RampcutResult<()> {
        let json = serde_json::to_string_pretty(index)?;
        let tmp = self.root.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.root.join(INDEX_FILE)).await?;
        Ok(())
    }

    fn new_entry_dir(&self) -> (String, PathBuf) {
        let base = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string();
        let first = self.root.join(&base);
        if !first.exists() {
            return (base, first);
        }
        (1u32..)
            .map(|n| format!("{base}-{n}"))
            .map(|id| {
                let dir = self.root.join(&id);
                (id, dir)
            })
            .find(|(_, dir)| !dir.exists())
            .unwrap_or((base, first))
    }
}

#[async_trait]
impl ClipArchive for DirectoryArchive {
    async fn archive(&self, source: &Path) -> RampcutResult<ArchivedClip> {
        if self.capacity == 0 {
            return Err(RampcutError::archive("Archive capacity is zero"));
        }

        let size_bytes = tokio::fs::metadata(source).await?.len();
        if size_bytes > self.max_entry_bytes {
            return Err(RampcutError::archive(format!(
                "{} is {size_bytes} bytes, above the {} byte limit",
                source.display(),
                self.max_entry_bytes
            )));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let mut index = self.load_index().await?;
        let (id, entry_dir) = self.new_entry_dir();
        tokio::fs::create_dir_all(&entry_dir).await?;

        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let full_copy = entry_dir.join(format!("source{ext}"));
        if let Err(e) = tokio::fs::copy(source, &full_copy).await {
            let _ = tokio::fs::remove_dir_all(&entry_dir).await;
            return Err(RampcutError::archive(format!(
                "Cannot copy {}: {e}",
                source.display()
            )));
        }

        let thumbnail = match &self.thumbnailer {
            Some(thumbnailer) => {
                let dest = entry_dir.join(THUMBNAIL_FILE);
                match thumbnailer.thumbnail(&full_copy, &dest).await {
                    Ok(()) => Some(dest),
                    Err(e) => {
                        tracing::warn!(error = %e, "Thumbnail unavailable for archived clip");
                        None
                    }
                }
            }
            None => None,
        };

        let entry = RecentClipEntry {
            id: id.clone(),
            source_name: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            archived_at: chrono::Utc::now().to_rfc3339(),
            full_copy: full_copy.clone(),
            thumbnail: thumbnail.clone(),
            size_bytes,
        };

        let evicted = index.insert_bounded(entry, self.capacity);
        if let Err(e) = self.save_index(&index).await {
            let _ = tokio::fs::remove_dir_all(&entry_dir).await;
            return Err(RampcutError::archive(format!("Cannot update archive index: {e}")));
        }

        for old in evicted {
            let dir = self.root.join(&old.id);
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(id = %old.id, error = %e, "Failed to remove evicted clip");
            } else {
                tracing::debug!(id = %old.id, "Evicted archived clip");
            }
        }

        tracing::info!(id = %id, size_bytes, entries = index.len(), "Source clip archived");
        Ok(ArchivedClip {
            id,
            thumbnail,
            full_copy,
        })
    }

    async fn list(&self) -> RampcutResult<Vec<RecentClipEntry>> {
        Ok(self.load_index().await?.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubThumbnailer {
        fail: bool,
    }

    #[async_trait]
    impl Thumbnailer for StubThumbnailer {
        async fn thumbnail(&self, _source: &Path, dest: &Path) -> RampcutResult<()> {
            if self.fail {
                return Err(RampcutError::archive("no decoder"));
            }
            tokio::fs::write(dest, b"jpg").await?;
            Ok(())
        }
    }

    fn clip(dir: &Path, name: &str, bytes: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![7u8; bytes]).unwrap();
        path
    }

    #[tokio::test]
    async fn archives_copy_and_thumbnail() {
        let tmp = tempfile::tempdir().unwrap();
        let source = clip(tmp.path(), "beach.mp4", 64);
        let archive = DirectoryArchive::new(tmp.path().join("recent"), 3, 1024)
            .with_thumbnailer(Arc::new(StubThumbnailer { fail: false }));

        let stored = archive.archive(&source).await.unwrap();
        assert!(stored.full_copy.ends_with("source.mp4"));
        assert_eq!(std::fs::read(&stored.full_copy).unwrap().len(), 64);
        assert!(stored.thumbnail.as_ref().is_some_and(|t| t.exists()));

        let entries = archive.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_name, "beach.mp4");
        assert_eq!(entries[0].size_bytes, 64);
    }

    #[tokio::test]
    async fn evicts_oldest_beyond_capacity() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = DirectoryArchive::new(tmp.path().join("recent"), 2, 1024);

        let mut stored = Vec::new();
        for name in ["a.mp4", "b.mp4", "c.mp4"] {
            let source = clip(tmp.path(), name, 8);
            stored.push(archive.archive(&source).await.unwrap());
        }

        let entries = archive.list().await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.source_name.as_str()).collect();
        assert_eq!(names, vec!["c.mp4", "b.mp4"]);
        assert!(!stored[0].full_copy.exists());
        assert!(stored[2].full_copy.exists());
    }

    fn entry_dirs(root: &Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_dir())
            .count()
    }

    #[tokio::test]
    async fn malformed_index_does_not_leak_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("recent");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join(INDEX_FILE), "{ not json").unwrap();
        let archive = DirectoryArchive::new(&root, 2, 1024);

        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
            let source = clip(tmp.path(), name, 8);
            archive.archive(&source).await.unwrap();
        }

        let entries = archive.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entry_dirs(&root), 2);
        assert!(entries.iter().all(|e| e.full_copy.exists()));
    }

    #[tokio::test]
    async fn failed_index_write_removes_the_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("recent");
        std::fs::create_dir_all(root.join(format!("{INDEX_FILE}.tmp"))).unwrap();
        let archive = DirectoryArchive::new(&root, 2, 1024);

        let source = clip(tmp.path(), "a.mp4", 8);
        let err = archive.archive(&source).await.unwrap_err();
        assert!(matches!(err, RampcutError::Archive { .. }));
        // Only the blocking tmp directory remains.
        assert_eq!(entry_dirs(&root), 1);
    }

    #[tokio::test]
    async fn rejects_oversized_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let source = clip(tmp.path(), "huge.mp4", 200);
        let archive = DirectoryArchive::new(tmp.path().join("recent"), 5, 100);

        let err = archive.archive(&source).await.unwrap_err();
        assert!(matches!(err, RampcutError::Archive { .. }));
        assert!(archive.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn thumbnail_failure_keeps_the_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let source = clip(tmp.path(), "night.mov", 16);
        let archive = DirectoryArchive::new(tmp.path().join("recent"), 5, 1024)
            .with_thumbnailer(Arc::new(StubThumbnailer { fail: true }));

        let stored = archive.archive(&source).await.unwrap();
        assert!(stored.thumbnail.is_none());
        assert!(stored.full_copy.exists());
    }
}
