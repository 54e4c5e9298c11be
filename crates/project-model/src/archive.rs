//! Recent-clips index (`index.json`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One archived source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentClipEntry {
    pub id: String,
    /// File name of the original source.
    pub source_name: String,
    /// RFC 3339 timestamp.
    pub archived_at: String,
    /// Stored full copy of the source.
    pub full_copy: PathBuf,
    /// Poster frame, absent when thumbnailing failed.
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,
    pub size_bytes: u64,
}

/// Newest-first list of archived clips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentClipIndex {
    #[serde(default)]
    pub entries: Vec<RecentClipEntry>,
}

impl RecentClipIndex {
    /// Insert `entry` at the front and evict the oldest beyond `capacity`.
    ///
    /// Returns the evicted entries so the caller can remove their files.
    pub fn insert_bounded(
        &mut self,
        entry: RecentClipEntry,
        capacity: usize,
    ) -> Vec<RecentClipEntry> {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.insert(0, entry);
        if self.entries.len() > capacity {
            self.entries.split_off(capacity)
        } else {
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
