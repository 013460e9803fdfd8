//! Media/content catalog handoff.
//!
//! Finished recordings and replay saves are handed to a [`ContentSink`],
//! which writes metadata and keeps the library index current. Thumbnails and
//! waveforms are produced by the external media pipeline; the filesystem
//! sink only records that they were requested.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gamecap_common::error::GameCapResult;
use gamecap_session_model::{Bookmark, ContentIndex, ContentKind, ContentMetadata};

/// File name of the library listing inside the content root.
pub const CONTENT_INDEX_FILE: &str = "content-index.json";

pub trait ContentSink: Send + Sync {
    /// Write the metadata sidecar for `media`; returns the sidecar path.
    fn create_metadata_file(
        &self,
        media: &Path,
        kind: ContentKind,
        game: &str,
        bookmarks: Option<&[Bookmark]>,
        title: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> GameCapResult<PathBuf>;

    fn create_thumbnail(&self, media: &Path, kind: ContentKind) -> GameCapResult<()>;

    fn create_waveform(&self, media: &Path, kind: ContentKind) -> GameCapResult<()>;

    fn refresh_content_index(&self) -> GameCapResult<()>;
}

/// Hand a finished media file to `sink`. Failures are logged, not returned:
/// the file is already on disk and cataloging can be redone later.
pub fn catalog(
    sink: &dyn ContentSink,
    media: &Path,
    kind: ContentKind,
    game: &str,
    bookmarks: Option<&[Bookmark]>,
    created_at: Option<DateTime<Utc>>,
) {
    if let Err(e) = sink.create_metadata_file(media, kind, game, bookmarks, None, created_at) {
        tracing::warn!(path = %media.display(), error = %e, "Failed to write content metadata");
    }
    if let Err(e) = sink.create_thumbnail(media, kind) {
        tracing::warn!(path = %media.display(), error = %e, "Thumbnail request failed");
    }
    if let Err(e) = sink.create_waveform(media, kind) {
        tracing::warn!(path = %media.display(), error = %e, "Waveform request failed");
    }
    if let Err(e) = sink.refresh_content_index() {
        tracing::warn!(error = %e, "Content index refresh failed");
    }
}

/// Content catalog stored as JSON next to the media under one root.
#[derive(Debug, Clone)]
pub struct FsContentSink {
    root: PathBuf,
}

impl FsContentSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(CONTENT_INDEX_FILE)
    }

    /// Read the last written index; missing or unreadable yields an empty one.
    pub fn load_index(&self) -> ContentIndex {
        std::fs::read_to_string(self.index_path())
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn collect_sidecars(dir: &Path, depth: usize, out: &mut Vec<ContentMetadata>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if depth > 0 {
                    Self::collect_sidecars(&path, depth - 1, out);
                }
                continue;
            }
            let is_sidecar = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json") && n != CONTENT_INDEX_FILE);
            if !is_sidecar {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| {
                    serde_json::from_str::<ContentMetadata>(&json).map_err(|e| e.to_string())
                }) {
                Ok(item) => out.push(item),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping sidecar"),
            }
        }
    }
}

impl ContentSink for FsContentSink {
    fn create_metadata_file(
        &self,
        media: &Path,
        kind: ContentKind,
        game: &str,
        bookmarks: Option<&[Bookmark]>,
        title: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> GameCapResult<PathBuf> {
        let size_bytes = std::fs::metadata(media).map(|m| m.len()).unwrap_or(0);
        let metadata = ContentMetadata {
            kind,
            game: game.to_string(),
            file: media.to_path_buf(),
            title: title.map(str::to_string),
            created_at: created_at.unwrap_or_else(Utc::now),
            bookmarks: bookmarks.map(<[Bookmark]>::to_vec).unwrap_or_default(),
            size_bytes,
        };
        let sidecar = ContentMetadata::sidecar_path(media);
        if let Some(parent) = sidecar.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;
        tracing::debug!(sidecar = %sidecar.display(), ?kind, "Content metadata written");
        Ok(sidecar)
    }

    fn create_thumbnail(&self, media: &Path, kind: ContentKind) -> GameCapResult<()> {
        tracing::info!(path = %media.display(), ?kind, "Thumbnail requested");
        Ok(())
    }

    fn create_waveform(&self, media: &Path, kind: ContentKind) -> GameCapResult<()> {
        tracing::info!(path = %media.display(), ?kind, "Waveform requested");
        Ok(())
    }

    fn refresh_content_index(&self) -> GameCapResult<()> {
        let mut index = ContentIndex {
            refreshed_at: Some(Utc::now()),
            items: Vec::new(),
        };
        // Layout is <root>/<game>/<media>.json.
        Self::collect_sidecars(&self.root, 1, &mut index.items);
        index.sort_newest_first();

        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.index_path(), serde_json::to_string_pretty(&index)?)?;
        tracing::debug!(items = index.items.len(), "Content index refreshed");
        Ok(())
    }
}
