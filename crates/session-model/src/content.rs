//! Content catalog metadata.
//!
//! Every finished media file gets a JSON sidecar (`<file>.json`) and an
//! entry in the content index that the library view lists.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Bookmark;

/// Kind of media handed to the content catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Full-session recording.
    Session,
    /// Saved replay buffer.
    Buffer,
    /// Clip cut from another item.
    Clip,
}

/// Sidecar metadata for one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub kind: ContentKind,
    pub game: String,
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    /// File size at cataloging time.
    #[serde(default)]
    pub size_bytes: u64,
}

impl ContentMetadata {
    /// Sidecar path for a media file: `clip.mkv` → `clip.mkv.json`.
    pub fn sidecar_path(media: &Path) -> PathBuf {
        let mut name = media.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }
}

/// Listing of everything in the content library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentIndex {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub items: Vec<ContentMetadata>,
}

impl ContentIndex {
    /// Newest items first.
    pub fn sort_newest_first(&mut self) {
        self.items
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.file.cmp(&b.file)));
    }

    /// Items recorded for a given game.
    pub fn for_game<'a>(&'a self, game: &'a str) -> impl Iterator<Item = &'a ContentMetadata> {
        self.items
            .iter()
            .filter(move |item| item.game.eq_ignore_ascii_case(game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(game: &str, file: &str, minutes_ago: i64) -> ContentMetadata {
        ContentMetadata {
            kind: ContentKind::Session,
            game: game.to_string(),
            file: PathBuf::from(file),
            title: None,
            created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
            bookmarks: Vec::new(),
            size_bytes: 0,
        }
    }

    #[test]
    fn sidecar_appends_json_extension() {
        assert_eq!(
            ContentMetadata::sidecar_path(Path::new("/v/Hades/run.mkv")),
            PathBuf::from("/v/Hades/run.mkv.json")
        );
    }

    #[test]
    fn index_sorts_newest_first_and_filters_by_game() {
        let mut index = ContentIndex {
            refreshed_at: None,
            items: vec![
                item("Hades", "a.mkv", 30),
                item("Celeste", "b.mkv", 10),
                item("hades", "c.mkv", 1),
            ],
        };
        index.sort_newest_first();
        let files: Vec<_> = index.items.iter().map(|i| i.file.clone()).collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("c.mkv"),
                PathBuf::from("b.mkv"),
                PathBuf::from("a.mkv")
            ]
        );
        assert_eq!(index.for_game("HADES").count(), 2);
    }
}
