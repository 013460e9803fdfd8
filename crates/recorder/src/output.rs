//! Output file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const UNKNOWN_GAME: &str = "Unknown Game";

/// Make `name` safe as a single path component on every platform.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        UNKNOWN_GAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Per-game directory under the output root.
pub fn game_directory(output_dir: &Path, game: &str) -> PathBuf {
    output_dir.join(sanitize_component(game))
}

/// `<output_dir>/<game>/<game> <YYYY-MM-DD HH-MM-SS>.mkv`
pub fn recording_path(output_dir: &Path, game: &str, at: DateTime<Local>) -> PathBuf {
    let game = sanitize_component(game);
    output_dir
        .join(&game)
        .join(format!("{game} {}.mkv", at.format("%Y-%m-%d %H-%M-%S")))
}
