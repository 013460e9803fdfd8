//! Application configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recording output settings.
    pub recording: RecordingDefaults,

    /// Game detection settings.
    pub detection: DetectionConfig,

    /// Bounds for every blocking wait in the recorder.
    pub timeouts: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// What kind of output a recording session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Record the whole session to a file.
    #[default]
    Session,
    /// Keep a rolling replay buffer only.
    Buffer,
    /// Record the session and keep a replay buffer alongside it.
    Hybrid,
}

impl RecordingMode {
    /// Whether this mode writes a full-session file.
    pub fn records_session(self) -> bool {
        matches!(self, Self::Session | Self::Hybrid)
    }

    /// Whether this mode runs a replay buffer output.
    pub fn uses_buffer(self) -> bool {
        matches!(self, Self::Buffer | Self::Hybrid)
    }
}

/// Recording parameters consumed read-only by the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Output mode for automatically started sessions.
    pub mode: RecordingMode,

    /// Directory where recordings are written.
    pub output_dir: PathBuf,

    /// Video encoder identifier handed to the capture engine.
    pub encoder: String,

    /// Target frame rate.
    pub fps: u32,

    /// Target video bitrate in kbit/s.
    pub bitrate_kbps: u32,

    /// Fixed output resolution. Zero means "follow the game window".
    pub output_width: u32,
    pub output_height: u32,

    /// Start recording on display capture immediately and swap in the
    /// hooked source once it attaches.
    pub display_fallback: bool,

    /// Allow automatic highlight bookmarks.
    pub auto_highlights: bool,

    /// Default replay buffer length in seconds.
    pub buffer_seconds: u32,

    /// Per-game replay buffer overrides, keyed by game name.
    pub per_game_buffer_seconds: HashMap<String, u32>,
}

impl RecordingDefaults {
    /// Replay buffer length for a game, honoring per-game overrides.
    pub fn buffer_seconds_for(&self, game: &str) -> u32 {
        self.per_game_buffer_seconds
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(game))
            .map(|(_, secs)| *secs)
            .unwrap_or(self.buffer_seconds)
    }

    /// Fixed output resolution, if one is configured.
    pub fn fixed_resolution(&self) -> Option<(u32, u32)> {
        (self.output_width > 0 && self.output_height > 0)
            .then_some((self.output_width, self.output_height))
    }
}

/// Game detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Additional path segments that mark a game library root.
    pub extra_library_markers: Vec<String>,

    /// Directory holding Epic Games launcher `.item` manifests.
    pub epic_manifest_dir: Option<PathBuf>,

    /// Start triggers for the same executable inside this window are dropped.
    pub debounce_ms: u64,

    /// Interval between process table scans.
    pub scan_interval_ms: u64,
}

/// Bounded-wait durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub window_poll_ms: u64,
    pub window_wait_ms: u64,
    pub window_paint_grace_ms: u64,
    pub video_settle_ms: u64,
    pub hook_wait_auto_ms: u64,
    pub hook_wait_manual_ms: u64,
    pub hook_fallback_ms: u64,
    pub hook_key_poll_ms: u64,
    pub hook_key_wait_ms: u64,
    pub stop_wait_ms: u64,
    pub save_wait_ms: u64,
    pub save_path_grace_ms: u64,
}

impl TimeoutConfig {
    pub fn window_poll(&self) -> Duration {
        Duration::from_millis(self.window_poll_ms)
    }

    pub fn window_wait(&self) -> Duration {
        Duration::from_millis(self.window_wait_ms)
    }

    pub fn window_paint_grace(&self) -> Duration {
        Duration::from_millis(self.window_paint_grace_ms)
    }

    pub fn video_settle(&self) -> Duration {
        Duration::from_millis(self.video_settle_ms)
    }

    /// Hook wait when display fallback is disabled.
    pub fn hook_wait(&self, manual: bool) -> Duration {
        if manual {
            Duration::from_millis(self.hook_wait_manual_ms)
        } else {
            Duration::from_millis(self.hook_wait_auto_ms)
        }
    }

    pub fn hook_fallback(&self) -> Duration {
        Duration::from_millis(self.hook_fallback_ms)
    }

    pub fn hook_key_poll(&self) -> Duration {
        Duration::from_millis(self.hook_key_poll_ms)
    }

    pub fn hook_key_wait(&self) -> Duration {
        Duration::from_millis(self.hook_key_wait_ms)
    }

    pub fn stop_wait(&self) -> Duration {
        Duration::from_millis(self.stop_wait_ms)
    }

    pub fn save_wait(&self) -> Duration {
        Duration::from_millis(self.save_wait_ms)
    }

    pub fn save_path_grace(&self) -> Duration {
        Duration::from_millis(self.save_path_grace_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gamecap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            mode: RecordingMode::Session,
            output_dir: default_output_dir(),
            encoder: "x264".to_string(),
            fps: 60,
            bitrate_kbps: 12_000,
            output_width: 0,
            output_height: 0,
            display_fallback: false,
            auto_highlights: false,
            buffer_seconds: 30,
            per_game_buffer_seconds: HashMap::new(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            extra_library_markers: Vec::new(),
            epic_manifest_dir: None,
            debounce_ms: 2_000,
            scan_interval_ms: 1_000,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            window_poll_ms: 100,
            window_wait_ms: 80_000,
            window_paint_grace_ms: 3_000,
            video_settle_ms: 500,
            hook_wait_auto_ms: 20_000,
            hook_wait_manual_ms: 90_000,
            hook_fallback_ms: 90_000,
            hook_key_poll_ms: 500,
            hook_key_wait_ms: 90_000,
            stop_wait_ms: 30_000,
            save_wait_ms: 5_000,
            save_path_grace_ms: 1_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gamecap").join("config.json")
}

/// Default recordings directory.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_VIDEOS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Videos")
        });
    base.join("GameCap")
}
