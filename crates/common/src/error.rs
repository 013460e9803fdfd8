//! Error types shared across GameCap crates.

use std::path::PathBuf;

/// Top-level error type for GameCap operations.
#[derive(Debug, thiserror::Error)]
pub enum GameCapError {
    #[error("Could not resolve executable path for pid {pid}: {message}")]
    ProcessResolution { pid: u32, message: String },

    #[error("Window for {game} did not become ready in time")]
    WindowNotReady { game: String },

    #[error("Target process for {game} exited before recording started")]
    ProcessExited { game: String },

    #[error("{game} did not hook within {waited_secs}s")]
    HookTimeout { game: String, waited_secs: u64 },

    #[error("Output failed to start: {message}")]
    OutputStart { message: String },

    #[error("Output did not confirm stop in time")]
    StopConfirmationTimeout,

    #[error("Replay buffer did not confirm save in time")]
    SaveBufferTimeout,

    #[error("Recorder is busy ({state})")]
    Busy { state: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GameCapError.
pub type GameCapResult<T> = Result<T, GameCapError>;

impl GameCapError {
    pub fn process_resolution(pid: u32, msg: impl Into<String>) -> Self {
        Self::ProcessResolution {
            pid,
            message: msg.into(),
        }
    }

    pub fn output_start(msg: impl Into<String>) -> Self {
        Self::OutputStart {
            message: msg.into(),
        }
    }

    pub fn busy(state: impl Into<String>) -> Self {
        Self::Busy {
            state: state.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error ended a pre-recording attempt because of a bounded wait.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::WindowNotReady { .. }
                | Self::HookTimeout { .. }
                | Self::StopConfirmationTimeout
                | Self::SaveBufferTimeout
        )
    }
}
