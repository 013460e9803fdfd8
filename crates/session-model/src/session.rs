//! Recording session and orchestrator state types.
//!
//! A session exists from the first confirmed `Recording` transition until
//! its output has been handed to the content catalog. Before that, the only
//! record of a pending start is a [`PreRecordingStatus`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use gamecap_common::config::RecordingMode;

/// Phase of a pending start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreRecordingPhase {
    /// Waiting for the target process to show a painted main window.
    WaitingForWindow,
    /// Capture source created; waiting for the engine to attach the hook.
    WaitingForHook,
}

/// State of the recording orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "phase")]
pub enum OrchestratorState {
    #[default]
    Idle,
    PreRecording(PreRecordingPhase),
    Recording,
    Stopping,
}

impl OrchestratorState {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    pub fn is_pre_recording(self) -> bool {
        matches!(self, Self::PreRecording(_))
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::PreRecording(PreRecordingPhase::WaitingForWindow) => {
                f.write_str("pre-recording (waiting for window)")
            }
            Self::PreRecording(PreRecordingPhase::WaitingForHook) => {
                f.write_str("pre-recording (waiting for hook)")
            }
            Self::Recording => f.write_str("recording"),
            Self::Stopping => f.write_str("stopping"),
        }
    }
}

/// Transitional status shown between a start request and `Recording`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreRecordingStatus {
    /// Human-readable status, e.g. "Waiting for game hook".
    pub status: String,
    /// Game the request targets.
    pub game_name: String,
}

impl PreRecordingStatus {
    pub fn new(status: impl Into<String>, game_name: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            game_name: game_name.into(),
        }
    }
}

/// Lifecycle of a session once recording has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Recording,
    Stopping,
    Finished,
}

/// Which capture technique currently feeds the primary video slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Hooked,
    Display,
}

/// A moment of interest marked during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Offset from session start in seconds.
    pub offset_secs: f64,
    /// Wall-clock time the bookmark was taken.
    pub created_at: DateTime<Utc>,
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Whether an automatic highlight trigger created it.
    #[serde(default)]
    pub auto: bool,
}

/// An active or finishing recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSession {
    /// Orchestrator-assigned id, unique within a process lifetime.
    pub id: u64,
    pub mode: RecordingMode,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Full-session output file; `None` for buffer-only sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub game_name: String,
    /// Executable name, updated from the hook report when it differs.
    pub executable: String,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    /// Whether the hooked source is attached right now.
    pub hooked: bool,
    pub capture: CaptureKind,
    /// Executable whose icon represents this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

impl RecordingSession {
    /// Session length so far, or total length once ended.
    pub fn duration_secs(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RecordingSession {
        RecordingSession {
            id: 1,
            mode: RecordingMode::Session,
            state: SessionState::Recording,
            started_at: Utc::now(),
            ended_at: None,
            output_path: Some(PathBuf::from("/videos/Hades/Hades.mkv")),
            game_name: "Hades".to_string(),
            executable: "Hades.exe".to_string(),
            bookmarks: Vec::new(),
            hooked: true,
            capture: CaptureKind::Hooked,
            icon: None,
        }
    }

    #[test]
    fn state_serializes_with_phase() {
        let state = OrchestratorState::PreRecording(PreRecordingPhase::WaitingForHook);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"pre_recording","phase":"waiting_for_hook"}"#);
        assert_eq!(
            serde_json::to_string(&OrchestratorState::Idle).unwrap(),
            r#"{"state":"idle"}"#
        );
    }

    #[test]
    fn session_snapshot_omits_empty_optionals() {
        let json = serde_json::to_string(&session()).unwrap();
        assert!(!json.contains("ended_at"));
        assert!(!json.contains("icon"));
        assert!(json.contains("\"capture\":\"hooked\""));
    }

    #[test]
    fn finished_session_duration_uses_end_time() {
        let mut s = session();
        s.ended_at = Some(s.started_at + chrono::Duration::milliseconds(2500));
        assert!((s.duration_secs() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn state_predicates() {
        assert!(OrchestratorState::Idle.is_idle());
        assert!(OrchestratorState::PreRecording(PreRecordingPhase::WaitingForWindow)
            .is_pre_recording());
        assert!(!OrchestratorState::Recording.is_pre_recording());
    }
}
