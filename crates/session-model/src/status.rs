//! Outbound status notifications.

use serde::{Deserialize, Serialize};

use crate::session::{PreRecordingStatus, RecordingSession};

/// Category of a one-off user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The hook never attached and recording was abandoned.
    GameNotHooked,
    /// The target window never became ready.
    WindowNotFound,
    /// The target process exited during pre-recording.
    ProcessExited,
    /// The engine refused to start an output.
    OutputStartFailed,
    /// The hook attached and replaced display capture.
    HookUpdated,
    ReplaySaved,
    ReplaySaveFailed,
}

/// A push to the UI whenever pre-recording or session state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum StatusUpdate {
    PreRecording(PreRecordingStatus),
    Session(RecordingSession),
    Idle,
    Notice { kind: NoticeKind, message: String },
}

impl StatusUpdate {
    pub fn notice(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self::Notice {
            kind,
            message: message.into(),
        }
    }

    /// The notice kind, if this update is a notice.
    pub fn notice_kind(&self) -> Option<NoticeKind> {
        match self {
            Self::Notice { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_wire_format() {
        let update = StatusUpdate::notice(NoticeKind::GameNotHooked, "Hades did not hook");
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(
            json,
            r#"{"type":"notice","payload":{"kind":"game_not_hooked","message":"Hades did not hook"}}"#
        );
        assert_eq!(update.notice_kind(), Some(NoticeKind::GameNotHooked));
        assert_eq!(StatusUpdate::Idle.notice_kind(), None);
    }

    #[test]
    fn pre_recording_wire_format() {
        let update = StatusUpdate::PreRecording(PreRecordingStatus::new(
            "Waiting for game hook",
            "Hades",
        ));
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.starts_with(r#"{"type":"pre_recording","payload":{"status":"#));
    }
}
