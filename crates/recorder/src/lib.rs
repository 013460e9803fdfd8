//! GameCap Recorder
//!
//! Drives a recording from "game detected" to "file cataloged":
//!
//! - [`orchestrator`]: the session state machine and its [`RecordingControl`]
//!   surface for the process monitor
//! - [`strategy`]: hooked-window versus display capture
//! - [`capture`]: the sources one attempt owns, released on drop
//! - [`timer`]: the cancellable display-fallback hook timer
//! - [`replay`]: replay buffer saves
//! - [`content`] / [`notify`]: the content catalog and status collaborators
//!
//! [`RecordingControl`]: gamecap_game_detect::RecordingControl

pub mod capture;
pub mod content;
pub mod notify;
pub mod orchestrator;
pub mod output;
pub mod replay;
pub mod strategy;
pub mod timer;

pub use content::{ContentSink, FsContentSink};
pub use notify::{BroadcastStatusSink, StatusSink};
pub use orchestrator::RecordingSessionOrchestrator;
pub use replay::ReplayBufferController;
pub use strategy::{CaptureStrategy, CaptureStrategySelector};
pub use timer::HookTimeoutTimer;
