//! The capture engine contract.
//!
//! A capture engine owns sources, encoders, and outputs. Completion is not
//! returned from calls: the engine reports `hooked`, `unhooked`, `stopped`,
//! and `saved` through an [`EngineSignal`] listener invoked on its own thread.

use std::path::PathBuf;
use std::sync::Arc;

use gamecap_common::error::GameCapResult;
use gamecap_platform_core::{ClientSize, MonitorInfo};
use serde::{Deserialize, Serialize};

/// Engine-assigned source identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceHandle(pub u64);

/// Technique a source uses to capture video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Attach to a target process's render pipeline.
    GameCapture,
    /// Capture a whole display.
    DisplayCapture,
}

/// Window identity a game-capture source hooks into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookKey {
    pub title: String,
    pub class: String,
    pub executable: String,
}

impl HookKey {
    /// `title:class:executable` with `:` and `#` escaped, the window spec
    /// format game-capture engines match against.
    pub fn window_spec(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('#', "#22").replace(':', "#3A")
        }
        format!(
            "{}:{}:{}",
            escape(&self.title),
            escape(&self.class),
            escape(&self.executable)
        )
    }
}

/// Creation settings for a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Window to hook; required for [`SourceKind::GameCapture`].
    pub hook_key: Option<HookKey>,
    /// Display to capture; `None` means the primary display.
    pub monitor: Option<MonitorInfo>,
    pub capture_cursor: bool,
}

impl SourceSettings {
    pub fn game(hook_key: HookKey) -> Self {
        Self {
            hook_key: Some(hook_key),
            ..Self::default()
        }
    }

    pub fn display(monitor: Option<MonitorInfo>) -> Self {
        Self {
            monitor,
            ..Self::default()
        }
    }
}

/// An engine output channel a source can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot(pub u32);

impl Slot {
    /// The channel every output encodes video from.
    pub const PRIMARY_VIDEO: Slot = Slot(0);
}

/// An engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Full-session file recording.
    Recording,
    /// Rolling replay buffer.
    ReplayBuffer,
}

/// Canvas and output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoGeometry {
    pub base: ClientSize,
    pub output: ClientSize,
    pub fps: u32,
}

/// Settings for starting an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// File the recording output writes.
    pub path: Option<PathBuf>,
    /// Directory replay buffer saves land in.
    pub directory: PathBuf,
    pub encoder: String,
    pub bitrate_kbps: u32,
    /// Replay buffer length.
    pub buffer_seconds: u32,
}

/// What the engine reported when a hook attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookInfo {
    pub title: String,
    pub class: String,
    pub executable: String,
}

/// Asynchronous engine notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
    Hooked(HookInfo),
    Unhooked,
    Stopped { output: OutputKind },
    /// A replay buffer save finished. The path may be reported later.
    Saved { path: Option<PathBuf> },
}

/// Callback the engine invokes on its own thread.
pub type SignalListener = Arc<dyn Fn(EngineSignal) + Send + Sync>;

/// Interface to the native capture/encode engine.
pub trait CaptureEngine: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Install the single signal listener, replacing any previous one.
    fn set_signal_listener(&self, listener: SignalListener);

    /// Reconfigure canvas and output geometry.
    fn reset_video(&self, geometry: &VideoGeometry) -> GameCapResult<()>;

    fn create_source(
        &self,
        kind: SourceKind,
        settings: &SourceSettings,
    ) -> GameCapResult<SourceHandle>;

    /// Bind `source` to `slot`, replacing whatever was bound. `None` clears it.
    fn bind_source(&self, slot: Slot, source: Option<SourceHandle>) -> GameCapResult<()>;

    /// Destroy a source. Unknown handles are ignored.
    fn release_source(&self, source: SourceHandle);

    /// Start an output. `Ok(false)` means the engine declined.
    fn start_output(&self, output: OutputKind, settings: &OutputSettings) -> GameCapResult<bool>;

    /// Request a graceful stop; completion arrives as `Stopped`, never on
    /// the calling thread.
    fn stop_output(&self, output: OutputKind);

    /// Stop immediately without waiting for encoders to drain.
    fn force_stop_output(&self, output: OutputKind);

    fn output_active(&self, output: OutputKind) -> bool;

    /// Tear down all outputs and encoders. Safe to call repeatedly.
    fn release_outputs(&self);

    /// Ask the replay buffer to flush to disk; completion arrives as `Saved`.
    fn save_replay_buffer(&self) -> GameCapResult<()>;

    /// Path of the most recent replay buffer save.
    fn last_replay_path(&self) -> Option<PathBuf>;
}
