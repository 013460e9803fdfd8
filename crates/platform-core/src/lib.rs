//! GameCap platform core contracts.
//!
//! This crate contains the OS-facing data structures and traits used by the
//! detection and recording crates without coupling them to a concrete OS
//! backend: display geometry, window probing, executable path queries, and
//! the process event stream.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use gamecap_common::error::GameCapResult;
use serde::{Deserialize, Serialize};

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Refresh rate in Hz.
    pub refresh_rate_hz: u32,
    /// Whether this monitor is primary.
    pub primary: bool,
}

impl MonitorInfo {
    pub fn size(&self) -> ClientSize {
        ClientSize::new(self.width, self.height)
    }
}

/// Display server / platform family used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    Windows,
    #[default]
    Unknown,
}

/// Opaque native window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

/// Client-area size of a window in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClientSize {
    pub width: u32,
    pub height: u32,
}

impl ClientSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A window that exists but has not painted yet reports a zero area.
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ClientSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A top-level window belonging to a target process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: Option<String>,
    pub class: Option<String>,
    pub client: ClientSize,
}

/// Outcome of asking the platform for a process's main window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowProbe {
    /// The process has no main window yet.
    NotReady,
    /// The main window exists.
    Ready(WindowInfo),
    /// This platform cannot enumerate windows for the process.
    Unsupported,
}

/// Read-only view of processes, windows, and displays.
pub trait ProcessInspector: Send + Sync {
    /// Whether the process is still alive.
    fn is_running(&self, pid: u32) -> bool;

    /// Probe the main window of a process.
    fn main_window(&self, pid: u32) -> WindowProbe;

    /// Re-read a window's title and class.
    fn window_details(&self, window: WindowHandle) -> Option<WindowInfo>;

    /// The process that owns a window.
    fn window_process(&self, window: WindowHandle) -> Option<u32>;

    /// Geometry of the primary display.
    fn primary_display(&self) -> Option<MonitorInfo>;

    /// Find a running process by its executable path.
    fn find_process(&self, executable: &Path) -> Option<u32>;
}

/// A strategy for turning a pid into an absolute executable path.
pub trait PathQuery: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Resolve the executable path of `pid`.
    fn query(&self, pid: u32) -> GameCapResult<PathBuf>;
}

/// A process or focus change observed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started { pid: u32 },
    Stopped { pid: u32, name: Option<String> },
    ForegroundChanged { window: WindowHandle },
}

/// Receiver of process events. Implementations must return quickly.
pub trait ProcessEventSink: Send + Sync {
    fn on_event(&self, event: ProcessEvent);
}

/// A platform subscription delivering [`ProcessEvent`]s until stopped.
#[async_trait::async_trait]
pub trait ProcessEventSource: Send {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Deliver events to `sink` until `stop` is set.
    async fn run(
        &mut self,
        sink: Arc<dyn ProcessEventSink>,
        stop: Arc<AtomicBool>,
    ) -> GameCapResult<()>;
}

/// The file name of an executable path, e.g. `game.exe`.
///
/// Both `/` and `\` count as separators so Windows paths reported through
/// compatibility layers resolve the same way.
pub fn executable_name(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    raw.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_client_is_detected() {
        assert!(ClientSize::new(0, 1080).is_zero());
        assert!(ClientSize::new(1920, 0).is_zero());
        assert!(!ClientSize::new(1280, 720).is_zero());
        assert_eq!(ClientSize::new(1280, 720).to_string(), "1280x720");
    }

    #[test]
    fn executable_name_takes_file_component() {
        let path = Path::new("/games/steamapps/common/Hades/Hades.exe");
        assert_eq!(executable_name(path).as_deref(), Some("Hades.exe"));

        let windows = Path::new(r"C:\Games\Epic Games\Fortnite\FortniteClient.exe");
        assert_eq!(
            executable_name(windows).as_deref(),
            Some("FortniteClient.exe")
        );
        assert_eq!(executable_name(Path::new("/games/")), None);
    }
}
