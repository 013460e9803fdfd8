//! GameCap Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **procfs:** Executable path resolution and process liveness
//! - **Process Events:** Start/stop notifications from process table scans
//! - **Display Detection:** Monitor enumeration via xrandr
//! - **Permissions:** Capability detection and user guidance

pub mod display;
pub mod events;
pub mod permissions;
pub mod procfs;

pub use display::*;
pub use events::ProcScanner;
pub use procfs::{ProcCmdlineQuery, ProcExeQuery, ProcInspector};
