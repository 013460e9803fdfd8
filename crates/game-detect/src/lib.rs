//! GameCap Game Detection
//!
//! Turns raw process events into recording requests:
//! - [`resolver`]: pid to executable path, privileged strategy first
//! - [`classifier`]: game-library path markers and display names from
//!   launcher manifests
//! - [`monitor`]: event handlers that debounce, correlate stops, and forward
//!   start/stop requests through [`RecordingControl`]

pub mod classifier;
pub mod monitor;
pub mod resolver;

pub use classifier::{Classification, GameClassifier, LibraryMarker, ManifestSource};
pub use monitor::{GameProcessMonitor, RecordingControl, StartRequest};
pub use resolver::ProcessPathResolver;
