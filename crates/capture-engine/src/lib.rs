//! GameCap Capture Engine
//!
//! The contract between the recorder and the native capture/encode engine,
//! plus the pieces that make driving it safe:
//!
//! - [`engine`]: the [`CaptureEngine`] trait and its asynchronous [`EngineSignal`]s
//! - [`source`]: owned capture sources and the single primary video slot
//! - [`signals`]: condition-variable latches the recorder waits on
//! - [`gst`]: a GStreamer display-capture engine for Linux
//!
//! ```text
//!  recorder ──calls──▶ CaptureEngine ──signals (engine thread)──▶ SignalBoard
//!      ▲                                                             │
//!      └──────────────────── bounded condvar waits ◀─────────────────┘
//! ```

pub mod engine;
pub mod gst;
pub mod pipeline;
pub mod signals;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::*;
pub use gst::GstCaptureEngine;
pub use signals::SignalBoard;
pub use source::{CaptureSource, PrimarySlot, SourceGuard};
