//! GameCap Common Utilities
//!
//! Shared infrastructure for all GameCap crates:
//! - Error types and result aliases
//! - Clock and bounded-wait utilities
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
