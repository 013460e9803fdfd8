//! GameCap Session Model
//!
//! Defines the core data contracts shared by the recorder and its callers:
//! - **Session:** Orchestrator states, pre-recording status, recording sessions, bookmarks
//! - **Status:** Outbound notifications pushed on every state change
//! - **Content:** Metadata sidecars and the content library index
//!
//! Everything here is plain serde data; behavior lives in the recorder.

pub mod content;
pub mod session;
pub mod status;

pub use content::*;
pub use session::*;
pub use status::*;
