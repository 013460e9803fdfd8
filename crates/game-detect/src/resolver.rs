//! Executable path resolution.

use std::path::PathBuf;

use gamecap_common::error::{GameCapError, GameCapResult};
use gamecap_platform_core::PathQuery;

/// Resolves a pid to its executable, trying the privileged query first.
pub struct ProcessPathResolver {
    privileged: Box<dyn PathQuery>,
    unprivileged: Box<dyn PathQuery>,
}

impl ProcessPathResolver {
    pub fn new(privileged: Box<dyn PathQuery>, unprivileged: Box<dyn PathQuery>) -> Self {
        Self {
            privileged,
            unprivileged,
        }
    }

    pub fn resolve(&self, pid: u32) -> GameCapResult<PathBuf> {
        match self.privileged.query(pid) {
            Ok(path) => return Ok(path),
            Err(e) => tracing::debug!(
                pid,
                strategy = self.privileged.name(),
                error = %e,
                "Privileged path query failed; falling back"
            ),
        }

        self.unprivileged.query(pid).map_err(|e| {
            GameCapError::process_resolution(
                pid,
                format!("{} and {} both failed: {e}", self.privileged.name(), self.unprivileged.name()),
            )
        })
    }
}

impl std::fmt::Debug for ProcessPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPathResolver")
            .field("privileged", &self.privileged.name())
            .field("unprivileged", &self.unprivileged.name())
            .finish()
    }
}
