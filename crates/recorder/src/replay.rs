//! Replay buffer save protocol.

use std::sync::Arc;

use gamecap_capture_engine::{CaptureEngine, OutputKind, SignalBoard};
use gamecap_common::config::TimeoutConfig;
use gamecap_common::error::GameCapError;
use gamecap_session_model::{ContentKind, NoticeKind, StatusUpdate};
use parking_lot::Mutex;

use crate::content::{catalog, ContentSink};
use crate::notify::StatusSink;

pub struct ReplayBufferController {
    engine: Arc<dyn CaptureEngine>,
    signals: Arc<SignalBoard>,
    content: Arc<dyn ContentSink>,
    status: Arc<dyn StatusSink>,
    timeouts: TimeoutConfig,
    saving: Mutex<()>,
}

impl ReplayBufferController {
    pub fn new(
        engine: Arc<dyn CaptureEngine>,
        signals: Arc<SignalBoard>,
        content: Arc<dyn ContentSink>,
        status: Arc<dyn StatusSink>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            engine,
            signals,
            content,
            status,
            timeouts,
            saving: Mutex::new(()),
        }
    }

    /// Flush the replay buffer to disk and catalog the file.
    ///
    /// Returns `false` when no buffer is active or the engine does not
    /// confirm in time; there is no automatic retry.
    pub fn save(&self, game: &str) -> bool {
        if !self.engine.output_active(OutputKind::ReplayBuffer) {
            tracing::debug!(game, "Replay save requested without an active buffer");
            return false;
        }
        let _saving = self.saving.lock();

        self.signals.reset_saved();
        if let Err(e) = self.engine.save_replay_buffer() {
            tracing::warn!(game, error = %e, "Replay buffer save was rejected");
            self.fail(game);
            return false;
        }

        let Some(reported) = self.signals.wait_saved(self.timeouts.save_wait()) else {
            tracing::warn!(game, error = %GameCapError::SaveBufferTimeout, "Replay save not confirmed");
            self.fail(game);
            return false;
        };

        // The path can trail the saved signal; give it one grace period.
        let path = reported
            .or_else(|| self.signals.wait_saved_path(self.timeouts.save_path_grace()))
            .or_else(|| self.engine.last_replay_path());
        let Some(path) = path else {
            tracing::warn!(game, "Replay saved but no file path was reported");
            self.fail(game);
            return false;
        };

        tracing::info!(game, path = %path.display(), "Replay buffer saved");
        catalog(
            self.content.as_ref(),
            &path,
            ContentKind::Buffer,
            game,
            None,
            None,
        );
        self.status.push(StatusUpdate::notice(
            NoticeKind::ReplaySaved,
            format!("Saved replay to {}", path.display()),
        ));
        true
    }

    fn fail(&self, game: &str) {
        self.status.push(StatusUpdate::notice(
            NoticeKind::ReplaySaveFailed,
            format!("Replay buffer for {game} could not be saved"),
        ));
    }
}
