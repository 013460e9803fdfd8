//! Sources owned by a recording attempt.

use std::sync::Arc;

use gamecap_capture_engine::{CaptureEngine, CaptureSource, PrimarySlot, SourceGuard};
use gamecap_common::error::GameCapResult;
use gamecap_session_model::CaptureKind;

use crate::timer::HookTimeoutTimer;

/// A game-capture source created alongside display capture, waiting for
/// the engine to report a hook before it replaces the display source.
struct PendingHook {
    source: SourceGuard,
    attempt: u64,
    _timer: Option<HookTimeoutTimer>,
}

/// Everything a recording attempt holds in the engine. Dropping the set
/// unbinds the slot, releases every source, and cancels the hook timer.
pub struct CaptureSet {
    slot: PrimarySlot,
    pending: Option<PendingHook>,
}

impl CaptureSet {
    pub fn new(engine: Arc<dyn CaptureEngine>) -> Self {
        Self {
            slot: PrimarySlot::new(engine),
            pending: None,
        }
    }

    pub fn bind_display(&mut self, source: SourceGuard) -> GameCapResult<()> {
        self.slot.bind(CaptureSource::Display(source))
    }

    pub fn bind_hooked(&mut self, source: SourceGuard) -> GameCapResult<()> {
        self.slot.bind(CaptureSource::Hooked(source))
    }

    /// Keep an unbound hook attempt until it hooks or its timer expires.
    pub fn park_hook_attempt(
        &mut self,
        source: SourceGuard,
        attempt: u64,
        timer: Option<HookTimeoutTimer>,
    ) {
        self.pending = Some(PendingHook {
            source,
            attempt,
            _timer: timer,
        });
    }

    /// Swap the pending hook attempt into the slot, releasing the display
    /// source. `Ok(false)` when nothing was pending.
    pub fn promote_pending(&mut self) -> GameCapResult<bool> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        let PendingHook {
            source,
            attempt,
            _timer,
        } = pending;
        tracing::debug!(attempt, "Promoting hooked source into primary slot");
        self.bind_hooked(source)?;
        Ok(true)
    }

    /// Release the pending attempt if it is still `attempt`.
    pub fn drop_pending(&mut self, attempt: u64) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.attempt == attempt) {
            self.pending = None;
            return true;
        }
        false
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_attempt(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.attempt)
    }

    /// What is bound to the primary slot.
    pub fn kind(&self) -> Option<CaptureKind> {
        self.slot.kind()
    }
}

impl std::fmt::Debug for CaptureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSet")
            .field("slot", &self.slot)
            .field("pending", &self.pending_attempt())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecap_capture_engine::testing::ScriptedEngine;
    use gamecap_capture_engine::{SourceKind, SourceSettings};

    fn setup() -> (Arc<ScriptedEngine>, Arc<dyn CaptureEngine>) {
        let scripted = Arc::new(ScriptedEngine::new());
        let engine: Arc<dyn CaptureEngine> = scripted.clone();
        (scripted, engine)
    }

    fn source(engine: &Arc<dyn CaptureEngine>, kind: SourceKind) -> SourceGuard {
        SourceGuard::create(engine, kind, &SourceSettings::default()).unwrap()
    }

    #[test]
    fn promotion_replaces_display_with_hooked() {
        let (scripted, engine) = setup();
        let mut set = CaptureSet::new(Arc::clone(&engine));
        set.bind_display(source(&engine, SourceKind::DisplayCapture))
            .unwrap();
        set.park_hook_attempt(source(&engine, SourceKind::GameCapture), 1, None);
        assert_eq!(scripted.live_sources().len(), 2);
        assert_eq!(scripted.bound_kind(), Some(SourceKind::DisplayCapture));

        assert!(set.promote_pending().unwrap());
        assert_eq!(set.kind(), Some(CaptureKind::Hooked));
        assert_eq!(scripted.live_count(SourceKind::DisplayCapture), 0);
        assert!(!set.promote_pending().unwrap());
    }

    #[test]
    fn stale_attempt_is_not_dropped() {
        let (scripted, engine) = setup();
        let mut set = CaptureSet::new(Arc::clone(&engine));
        set.park_hook_attempt(source(&engine, SourceKind::GameCapture), 4, None);
        assert!(!set.drop_pending(3));
        assert_eq!(scripted.live_count(SourceKind::GameCapture), 1);
        assert!(set.drop_pending(4));
        assert_eq!(scripted.live_count(SourceKind::GameCapture), 0);
    }

    #[test]
    fn dropping_the_set_releases_everything() {
        let (scripted, engine) = setup();
        let mut set = CaptureSet::new(Arc::clone(&engine));
        set.bind_display(source(&engine, SourceKind::DisplayCapture))
            .unwrap();
        set.park_hook_attempt(source(&engine, SourceKind::GameCapture), 1, None);
        drop(set);
        assert!(scripted.live_sources().is_empty());
        assert_eq!(scripted.bound_kind(), None);
    }
}
