//! Owned capture sources.
//!
//! Every engine source handle is wrapped in a [`SourceGuard`] that releases
//! it on drop, so an abandoned start attempt cannot leak a handle no matter
//! which path it leaves by. The primary video slot holds exactly one
//! [`CaptureSource`] at a time, which makes "hooked and display bound
//! together" unrepresentable.

use std::sync::Arc;

use gamecap_common::error::GameCapResult;
use gamecap_session_model::CaptureKind;

use crate::engine::{CaptureEngine, SourceHandle, SourceKind, SourceSettings, Slot};

/// A live engine source, released when dropped.
pub struct SourceGuard {
    engine: Arc<dyn CaptureEngine>,
    handle: SourceHandle,
    kind: SourceKind,
}

impl SourceGuard {
    /// Create a source through the engine.
    pub fn create(
        engine: &Arc<dyn CaptureEngine>,
        kind: SourceKind,
        settings: &SourceSettings,
    ) -> GameCapResult<Self> {
        let handle = engine.create_source(kind, settings)?;
        tracing::debug!(?kind, handle = handle.0, "Capture source created");
        Ok(Self {
            engine: Arc::clone(engine),
            handle,
            kind,
        })
    }

    pub fn handle(&self) -> SourceHandle {
        self.handle
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        tracing::debug!(kind = ?self.kind, handle = self.handle.0, "Releasing capture source");
        self.engine.release_source(self.handle);
    }
}

impl std::fmt::Debug for SourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceGuard")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

/// What feeds the primary video slot.
#[derive(Debug, Default)]
pub enum CaptureSource {
    Hooked(SourceGuard),
    Display(SourceGuard),
    #[default]
    None,
}

impl CaptureSource {
    pub fn handle(&self) -> Option<SourceHandle> {
        match self {
            Self::Hooked(guard) | Self::Display(guard) => Some(guard.handle()),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> Option<CaptureKind> {
        match self {
            Self::Hooked(_) => Some(CaptureKind::Hooked),
            Self::Display(_) => Some(CaptureKind::Display),
            Self::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// The primary video slot and the single source bound to it.
pub struct PrimarySlot {
    engine: Arc<dyn CaptureEngine>,
    slot: Slot,
    bound: CaptureSource,
}

impl PrimarySlot {
    pub fn new(engine: Arc<dyn CaptureEngine>) -> Self {
        Self {
            engine,
            slot: Slot::PRIMARY_VIDEO,
            bound: CaptureSource::None,
        }
    }

    /// Bind `source`, then release whatever was bound before.
    ///
    /// On failure the new source is released and the old binding stays.
    pub fn bind(&mut self, source: CaptureSource) -> GameCapResult<()> {
        self.engine.bind_source(self.slot, source.handle())?;
        let previous = std::mem::replace(&mut self.bound, source);
        tracing::debug!(
            previous = ?previous.kind(),
            current = ?self.bound.kind(),
            "Primary video slot rebound"
        );
        drop(previous);
        Ok(())
    }

    /// Unbind and release the current source. Idempotent.
    pub fn clear(&mut self) {
        if self.bound.is_none() {
            return;
        }
        if let Err(e) = self.engine.bind_source(self.slot, None) {
            tracing::warn!(error = %e, "Failed to unbind primary video slot");
        }
        self.bound = CaptureSource::None;
    }

    pub fn kind(&self) -> Option<CaptureKind> {
        self.bound.kind()
    }

    pub fn handle(&self) -> Option<SourceHandle> {
        self.bound.handle()
    }
}

impl Drop for PrimarySlot {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PrimarySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimarySlot")
            .field("slot", &self.slot)
            .field("bound", &self.bound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;

    fn engine() -> (Arc<ScriptedEngine>, Arc<dyn CaptureEngine>) {
        let scripted = Arc::new(ScriptedEngine::new());
        let engine: Arc<dyn CaptureEngine> = scripted.clone();
        (scripted, engine)
    }

    fn display(engine: &Arc<dyn CaptureEngine>) -> SourceGuard {
        SourceGuard::create(engine, SourceKind::DisplayCapture, &SourceSettings::display(None))
            .unwrap()
    }

    fn game(engine: &Arc<dyn CaptureEngine>) -> SourceGuard {
        SourceGuard::create(engine, SourceKind::GameCapture, &SourceSettings::default()).unwrap()
    }

    #[test]
    fn guard_releases_on_drop() {
        let (scripted, engine) = engine();
        let guard = display(&engine);
        assert_eq!(scripted.live_sources().len(), 1);
        drop(guard);
        assert!(scripted.live_sources().is_empty());
    }

    #[test]
    fn rebinding_releases_previous_source() {
        let (scripted, engine) = engine();
        let mut slot = PrimarySlot::new(Arc::clone(&engine));

        slot.bind(CaptureSource::Display(display(&engine))).unwrap();
        assert_eq!(slot.kind(), Some(CaptureKind::Display));

        slot.bind(CaptureSource::Hooked(game(&engine))).unwrap();
        assert_eq!(slot.kind(), Some(CaptureKind::Hooked));
        assert_eq!(scripted.live_count(SourceKind::DisplayCapture), 0);
        assert_eq!(scripted.bound_kind(), Some(SourceKind::GameCapture));
    }

    #[test]
    fn failed_bind_keeps_old_source_and_drops_new() {
        let (scripted, engine) = engine();
        let mut slot = PrimarySlot::new(Arc::clone(&engine));
        slot.bind(CaptureSource::Display(display(&engine))).unwrap();

        let orphan = game(&engine);
        let handle = orphan.handle();
        engine.release_source(handle);
        // The engine no longer knows the handle, so binding fails.
        std::mem::forget(orphan);
        let stale = SourceGuard {
            engine: Arc::clone(&engine),
            handle,
            kind: SourceKind::GameCapture,
        };
        assert!(slot.bind(CaptureSource::Hooked(stale)).is_err());
        assert_eq!(slot.kind(), Some(CaptureKind::Display));
        assert_eq!(scripted.bound_kind(), Some(SourceKind::DisplayCapture));
    }

    #[test]
    fn clear_is_idempotent_and_drop_clears() {
        let (scripted, engine) = engine();
        let mut slot = PrimarySlot::new(Arc::clone(&engine));
        slot.bind(CaptureSource::Display(display(&engine))).unwrap();
        slot.clear();
        slot.clear();
        assert!(slot.kind().is_none());
        assert!(scripted.live_sources().is_empty());

        slot.bind(CaptureSource::Hooked(game(&engine))).unwrap();
        drop(slot);
        assert!(scripted.live_sources().is_empty());
        assert_eq!(scripted.bound_kind(), None);
    }
}
