//! Engine signal latches.
//!
//! The engine reports completion on its own thread. [`SignalBoard`] records
//! each signal under a mutex and wakes any waiter through a condition
//! variable, so a bounded wait returns as soon as the signal lands instead
//! of on the next poll tick.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use gamecap_common::clock::Deadline;
use parking_lot::{Condvar, Mutex};

use crate::engine::{EngineSignal, HookInfo, OutputKind};

#[derive(Debug, Default)]
struct Latches {
    hooked: Option<HookInfo>,
    stopped: HashSet<OutputKind>,
    saved: bool,
    saved_path: Option<PathBuf>,
}

/// Shared latch board between the engine callback and blocking waiters.
#[derive(Debug, Default)]
pub struct SignalBoard {
    latches: Mutex<Latches>,
    cond: Condvar,
}

impl SignalBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a signal and wake all waiters.
    pub fn record(&self, signal: &EngineSignal) {
        let mut latches = self.latches.lock();
        match signal {
            EngineSignal::Hooked(info) => latches.hooked = Some(info.clone()),
            EngineSignal::Unhooked => latches.hooked = None,
            EngineSignal::Stopped { output } => {
                latches.stopped.insert(*output);
            }
            EngineSignal::Saved { path } => {
                latches.saved = true;
                if path.is_some() {
                    latches.saved_path = path.clone();
                }
            }
        }
        drop(latches);
        self.cond.notify_all();
    }

    /// Forget any hook report from a previous attempt.
    pub fn reset_hook(&self) {
        self.latches.lock().hooked = None;
    }

    /// Forget a previous stop confirmation for `output`.
    pub fn reset_stopped(&self, output: OutputKind) {
        self.latches.lock().stopped.remove(&output);
    }

    /// Forget a previous save confirmation.
    pub fn reset_saved(&self) {
        let mut latches = self.latches.lock();
        latches.saved = false;
        latches.saved_path = None;
    }

    /// The currently latched hook report.
    pub fn hooked(&self) -> Option<HookInfo> {
        self.latches.lock().hooked.clone()
    }

    /// Wait for the hook to attach.
    pub fn wait_hooked(&self, timeout: Duration) -> Option<HookInfo> {
        self.wait_until(timeout, |l| l.hooked.clone())
    }

    /// Wait for `output` to confirm it stopped.
    pub fn wait_stopped(&self, output: OutputKind, timeout: Duration) -> bool {
        self.wait_until(timeout, |l| l.stopped.contains(&output).then_some(()))
            .is_some()
    }

    /// Wait for a save confirmation. Returns the path known at that moment.
    pub fn wait_saved(&self, timeout: Duration) -> Option<Option<PathBuf>> {
        self.wait_until(timeout, |l| l.saved.then(|| l.saved_path.clone()))
    }

    /// Wait for a save path to be reported.
    pub fn wait_saved_path(&self, timeout: Duration) -> Option<PathBuf> {
        self.wait_until(timeout, |l| l.saved_path.clone())
    }

    fn wait_until<T>(
        &self,
        timeout: Duration,
        mut ready: impl FnMut(&Latches) -> Option<T>,
    ) -> Option<T> {
        let deadline = Deadline::after(timeout);
        let mut latches = self.latches.lock();
        loop {
            if let Some(value) = ready(&latches) {
                return Some(value);
            }
            if deadline.expired() {
                return None;
            }
            // Spurious wakeups and unrelated signals loop back to the check.
            self.cond.wait_for(&mut latches, deadline.remaining());
        }
    }
}
