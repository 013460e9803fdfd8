//! Cancellable hook timeout.

use std::sync::Arc;
use std::time::Duration;

use gamecap_common::clock::Deadline;
use gamecap_common::error::GameCapResult;
use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct CancelFlag {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Fires once after its budget unless dropped first.
///
/// The timer belongs to the hook attempt it guards, so whatever drops the
/// attempt (a successful hook, a stop, an abort) cancels it too.
pub struct HookTimeoutTimer {
    attempt: u64,
    flag: Arc<CancelFlag>,
}

impl HookTimeoutTimer {
    /// Start the countdown. `on_expire` runs on the timer thread with the
    /// attempt id.
    pub fn arm(
        attempt: u64,
        budget: Duration,
        on_expire: impl FnOnce(u64) + Send + 'static,
    ) -> GameCapResult<Self> {
        let flag = Arc::new(CancelFlag::default());
        let remote = Arc::clone(&flag);
        std::thread::Builder::new()
            .name("gamecap-hook-timer".to_string())
            .spawn(move || {
                let deadline = Deadline::after(budget);
                let mut cancelled = remote.cancelled.lock();
                while !*cancelled && !deadline.expired() {
                    remote.cond.wait_for(&mut cancelled, deadline.remaining());
                }
                if *cancelled {
                    return;
                }
                drop(cancelled);
                tracing::debug!(attempt, budget_ms = budget.as_millis() as u64, "Hook timer expired");
                on_expire(attempt);
            })?;
        Ok(Self { attempt, flag })
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

impl Drop for HookTimeoutTimer {
    fn drop(&mut self) {
        *self.flag.cancelled.lock() = true;
        self.flag.cond.notify_all();
    }
}

impl std::fmt::Debug for HookTimeoutTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookTimeoutTimer")
            .field("attempt", &self.attempt)
            .finish()
    }
}
