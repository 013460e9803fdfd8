//! Process start/stop events from periodic procfs scans.
//!
//! Linux has no unprivileged push notification for process creation, so the
//! scanner diffs successive process tables. Processes that already exist when
//! the scanner starts are treated as baseline and produce no `Started` event.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gamecap_common::error::GameCapResult;
use gamecap_platform_core::{ProcessEvent, ProcessEventSink, ProcessEventSource};

use crate::procfs::{list_processes, PROC_ROOT};

/// pid → process name.
pub type ProcSnapshot = BTreeMap<u32, String>;

/// Polling [`ProcessEventSource`] over procfs.
pub struct ProcScanner {
    root: PathBuf,
    interval: Duration,
}

impl ProcScanner {
    pub fn new(interval: Duration) -> Self {
        Self::with_root(PROC_ROOT, interval)
    }

    pub fn with_root(root: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            root: root.into(),
            interval,
        }
    }

    fn snapshot(&self) -> GameCapResult<ProcSnapshot> {
        Ok(list_processes(&self.root)?
            .into_iter()
            .map(|e| (e.pid, e.name))
            .collect())
    }
}

#[async_trait::async_trait]
impl ProcessEventSource for ProcScanner {
    fn name(&self) -> &str {
        "procfs-scan"
    }

    async fn run(
        &mut self,
        sink: Arc<dyn ProcessEventSink>,
        stop: Arc<AtomicBool>,
    ) -> GameCapResult<()> {
        let mut previous = self.snapshot()?;
        tracing::info!(
            baseline = previous.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Process scanner started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while !stop.load(Ordering::SeqCst) {
            ticker.tick().await;
            if stop.load(Ordering::SeqCst) {
                break;
            }

            let current = match self.snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "Process scan failed; retrying next tick");
                    continue;
                }
            };

            for event in diff_snapshots(&previous, &current) {
                sink.on_event(event);
            }
            previous = current;
        }

        tracing::info!("Process scanner stopped");
        Ok(())
    }
}

/// Events implied by moving from `previous` to `current`.
///
/// Stops are reported before starts so a pid reused within one interval
/// (same pid, different name) reads as exit-then-launch.
pub fn diff_snapshots(previous: &ProcSnapshot, current: &ProcSnapshot) -> Vec<ProcessEvent> {
    let mut events = Vec::new();

    for (pid, name) in previous {
        match current.get(pid) {
            Some(now) if now == name => {}
            _ => events.push(ProcessEvent::Stopped {
                pid: *pid,
                name: (!name.is_empty()).then(|| name.clone()),
            }),
        }
    }

    for (pid, name) in current {
        match previous.get(pid) {
            Some(before) if before == name => {}
            _ => events.push(ProcessEvent::Started { pid: *pid }),
        }
    }

    events
}
