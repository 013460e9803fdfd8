//! Hooked-window versus display capture.

use std::time::Duration;

use gamecap_capture_engine::HookKey;
use gamecap_common::clock::Deadline;
use gamecap_platform_core::{ClientSize, ProcessInspector, WindowInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Attach to the game window identified by the key.
    Hooked(HookKey),
    /// Capture the whole primary display.
    Display { reason: &'static str },
}

impl CaptureStrategy {
    pub fn is_hooked(&self) -> bool {
        matches!(self, Self::Hooked(_))
    }
}

pub struct CaptureStrategySelector<'a> {
    inspector: &'a dyn ProcessInspector,
    poll: Duration,
    wait: Duration,
}

impl<'a> CaptureStrategySelector<'a> {
    pub fn new(inspector: &'a dyn ProcessInspector, poll: Duration, wait: Duration) -> Self {
        Self {
            inspector,
            poll,
            wait,
        }
    }

    /// Pick a strategy, polling for the window's title and class when the
    /// first read lacks them.
    pub fn select(
        &self,
        window: Option<&WindowInfo>,
        display: Option<ClientSize>,
        executable: &str,
    ) -> CaptureStrategy {
        match self.precheck(window, display, executable) {
            Ok(strategy) => strategy,
            Err(window) => self.await_hook_key(window, executable),
        }
    }

    /// Like [`select`](Self::select) but never waits: a window without a
    /// title or class degrades to display capture at once.
    pub fn select_now(
        &self,
        window: Option<&WindowInfo>,
        display: Option<ClientSize>,
        executable: &str,
    ) -> CaptureStrategy {
        self.precheck(window, display, executable)
            .unwrap_or(CaptureStrategy::Display {
                reason: "window title or class unavailable",
            })
    }

    /// Decide without waiting, or hand back the window that still needs a
    /// title/class read.
    fn precheck<'w>(
        &self,
        window: Option<&'w WindowInfo>,
        display: Option<ClientSize>,
        executable: &str,
    ) -> Result<CaptureStrategy, &'w WindowInfo> {
        let Some(window) = window else {
            return Ok(CaptureStrategy::Display {
                reason: "window unobtainable",
            });
        };
        if display == Some(window.client) {
            return Ok(CaptureStrategy::Display {
                reason: "window covers the primary display",
            });
        }
        match hook_key(window, executable) {
            Some(key) => Ok(CaptureStrategy::Hooked(key)),
            None => Err(window),
        }
    }

    fn await_hook_key(&self, window: &WindowInfo, executable: &str) -> CaptureStrategy {
        let deadline = Deadline::after(self.wait);
        while !deadline.expired() {
            std::thread::sleep(deadline.step(self.poll));
            if let Some(key) = self
                .inspector
                .window_details(window.handle)
                .and_then(|info| hook_key(&info, executable))
            {
                return CaptureStrategy::Hooked(key);
            }
        }
        tracing::warn!(
            executable,
            waited_ms = deadline.waited().as_millis() as u64,
            "Window title/class never became available; using display capture"
        );
        CaptureStrategy::Display {
            reason: "window title or class unavailable",
        }
    }
}

fn hook_key(window: &WindowInfo, executable: &str) -> Option<HookKey> {
    let title = window.title.as_deref().filter(|t| !t.is_empty())?;
    let class = window.class.as_deref().filter(|c| !c.is_empty())?;
    Some(HookKey {
        title: title.to_string(),
        class: class.to_string(),
        executable: executable.to_string(),
    })
}
