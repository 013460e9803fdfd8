//! Game process monitoring.
//!
//! [`GameProcessMonitor`] consumes [`ProcessEvent`]s from a platform source,
//! decides which ones are game launches or exits, and forwards start and
//! stop requests to the recorder through [`RecordingControl`]. Handlers run
//! on the event-source task: they never block and never let a failure or
//! panic escape into the source.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gamecap_common::config::DetectionConfig;
use gamecap_common::error::GameCapResult;
use gamecap_platform_core::{
    executable_name, ProcessEvent, ProcessEventSink, ProcessEventSource, ProcessInspector,
    WindowHandle,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::classifier::GameClassifier;
use crate::resolver::ProcessPathResolver;

/// A request to begin recording a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub game_name: String,
    pub executable: PathBuf,
    /// Known pid of the game process; looked up by path when absent.
    pub pid: Option<u32>,
    /// Manual requests skip the window wait and start on display capture.
    pub manual: bool,
}

/// The recorder surface the monitor drives.
pub trait RecordingControl: Send + Sync {
    fn is_idle(&self) -> bool;

    /// A session is recording or a start is pending.
    fn has_pending_or_active(&self) -> bool;

    /// Claim the recorder and begin a start sequence. Returns a ticket for
    /// the claimed start, or `None` when the recorder is already busy. The
    /// claim is taken before returning; the rest must not block.
    fn request_start(&self, request: StartRequest) -> Option<u64>;

    /// The start holding `ticket` is still pending or recording.
    fn is_current(&self, ticket: u64) -> bool;

    /// Stop the active session. Must return without blocking.
    fn request_stop(&self);

    fn clear_retry_guard(&self);

    /// Automatic starts are suppressed after a hook timeout until the
    /// foreground window changes.
    fn retry_guard_armed(&self) -> bool;
}

/// Kernel `comm` names are cut to this many bytes.
const COMM_LEN: usize = 15;

/// The executable whose exit ends the current recording.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackedExecutable {
    name: String,
    pid: u32,
    ticket: u64,
}

impl TrackedExecutable {
    fn exited(&self, pid: u32, name: Option<&str>) -> bool {
        if self.pid == pid {
            return true;
        }
        let Some(name) = name else {
            return false;
        };
        if self.name.eq_ignore_ascii_case(name) {
            return true;
        }
        name.len() == COMM_LEN
            && self.name.len() > COMM_LEN
            && self.name.as_bytes()[..COMM_LEN].eq_ignore_ascii_case(name.as_bytes())
    }
}

struct MonitorCore {
    resolver: ProcessPathResolver,
    classifier: GameClassifier,
    inspector: Arc<dyn ProcessInspector>,
    control: Arc<dyn RecordingControl>,
    tracked: Mutex<Option<TrackedExecutable>>,
    recent: Mutex<HashMap<String, Instant>>,
    debounce: Duration,
}

struct RunningSource {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

pub struct GameProcessMonitor {
    core: Arc<MonitorCore>,
    running: Mutex<Option<RunningSource>>,
}

impl GameProcessMonitor {
    pub fn new(
        resolver: ProcessPathResolver,
        classifier: GameClassifier,
        inspector: Arc<dyn ProcessInspector>,
        control: Arc<dyn RecordingControl>,
        config: &DetectionConfig,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                resolver,
                classifier,
                inspector,
                control,
                tracked: Mutex::new(None),
                recent: Mutex::new(HashMap::new()),
                debounce: Duration::from_millis(config.debounce_ms),
            }),
            running: Mutex::new(None),
        }
    }

    /// Spawn `source` on the current tokio runtime and route its events into
    /// the handlers. A second call while running is ignored.
    pub fn start(&self, mut source: Box<dyn ProcessEventSource>) -> GameCapResult<()> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            tracing::debug!("Process monitor already running");
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let sink: Arc<dyn ProcessEventSink> = Arc::clone(&self.core) as Arc<dyn ProcessEventSink>;
        let task_stop = Arc::clone(&stop);
        let task = tokio::spawn(async move {
            let name = source.name().to_string();
            tracing::info!(source = %name, "Process monitor started");
            if let Err(e) = source.run(sink, task_stop).await {
                tracing::error!(source = %name, error = %e, "Process event source failed");
            }
            tracing::info!(source = %name, "Process monitor stopped");
        });

        *running = Some(RunningSource { stop, task });
        Ok(())
    }

    /// Signal the source to stop and wait for it. Idempotent.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.stop.store(true, Ordering::SeqCst);
        if let Err(e) = running.task.await {
            tracing::warn!(error = %e, "Process monitor task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    pub fn on_process_started(&self, pid: u32) {
        self.core.on_event(ProcessEvent::Started { pid });
    }

    pub fn on_process_stopped(&self, pid: u32, name: Option<String>) {
        self.core.on_event(ProcessEvent::Stopped { pid, name });
    }

    pub fn on_foreground_changed(&self, window: WindowHandle) {
        self.core.on_event(ProcessEvent::ForegroundChanged { window });
    }

    /// Name of the executable whose exit would stop the recording.
    pub fn tracked_executable(&self) -> Option<String> {
        self.core
            .tracked
            .lock()
            .as_ref()
            .filter(|t| self.core.control.is_current(t.ticket))
            .map(|t| t.name.clone())
    }
}

impl ProcessEventSink for MonitorCore {
    fn on_event(&self, event: ProcessEvent) {
        let outcome = catch_unwind(AssertUnwindSafe(|| match &event {
            ProcessEvent::Started { pid } => self.process_started(*pid),
            ProcessEvent::Stopped { pid, name } => self.process_stopped(*pid, name.as_deref()),
            ProcessEvent::ForegroundChanged { window } => self.foreground_changed(*window),
        }));
        if outcome.is_err() {
            tracing::error!(?event, "Process event handler panicked; event dropped");
        }
    }
}

impl MonitorCore {
    fn process_started(&self, pid: u32) {
        if self.control.has_pending_or_active() {
            tracing::debug!(pid, "Recording already active or pending; start trigger ignored");
            return;
        }
        if self.control.retry_guard_armed() {
            tracing::debug!(pid, "Automatic retry suppressed until foreground changes");
            return;
        }
        self.evaluate(pid);
    }

    fn process_stopped(&self, pid: u32, name: Option<&str>) {
        let mut tracked = self.tracked.lock();
        let Some(current) = tracked.as_ref() else {
            return;
        };
        if !self.control.is_current(current.ticket) {
            tracing::debug!(executable = %current.name, "Tracked start has ended; forgetting it");
            *tracked = None;
            return;
        }
        if !current.exited(pid, name) {
            return;
        }
        tracing::info!(pid, executable = %current.name, "Tracked game exited; stopping recording");
        *tracked = None;
        drop(tracked);
        self.control.request_stop();
    }

    fn foreground_changed(&self, window: WindowHandle) {
        self.control.clear_retry_guard();
        if !self.control.is_idle() {
            return;
        }
        let Some(pid) = self.inspector.window_process(window) else {
            tracing::trace!(window = window.0, "Foreground window has no known process");
            return;
        };
        self.evaluate(pid);
    }

    /// Resolve, classify, debounce, and forward. Failures mean "not a game".
    fn evaluate(&self, pid: u32) {
        let path = match self.resolver.resolve(pid) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(pid, error = %e, "Executable path unavailable; treating as non-game");
                return;
            }
        };

        let classification = self.classifier.classify(&path);
        if !classification.is_game {
            tracing::trace!(pid, path = %path.display(), "Not a game");
            return;
        }

        let Some(name) = executable_name(&path) else {
            return;
        };
        if self.debounced(&name) {
            tracing::debug!(pid, executable = %name, "Start trigger debounced");
            return;
        }

        tracing::info!(
            pid,
            game = %classification.display_name,
            path = %path.display(),
            "Game detected"
        );
        let request = StartRequest {
            game_name: classification.display_name,
            executable: path,
            pid: Some(pid),
            manual: false,
        };
        let Some(ticket) = self.control.request_start(request) else {
            tracing::debug!(pid, executable = %name, "Recorder busy; start not forwarded");
            return;
        };
        *self.tracked.lock() = Some(TrackedExecutable { name, pid, ticket });
    }

    /// Record a trigger for `executable`; true if one was forwarded recently.
    fn debounced(&self, executable: &str) -> bool {
        let key = executable.to_ascii_lowercase();
        let now = Instant::now();
        let mut recent = self.recent.lock();
        recent.retain(|_, at| now.duration_since(*at) < self.debounce);
        if recent.contains_key(&key) {
            return true;
        }
        recent.insert(key, now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecap_common::error::GameCapError;
    use gamecap_platform_core::{MonitorInfo, PathQuery, WindowInfo, WindowProbe};
    use std::path::Path;

    #[derive(Default)]
    struct FakeControl {
        idle: AtomicBool,
        busy: AtomicBool,
        guard: AtomicBool,
        /// Refuse further starts while one is current, without reporting busy.
        exclusive: AtomicBool,
        starts: Mutex<Vec<StartRequest>>,
        stops: Mutex<usize>,
        current: Mutex<Option<u64>>,
    }

    impl FakeControl {
        fn idle() -> Arc<Self> {
            let control = Self::default();
            control.idle.store(true, Ordering::SeqCst);
            Arc::new(control)
        }

        /// The recorder went back to idle on its own.
        fn end_session(&self) {
            *self.current.lock() = None;
        }
    }

    impl RecordingControl for FakeControl {
        fn is_idle(&self) -> bool {
            self.idle.load(Ordering::SeqCst)
        }
        fn has_pending_or_active(&self) -> bool {
            self.busy.load(Ordering::SeqCst)
        }
        fn request_start(&self, request: StartRequest) -> Option<u64> {
            let mut current = self.current.lock();
            if self.exclusive.load(Ordering::SeqCst) && current.is_some() {
                return None;
            }
            let mut starts = self.starts.lock();
            starts.push(request);
            let ticket = starts.len() as u64;
            *current = Some(ticket);
            Some(ticket)
        }
        fn is_current(&self, ticket: u64) -> bool {
            *self.current.lock() == Some(ticket)
        }
        fn request_stop(&self) {
            *self.stops.lock() += 1;
        }
        fn clear_retry_guard(&self) {
            self.guard.store(false, Ordering::SeqCst);
        }
        fn retry_guard_armed(&self) -> bool {
            self.guard.load(Ordering::SeqCst)
        }
    }

    struct MapQuery(HashMap<u32, &'static str>);

    impl PathQuery for MapQuery {
        fn name(&self) -> &str {
            "map"
        }
        fn query(&self, pid: u32) -> GameCapResult<PathBuf> {
            self.0
                .get(&pid)
                .map(PathBuf::from)
                .ok_or_else(|| GameCapError::process_resolution(pid, "gone"))
        }
    }

    struct Windows(HashMap<u64, u32>);

    impl ProcessInspector for Windows {
        fn is_running(&self, _pid: u32) -> bool {
            true
        }
        fn main_window(&self, _pid: u32) -> WindowProbe {
            WindowProbe::Unsupported
        }
        fn window_details(&self, _window: WindowHandle) -> Option<WindowInfo> {
            None
        }
        fn window_process(&self, window: WindowHandle) -> Option<u32> {
            self.0.get(&window.0).copied()
        }
        fn primary_display(&self) -> Option<MonitorInfo> {
            None
        }
        fn find_process(&self, _executable: &Path) -> Option<u32> {
            None
        }
    }

    const HADES: &str = "/lib/steamapps/common/Hades/Hades.exe";

    fn monitor(control: Arc<FakeControl>, debounce_ms: u64) -> GameProcessMonitor {
        let paths = HashMap::from([
            (100, HADES),
            (101, "/lib/steamapps/common/Hades/UnityCrashHandler64.exe"),
            (200, "/usr/bin/bash"),
            (300, "/lib/steamapps/common/HZD/HorizonZeroDawn.exe"),
        ]);
        let resolver = ProcessPathResolver::new(
            Box::new(MapQuery(HashMap::new())),
            Box::new(MapQuery(paths)),
        );
        let config = DetectionConfig {
            debounce_ms,
            ..DetectionConfig::default()
        };
        GameProcessMonitor::new(
            resolver,
            GameClassifier::from_config(&config),
            Arc::new(Windows(HashMap::from([(5, 100), (6, 200)]))),
            control,
            &config,
        )
    }

    #[test]
    fn game_launch_requests_start() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(100);

        let starts = control.starts.lock();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].game_name, "Hades");
        assert_eq!(starts[0].pid, Some(100));
        assert!(!starts[0].manual);
        assert_eq!(monitor.tracked_executable().as_deref(), Some("Hades.exe"));
    }

    #[test]
    fn non_games_and_unresolvable_pids_are_ignored() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(200);
        monitor.on_process_started(999);
        assert!(control.starts.lock().is_empty());
        assert_eq!(monitor.tracked_executable(), None);
    }

    #[test]
    fn starts_are_ignored_while_busy() {
        let control = FakeControl::idle();
        control.busy.store(true, Ordering::SeqCst);
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(100);
        assert!(control.starts.lock().is_empty());
    }

    #[test]
    fn repeated_launches_are_debounced() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 60_000);
        monitor.on_process_started(100);
        monitor.on_process_started(100);
        assert_eq!(control.starts.lock().len(), 1);
    }

    #[test]
    fn zero_debounce_forwards_every_trigger() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 0);
        monitor.on_process_started(100);
        monitor.on_process_started(100);
        assert_eq!(control.starts.lock().len(), 2);
    }

    #[test]
    fn tracked_exit_requests_stop_once() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(100);

        monitor.on_process_stopped(300, Some("bash".to_string()));
        assert_eq!(*control.stops.lock(), 0);

        monitor.on_process_stopped(100, Some("HADES.EXE".to_string()));
        monitor.on_process_stopped(100, Some("Hades.exe".to_string()));
        assert_eq!(*control.stops.lock(), 1);
        assert_eq!(monitor.tracked_executable(), None);
    }

    #[test]
    fn unnamed_exit_correlates_by_pid() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(100);
        monitor.on_process_stopped(101, None);
        assert_eq!(*control.stops.lock(), 0);
        monitor.on_process_stopped(100, None);
        assert_eq!(*control.stops.lock(), 1);
    }

    #[test]
    fn exit_matches_pid_even_when_name_is_truncated() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(300);
        assert_eq!(
            monitor.tracked_executable().as_deref(),
            Some("HorizonZeroDawn.exe")
        );

        monitor.on_process_stopped(300, Some("HorizonZeroDawn".to_string()));
        assert_eq!(*control.stops.lock(), 1);
        assert_eq!(monitor.tracked_executable(), None);
    }

    #[test]
    fn truncated_comm_name_matches_another_pid() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(300);

        monitor.on_process_stopped(301, Some("HorizonZero".to_string()));
        assert_eq!(*control.stops.lock(), 0);
        monitor.on_process_stopped(301, Some("horizonzerodawn".to_string()));
        assert_eq!(*control.stops.lock(), 1);
    }

    #[test]
    fn refused_start_does_not_replace_tracked_game() {
        let control = FakeControl::idle();
        control.exclusive.store(true, Ordering::SeqCst);
        let monitor = monitor(Arc::clone(&control), 2_000);

        // Both launches land before the recorder reports busy.
        monitor.on_process_started(100);
        monitor.on_process_started(101);
        assert_eq!(control.starts.lock().len(), 1);
        assert_eq!(monitor.tracked_executable().as_deref(), Some("Hades.exe"));

        monitor.on_process_stopped(101, Some("UnityCrashHandl".to_string()));
        assert_eq!(*control.stops.lock(), 0);
        monitor.on_process_stopped(100, Some("Hades.exe".to_string()));
        assert_eq!(*control.stops.lock(), 1);
    }

    #[test]
    fn ended_start_is_forgotten() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor.on_process_started(100);

        // The start aborted; a later session started elsewhere is now active.
        control.end_session();
        control.busy.store(true, Ordering::SeqCst);
        assert_eq!(monitor.tracked_executable(), None);

        monitor.on_process_stopped(100, Some("Hades.exe".to_string()));
        assert_eq!(*control.stops.lock(), 0);
    }

    #[test]
    fn retry_guard_blocks_launch_until_foreground_changes() {
        let control = FakeControl::idle();
        control.guard.store(true, Ordering::SeqCst);
        let monitor = monitor(Arc::clone(&control), 0);

        monitor.on_process_started(100);
        assert!(control.starts.lock().is_empty());

        monitor.on_foreground_changed(WindowHandle(5));
        assert!(!control.retry_guard_armed());
        assert_eq!(control.starts.lock().len(), 1);
    }

    #[test]
    fn foreground_change_only_classifies_when_idle() {
        let control = Arc::new(FakeControl::default());
        let monitor = monitor(Arc::clone(&control), 0);
        monitor.on_foreground_changed(WindowHandle(5));
        assert!(control.starts.lock().is_empty());

        control.idle.store(true, Ordering::SeqCst);
        monitor.on_foreground_changed(WindowHandle(6));
        monitor.on_foreground_changed(WindowHandle(77));
        assert!(control.starts.lock().is_empty());
    }

    struct Scripted(Vec<ProcessEvent>);

    #[async_trait::async_trait]
    impl ProcessEventSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run(
            &mut self,
            sink: Arc<dyn ProcessEventSink>,
            stop: Arc<AtomicBool>,
        ) -> GameCapResult<()> {
            for event in self.0.drain(..) {
                sink.on_event(event);
            }
            while !stop.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn started_source_routes_events_until_stopped() {
        let control = FakeControl::idle();
        let monitor = monitor(Arc::clone(&control), 2_000);
        monitor
            .start(Box::new(Scripted(vec![
                ProcessEvent::Started { pid: 100 },
                ProcessEvent::Stopped {
                    pid: 100,
                    name: Some("Hades.exe".to_string()),
                },
            ])))
            .unwrap();

        for _ in 0..200 {
            if *control.stops.lock() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(control.starts.lock().len(), 1);
        assert_eq!(*control.stops.lock(), 1);

        monitor.stop().await;
        monitor.stop().await;
        assert!(!monitor.is_running());
    }
}
