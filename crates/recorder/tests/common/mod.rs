//! Shared harness: a scripted engine, a scriptable process inspector, and
//! an orchestrator wired to a temporary content library.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gamecap_capture_engine::testing::ScriptedEngine;
use gamecap_capture_engine::{CaptureEngine, EngineSignal, HookInfo};
use gamecap_common::config::{AppConfig, RecordingMode, TimeoutConfig};
use gamecap_game_detect::StartRequest;
use gamecap_platform_core::{
    ClientSize, MonitorInfo, ProcessInspector, WindowHandle, WindowInfo, WindowProbe,
};
use gamecap_recorder::{BroadcastStatusSink, FsContentSink, RecordingSessionOrchestrator};
use gamecap_session_model::{NoticeKind, OrchestratorState, StatusUpdate};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const PID: u32 = 4242;
pub const GAME: &str = "Hades";
pub const EXE_PATH: &str = "/lib/steamapps/common/Hades/Hades.exe";
pub const DISPLAY: ClientSize = ClientSize::new(2560, 1440);

/// Short bounds so every scenario finishes in well under a second.
pub fn fast_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        window_poll_ms: 5,
        window_wait_ms: 300,
        window_paint_grace_ms: 20,
        video_settle_ms: 0,
        hook_wait_auto_ms: 150,
        hook_wait_manual_ms: 250,
        hook_fallback_ms: 150,
        hook_key_poll_ms: 5,
        hook_key_wait_ms: 60,
        stop_wait_ms: 150,
        save_wait_ms: 150,
        save_path_grace_ms: 40,
    }
}

pub fn game_window(size: ClientSize) -> WindowInfo {
    WindowInfo {
        handle: WindowHandle(77),
        title: Some("Hades".to_string()),
        class: Some("SDL_app".to_string()),
        client: size,
    }
}

pub fn hook_info() -> HookInfo {
    HookInfo {
        title: "Hades".to_string(),
        class: "SDL_app".to_string(),
        executable: "Hades.exe".to_string(),
    }
}

pub struct FakeInspector {
    running: AtomicBool,
    probes: Mutex<VecDeque<WindowProbe>>,
    sticky: Mutex<WindowProbe>,
    display: Option<MonitorInfo>,
}

impl FakeInspector {
    pub fn new(window: WindowProbe) -> Self {
        Self {
            running: AtomicBool::new(true),
            probes: Mutex::new(VecDeque::new()),
            sticky: Mutex::new(window),
            display: Some(MonitorInfo {
                name: "DP-1".to_string(),
                width: DISPLAY.width,
                height: DISPLAY.height,
                x: 0,
                y: 0,
                refresh_rate_hz: 144,
                primary: true,
            }),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Probes answered once each, in order, before the sticky probe.
    pub fn queue(&self, probes: impl IntoIterator<Item = WindowProbe>) {
        self.probes.lock().extend(probes);
    }

    pub fn set_window(&self, probe: WindowProbe) {
        *self.sticky.lock() = probe;
    }
}

impl ProcessInspector for FakeInspector {
    fn is_running(&self, pid: u32) -> bool {
        pid == PID && self.running.load(Ordering::SeqCst)
    }

    fn main_window(&self, _pid: u32) -> WindowProbe {
        if let Some(probe) = self.probes.lock().pop_front() {
            return probe;
        }
        self.sticky.lock().clone()
    }

    fn window_details(&self, window: WindowHandle) -> Option<WindowInfo> {
        match &*self.sticky.lock() {
            WindowProbe::Ready(info) if info.handle == window => Some(info.clone()),
            _ => None,
        }
    }

    fn window_process(&self, _window: WindowHandle) -> Option<u32> {
        Some(PID)
    }

    fn primary_display(&self) -> Option<MonitorInfo> {
        self.display.clone()
    }

    fn find_process(&self, _executable: &Path) -> Option<u32> {
        self.running.load(Ordering::SeqCst).then_some(PID)
    }
}

pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub inspector: Arc<FakeInspector>,
    pub orchestrator: RecordingSessionOrchestrator,
    pub library: TempDir,
    status: broadcast::Receiver<StatusUpdate>,
}

impl Harness {
    /// Windowed game (1920x1080 on a 2560x1440 display), session mode,
    /// display fallback off.
    pub fn new() -> Self {
        Self::with(WindowProbe::Ready(game_window(ClientSize::new(1920, 1080))), |_| {})
    }

    pub fn with(window: WindowProbe, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let library = TempDir::new().expect("temp library");
        let mut config = AppConfig::default();
        config.recording.output_dir = library.path().to_path_buf();
        config.recording.mode = RecordingMode::Session;
        config.recording.display_fallback = false;
        config.timeouts = fast_timeouts();
        configure(&mut config);

        let engine = Arc::new(ScriptedEngine::new());
        let inspector = Arc::new(FakeInspector::new(window));
        let status = BroadcastStatusSink::new(1024);
        let rx = status.subscribe();
        let orchestrator = RecordingSessionOrchestrator::new(
            engine.clone() as Arc<dyn CaptureEngine>,
            inspector.clone() as Arc<dyn ProcessInspector>,
            Arc::new(FsContentSink::new(library.path())),
            Arc::new(status),
            config,
        );

        Self {
            engine,
            inspector,
            orchestrator,
            library,
            status: rx,
        }
    }

    pub fn request(&self) -> StartRequest {
        StartRequest {
            game_name: GAME.to_string(),
            executable: PathBuf::from(EXE_PATH),
            pid: Some(PID),
            manual: false,
        }
    }

    /// Run `start_recording` on a background thread.
    pub fn start_in_background(
        &self,
        request: StartRequest,
    ) -> std::thread::JoinHandle<gamecap_common::error::GameCapResult<()>> {
        let orchestrator = self.orchestrator.clone();
        std::thread::spawn(move || orchestrator.start_recording(request))
    }

    pub fn wait_for_state(&self, state: OrchestratorState) -> bool {
        wait_until(Duration::from_secs(5), || self.orchestrator.state() == state)
    }

    pub fn emit_hooked(&self) {
        self.engine.emit(EngineSignal::Hooked(hook_info()));
    }

    /// Everything pushed since the last drain.
    pub fn drain_updates(&mut self) -> Vec<StatusUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.status.try_recv() {
            updates.push(update);
        }
        updates
    }

    pub fn drain_notices(&mut self) -> Vec<NoticeKind> {
        self.drain_updates()
            .iter()
            .filter_map(StatusUpdate::notice_kind)
            .collect()
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
