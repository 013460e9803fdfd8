//! The recording session state machine.
//!
//! ```text
//!   Idle ──start──▶ PreRecording(WaitingForWindow) ──▶ PreRecording(WaitingForHook) ──▶ Recording
//!    ▲                     │ timeout / exit                  │ hook timeout                │
//!    │                     ▼                                 ▼                             │ stop
//!    └──────────────────── abort (sources released, user notified) ◀──── Stopping ◀────────┘
//! ```
//!
//! With display fallback enabled the hook wait is skipped: recording starts
//! on display capture at once and a parked game-capture attempt replaces it
//! if the engine reports a hook before the fallback timer fires.
//!
//! Blocking steps run on the caller's thread. [`RecordingControl`] wraps
//! them in named background threads for the process monitor.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{Local, Utc};
use gamecap_capture_engine::{
    CaptureEngine, EngineSignal, HookInfo, OutputKind, OutputSettings, SignalBoard, SourceGuard,
    SourceKind, SourceSettings, VideoGeometry,
};
use gamecap_common::clock::{Deadline, RecordingClock};
use gamecap_common::config::AppConfig;
use gamecap_common::error::{GameCapError, GameCapResult};
use gamecap_game_detect::{RecordingControl, StartRequest};
use gamecap_platform_core::{
    executable_name, ClientSize, MonitorInfo, ProcessInspector, WindowInfo, WindowProbe,
};
use gamecap_session_model::{
    Bookmark, CaptureKind, ContentKind, NoticeKind, OrchestratorState, PreRecordingPhase,
    PreRecordingStatus, RecordingSession, SessionState, StatusUpdate,
};
use parking_lot::Mutex;

use crate::capture::CaptureSet;
use crate::content::{catalog, ContentSink};
use crate::notify::StatusSink;
use crate::output;
use crate::replay::ReplayBufferController;
use crate::strategy::{CaptureStrategy, CaptureStrategySelector};
use crate::timer::HookTimeoutTimer;

/// Canvas used when neither a window nor a display size is known.
const FALLBACK_CANVAS: ClientSize = ClientSize::new(1920, 1080);

/// A running session and everything it holds in the engine.
struct ActiveSession {
    session: RecordingSession,
    clock: RecordingClock,
    outputs: Vec<OutputKind>,
    capture: CaptureSet,
}

#[derive(Default)]
struct Core {
    state: OrchestratorState,
    /// Set while a start or stop sequence runs outside the lock.
    transition: bool,
    pre: Option<PreRecordingStatus>,
    active: Option<ActiveSession>,
    /// Identifies the start that owns the current pending or active session.
    ticket: Option<u64>,
}

/// A start sequence that reached the point of recording.
struct Prepared {
    session: RecordingSession,
    clock: RecordingClock,
    outputs: Vec<OutputKind>,
    capture: CaptureSet,
    /// Game-capture attempt to park beside display capture.
    hook_attempt: Option<SourceGuard>,
    manual: bool,
}

struct Inner {
    engine: Arc<dyn CaptureEngine>,
    inspector: Arc<dyn ProcessInspector>,
    content: Arc<dyn ContentSink>,
    status: Arc<dyn StatusSink>,
    config: AppConfig,
    signals: Arc<SignalBoard>,
    replay: ReplayBufferController,
    core: Mutex<Core>,
    retry_guard: AtomicBool,
    hook_acquired: AtomicBool,
    next_session: AtomicU64,
    next_attempt: AtomicU64,
    next_ticket: AtomicU64,
    weak: Weak<Inner>,
}

/// Owns the recording lifecycle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RecordingSessionOrchestrator {
    inner: Arc<Inner>,
}

impl RecordingSessionOrchestrator {
    pub fn new(
        engine: Arc<dyn CaptureEngine>,
        inspector: Arc<dyn ProcessInspector>,
        content: Arc<dyn ContentSink>,
        status: Arc<dyn StatusSink>,
        config: AppConfig,
    ) -> Self {
        let signals = Arc::new(SignalBoard::new());
        let inner = Arc::new_cyclic(|weak| Inner {
            replay: ReplayBufferController::new(
                Arc::clone(&engine),
                Arc::clone(&signals),
                Arc::clone(&content),
                Arc::clone(&status),
                config.timeouts.clone(),
            ),
            engine,
            inspector,
            content,
            status,
            config,
            signals,
            core: Mutex::new(Core::default()),
            retry_guard: AtomicBool::new(false),
            hook_acquired: AtomicBool::new(false),
            next_session: AtomicU64::new(1),
            next_attempt: AtomicU64::new(1),
            next_ticket: AtomicU64::new(1),
            weak: weak.clone(),
        });

        let weak = Arc::downgrade(&inner);
        inner.engine.set_signal_listener(Arc::new(move |signal| {
            if let Some(inner) = weak.upgrade() {
                inner.on_signal(signal);
            }
        }));
        tracing::debug!(engine = inner.engine.name(), "Recording orchestrator ready");

        Self { inner }
    }

    /// Run a full start sequence on the calling thread.
    ///
    /// Fails with [`GameCapError::Busy`] without touching state when a
    /// session is active or pending.
    pub fn start_recording(&self, request: StartRequest) -> GameCapResult<()> {
        self.inner.start(request)
    }

    /// Stop the active session and hand its file to the content catalog.
    /// A no-op while idle or pre-recording.
    pub fn stop_recording(&self) -> GameCapResult<()> {
        self.inner.stop()
    }

    /// Bookmark the current offset of the active session.
    pub fn add_bookmark(&self, label: Option<String>) -> bool {
        self.inner.bookmark(label, false)
    }

    /// Bookmark raised by a highlight trigger; ignored unless automatic
    /// highlights are enabled.
    pub fn add_auto_bookmark(&self, label: Option<String>) -> bool {
        if !self.inner.config.recording.auto_highlights {
            tracing::debug!("Automatic highlights disabled; bookmark ignored");
            return false;
        }
        self.inner.bookmark(label, true)
    }

    /// Save the replay buffer of the active session.
    pub fn save_replay_buffer(&self) -> bool {
        let game = self
            .session()
            .map(|s| s.game_name)
            .unwrap_or_else(|| "Unknown Game".to_string());
        self.inner.replay.save(&game)
    }

    pub fn state(&self) -> OrchestratorState {
        self.inner.core.lock().state
    }

    pub fn session(&self) -> Option<RecordingSession> {
        self.inner
            .core
            .lock()
            .active
            .as_ref()
            .map(|a| a.session.clone())
    }

    pub fn pre_recording(&self) -> Option<PreRecordingStatus> {
        self.inner.core.lock().pre.clone()
    }

    pub fn hook_acquired(&self) -> bool {
        self.inner.hook_acquired.load(Ordering::SeqCst)
    }

    /// Release everything regardless of state. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Err(e) = self.stop_recording() {
            tracing::warn!(error = %e, "Stop during shutdown failed");
        }
        self.inner.engine.release_outputs();
    }
}

impl RecordingControl for RecordingSessionOrchestrator {
    fn is_idle(&self) -> bool {
        let core = self.inner.core.lock();
        core.state.is_idle() && !core.transition
    }

    fn has_pending_or_active(&self) -> bool {
        let core = self.inner.core.lock();
        !core.state.is_idle() || core.transition
    }

    fn request_start(&self, request: StartRequest) -> Option<u64> {
        // Claimed here so a second trigger in the same batch sees us busy.
        let ticket = self.inner.claim(&request).ok()?;
        let pending = request.clone();
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name("gamecap-start".to_string())
            .spawn(move || {
                let game = request.game_name.clone();
                if let Err(e) = this.inner.run_start(request) {
                    tracing::warn!(game = %game, error = %e, "Recording did not start");
                }
            });
        match spawned {
            Ok(_) => Some(ticket),
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn start thread");
                self.inner.abort(&pending, &GameCapError::from(e));
                None
            }
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.inner.core.lock().ticket == Some(ticket)
    }

    fn request_stop(&self) {
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name("gamecap-stop".to_string())
            .spawn(move || {
                if let Err(e) = this.stop_recording() {
                    tracing::warn!(error = %e, "Recording did not stop cleanly");
                }
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn stop thread");
        }
    }

    fn clear_retry_guard(&self) {
        if self.inner.retry_guard.swap(false, Ordering::SeqCst) {
            tracing::debug!("Automatic retry re-enabled");
        }
    }

    fn retry_guard_armed(&self) -> bool {
        self.inner.retry_guard.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn start(&self, request: StartRequest) -> GameCapResult<()> {
        self.claim(&request)?;
        self.run_start(request)
    }

    /// Move Idle to PreRecording and hand out the ticket for this start.
    fn claim(&self, request: &StartRequest) -> GameCapResult<u64> {
        let mut core = self.core.lock();
        if core.transition || !core.state.is_idle() {
            tracing::info!(game = %request.game_name, state = %core.state, "Start refused; recorder busy");
            return Err(GameCapError::busy(core.state.to_string()));
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        core.transition = true;
        core.ticket = Some(ticket);
        core.state = OrchestratorState::PreRecording(PreRecordingPhase::WaitingForWindow);
        let status = PreRecordingStatus::new(
            if request.manual {
                "Starting recording"
            } else {
                "Waiting for game window"
            },
            &request.game_name,
        );
        core.pre = Some(status.clone());
        self.status.push(StatusUpdate::PreRecording(status));
        Ok(ticket)
    }

    /// The blocking part of a claimed start.
    fn run_start(&self, request: StartRequest) -> GameCapResult<()> {
        tracing::info!(
            game = %request.game_name,
            executable = %request.executable.display(),
            manual = request.manual,
            "Recording requested"
        );

        match self.prepare(&request) {
            Ok(prepared) => {
                self.commit(prepared);
                Ok(())
            }
            Err(e) => {
                self.abort(&request, &e);
                Err(e)
            }
        }
    }

    /// Everything between the start request and the first recorded frame.
    /// Any early return drops the capture set, releasing what was created.
    fn prepare(&self, request: &StartRequest) -> GameCapResult<Prepared> {
        let recording = &self.config.recording;
        let timeouts = &self.config.timeouts;

        let display = self.inspector.primary_display();
        let display_size = display.as_ref().map(MonitorInfo::size);
        let pid = request
            .pid
            .or_else(|| self.inspector.find_process(&request.executable));
        let executable =
            executable_name(&request.executable).unwrap_or_else(|| request.game_name.clone());

        let window = if request.manual {
            None
        } else {
            self.wait_for_window(request, pid)?
        };

        let base = window
            .as_ref()
            .map(|w| w.client)
            .or(display_size)
            .unwrap_or(FALLBACK_CANVAS);
        let output = recording
            .fixed_resolution()
            .map(|(w, h)| ClientSize::new(w, h))
            .unwrap_or(base);
        self.engine.reset_video(&VideoGeometry {
            base,
            output,
            fps: recording.fps,
        })?;
        std::thread::sleep(timeouts.video_settle());

        let selector = CaptureStrategySelector::new(
            self.inspector.as_ref(),
            timeouts.hook_key_poll(),
            timeouts.hook_key_wait(),
        );
        let strategy = if request.manual {
            // Manual starts never wait; hook only if the window is ready now.
            let ready = pid.and_then(|pid| match self.inspector.main_window(pid) {
                WindowProbe::Ready(w) if !w.client.is_zero() => Some(w),
                _ => None,
            });
            selector.select_now(ready.as_ref(), display_size, &executable)
        } else {
            selector.select(window.as_ref(), display_size, &executable)
        };

        let fallback = request.manual || recording.display_fallback;
        let mut capture = CaptureSet::new(Arc::clone(&self.engine));
        let mut hook_attempt = None;
        let mut hooked: Option<HookInfo> = None;

        match strategy {
            CaptureStrategy::Display { reason } => {
                tracing::info!(game = %request.game_name, reason, "Using display capture");
                capture.bind_display(self.display_source(display)?)?;
            }
            CaptureStrategy::Hooked(key) if !fallback => {
                self.signals.reset_hook();
                self.set_phase(
                    PreRecordingPhase::WaitingForHook,
                    "Waiting for game hook",
                    &request.game_name,
                );
                let source = SourceGuard::create(
                    &self.engine,
                    SourceKind::GameCapture,
                    &SourceSettings::game(key),
                )?;
                capture.bind_hooked(source)?;

                // Manual starts always take the fallback path below.
                let budget = timeouts.hook_wait(false);
                match self.signals.wait_hooked(budget) {
                    Some(info) => hooked = Some(info),
                    None => {
                        self.retry_guard.store(true, Ordering::SeqCst);
                        return Err(GameCapError::HookTimeout {
                            game: request.game_name.clone(),
                            waited_secs: budget.as_secs(),
                        });
                    }
                }
            }
            CaptureStrategy::Hooked(key) => {
                capture.bind_display(self.display_source(display)?)?;
                self.signals.reset_hook();
                match SourceGuard::create(
                    &self.engine,
                    SourceKind::GameCapture,
                    &SourceSettings::game(key),
                ) {
                    Ok(source) => hook_attempt = Some(source),
                    Err(e) => tracing::warn!(
                        game = %request.game_name,
                        error = %e,
                        "Game capture unavailable; recording display only"
                    ),
                }
            }
        }

        let (outputs, output_path) = self.start_outputs(&request.game_name)?;

        let clock = RecordingClock::start();
        let mut session = RecordingSession {
            id: self.next_session.fetch_add(1, Ordering::SeqCst),
            mode: recording.mode,
            state: SessionState::Recording,
            started_at: clock.epoch_wall(),
            ended_at: None,
            output_path,
            game_name: request.game_name.clone(),
            executable,
            bookmarks: Vec::new(),
            hooked: false,
            capture: capture.kind().unwrap_or(CaptureKind::Display),
            icon: Some(request.executable.clone()),
        };
        if let Some(info) = hooked {
            apply_hook_report(&mut session, &info);
            self.hook_acquired.store(true, Ordering::SeqCst);
        }

        Ok(Prepared {
            session,
            clock,
            outputs,
            capture,
            hook_attempt,
            manual: request.manual,
        })
    }

    /// Poll for the main window until it has a painted client area.
    /// `Ok(None)` means the platform cannot see the window.
    fn wait_for_window(
        &self,
        request: &StartRequest,
        pid: Option<u32>,
    ) -> GameCapResult<Option<WindowInfo>> {
        let game = || request.game_name.clone();
        let Some(pid) = pid else {
            return Err(GameCapError::ProcessExited { game: game() });
        };
        let timeouts = &self.config.timeouts;
        let deadline = Deadline::after(timeouts.window_wait());

        let window = loop {
            if !self.inspector.is_running(pid) {
                return Err(GameCapError::ProcessExited { game: game() });
            }
            match self.inspector.main_window(pid) {
                WindowProbe::Ready(window) => break window,
                WindowProbe::Unsupported => {
                    tracing::debug!(pid, "Window probing unsupported; using display geometry");
                    return Ok(None);
                }
                WindowProbe::NotReady => {}
            }
            if deadline.expired() {
                return Err(GameCapError::WindowNotReady { game: game() });
            }
            std::thread::sleep(deadline.step(timeouts.window_poll()));
        };

        if !window.client.is_zero() {
            return Ok(Some(window));
        }

        // Created but not yet painted: one grace period, then one resample.
        tracing::debug!(pid, "Window has zero size; resampling after grace period");
        std::thread::sleep(timeouts.window_paint_grace());
        if !self.inspector.is_running(pid) {
            return Err(GameCapError::ProcessExited { game: game() });
        }
        match self.inspector.main_window(pid) {
            WindowProbe::Ready(window) if !window.client.is_zero() => Ok(Some(window)),
            _ => {
                tracing::info!(pid, "Window still unpainted; falling back to display geometry");
                Ok(None)
            }
        }
    }

    fn display_source(&self, monitor: Option<MonitorInfo>) -> GameCapResult<SourceGuard> {
        let mut settings = SourceSettings::display(monitor);
        settings.capture_cursor = true;
        SourceGuard::create(&self.engine, SourceKind::DisplayCapture, &settings)
    }

    /// Start the outputs the configured mode calls for. On failure any
    /// output already started is torn down.
    fn start_outputs(&self, game: &str) -> GameCapResult<(Vec<OutputKind>, Option<PathBuf>)> {
        let recording = &self.config.recording;
        let mut started = Vec::new();
        let mut path = None;

        let result = (|| -> GameCapResult<()> {
            if recording.mode.records_session() {
                let file = output::recording_path(&recording.output_dir, game, Local::now());
                if let Some(parent) = file.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        GameCapError::output_start(format!(
                            "Cannot create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                self.start_output(
                    OutputKind::Recording,
                    &OutputSettings {
                        path: Some(file.clone()),
                        directory: output::game_directory(&recording.output_dir, game),
                        encoder: recording.encoder.clone(),
                        bitrate_kbps: recording.bitrate_kbps,
                        buffer_seconds: 0,
                    },
                )?;
                started.push(OutputKind::Recording);
                path = Some(file);
            }
            if recording.mode.uses_buffer() {
                self.start_output(
                    OutputKind::ReplayBuffer,
                    &OutputSettings {
                        path: None,
                        directory: output::game_directory(&recording.output_dir, game),
                        encoder: recording.encoder.clone(),
                        bitrate_kbps: recording.bitrate_kbps,
                        buffer_seconds: recording.buffer_seconds_for(game),
                    },
                )?;
                started.push(OutputKind::ReplayBuffer);
            }
            Ok(())
        })();

        match result {
            Ok(()) => Ok((started, path)),
            Err(e) => {
                if !started.is_empty() {
                    self.engine.release_outputs();
                }
                Err(e)
            }
        }
    }

    fn start_output(&self, output: OutputKind, settings: &OutputSettings) -> GameCapResult<()> {
        match self.engine.start_output(output, settings) {
            Ok(true) => {
                tracing::info!(?output, "Output started");
                Ok(())
            }
            Ok(false) => Err(GameCapError::output_start(format!(
                "Engine declined to start {output:?} output"
            ))),
            Err(e @ GameCapError::OutputStart { .. }) => Err(e),
            Err(e) => Err(GameCapError::output_start(e.to_string())),
        }
    }

    fn set_phase(&self, phase: PreRecordingPhase, status: &str, game: &str) {
        let mut core = self.core.lock();
        core.state = OrchestratorState::PreRecording(phase);
        let status = PreRecordingStatus::new(status, game);
        core.pre = Some(status.clone());
        self.status.push(StatusUpdate::PreRecording(status));
    }

    fn commit(&self, prepared: Prepared) {
        let Prepared {
            session,
            clock,
            outputs,
            mut capture,
            hook_attempt,
            manual,
        } = prepared;

        let mut core = self.core.lock();
        if let Some(source) = hook_attempt {
            let attempt = self.next_attempt.fetch_add(1, Ordering::SeqCst);
            let budget = if manual {
                self.config.timeouts.hook_wait(true)
            } else {
                self.config.timeouts.hook_fallback()
            };
            let weak = self.weak.clone();
            let timer = match HookTimeoutTimer::arm(attempt, budget, move |attempt| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_hook_timeout(attempt);
                }
            }) {
                Ok(timer) => Some(timer),
                Err(e) => {
                    tracing::warn!(error = %e, "Hook timer unavailable; attempt never expires");
                    None
                }
            };
            capture.park_hook_attempt(source, attempt, timer);
        }

        tracing::info!(
            game = %session.game_name,
            session = session.id,
            capture = ?session.capture,
            hooked = session.hooked,
            "Recording started"
        );
        core.state = OrchestratorState::Recording;
        core.pre = None;
        core.transition = false;
        self.status.push(StatusUpdate::Session(session.clone()));
        core.active = Some(ActiveSession {
            session,
            clock,
            outputs,
            capture,
        });

        // A hook that landed while the start sequence ran is applied now.
        if let Some(info) = self.signals.hooked() {
            self.promote_hook(&mut core, &info);
        }
    }

    fn abort(&self, request: &StartRequest, error: &GameCapError) {
        let notice = match error {
            GameCapError::WindowNotReady { .. } => NoticeKind::WindowNotFound,
            GameCapError::ProcessExited { .. } => NoticeKind::ProcessExited,
            GameCapError::HookTimeout { .. } => NoticeKind::GameNotHooked,
            _ => NoticeKind::OutputStartFailed,
        };
        tracing::warn!(game = %request.game_name, error = %error, "Recording start aborted");

        let mut core = self.core.lock();
        core.state = OrchestratorState::Idle;
        core.pre = None;
        core.transition = false;
        core.ticket = None;
        self.hook_acquired.store(false, Ordering::SeqCst);
        self.status
            .push(StatusUpdate::notice(notice, error.to_string()));
        self.status.push(StatusUpdate::Idle);
    }

    fn stop(&self) -> GameCapResult<()> {
        let outputs = {
            let mut core = self.core.lock();
            let stoppable = core.state == OrchestratorState::Recording
                && !core.transition
                && core.active.is_some();
            if !stoppable {
                tracing::debug!(state = %core.state, "Stop requested with nothing to stop");
                return Ok(());
            }
            core.state = OrchestratorState::Stopping;
            core.transition = true;
            let mut outputs = Vec::new();
            if let Some(active) = core.active.as_mut() {
                active.session.state = SessionState::Stopping;
                active.capture.clear_pending();
                outputs = active.outputs.clone();
                self.status
                    .push(StatusUpdate::Session(active.session.clone()));
            }
            outputs
        };

        for output in outputs {
            self.signals.reset_stopped(output);
            self.engine.stop_output(output);
            if !self
                .signals
                .wait_stopped(output, self.config.timeouts.stop_wait())
            {
                tracing::warn!(
                    ?output,
                    error = %GameCapError::StopConfirmationTimeout,
                    "Forcing output stop"
                );
                self.engine.force_stop_output(output);
            }
        }

        let active = self.core.lock().active.take();
        self.engine.release_outputs();

        let Some(ActiveSession {
            mut session,
            capture,
            ..
        }) = active
        else {
            self.finish_idle();
            return Ok(());
        };
        drop(capture);

        session.state = SessionState::Finished;
        session.ended_at = Some(Utc::now());
        tracing::info!(
            game = %session.game_name,
            session = session.id,
            duration_secs = session.duration_secs(),
            "Recording stopped"
        );

        if let Some(path) = session.output_path.as_deref() {
            catalog(
                self.content.as_ref(),
                path,
                ContentKind::Session,
                &session.game_name,
                Some(&session.bookmarks),
                Some(session.started_at),
            );
        }

        self.status.push(StatusUpdate::Session(session));
        self.finish_idle();
        Ok(())
    }

    fn finish_idle(&self) {
        let mut core = self.core.lock();
        core.state = OrchestratorState::Idle;
        core.transition = false;
        core.pre = None;
        core.ticket = None;
        self.hook_acquired.store(false, Ordering::SeqCst);
        self.status.push(StatusUpdate::Idle);
    }

    fn bookmark(&self, label: Option<String>, auto: bool) -> bool {
        let mut core = self.core.lock();
        if core.state != OrchestratorState::Recording {
            return false;
        }
        let Some(active) = core.active.as_mut() else {
            return false;
        };
        let bookmark = Bookmark {
            offset_secs: active.clock.elapsed_secs(),
            created_at: Utc::now(),
            label,
            auto,
        };
        tracing::debug!(offset_secs = bookmark.offset_secs, auto, "Bookmark added");
        active.session.bookmarks.push(bookmark);
        self.status
            .push(StatusUpdate::Session(active.session.clone()));
        true
    }

    fn on_signal(&self, signal: EngineSignal) {
        self.signals.record(&signal);
        match signal {
            EngineSignal::Hooked(info) => {
                let mut core = self.core.lock();
                if core.state == OrchestratorState::Recording && !core.transition {
                    self.promote_hook(&mut core, &info);
                }
            }
            EngineSignal::Unhooked => {
                self.hook_acquired.store(false, Ordering::SeqCst);
                let mut core = self.core.lock();
                if let Some(active) = core.active.as_mut() {
                    if active.session.hooked {
                        tracing::info!(game = %active.session.game_name, "Game unhooked; recording continues");
                        active.session.hooked = false;
                        self.status
                            .push(StatusUpdate::Session(active.session.clone()));
                    }
                }
            }
            EngineSignal::Stopped { .. } | EngineSignal::Saved { .. } => {}
        }
    }

    /// Apply a hook report to the active session: swap in the parked
    /// attempt if there is one, or re-mark an already hooked source.
    fn promote_hook(&self, core: &mut Core, info: &HookInfo) {
        let Some(active) = core.active.as_mut() else {
            return;
        };
        let promoted = match active.capture.promote_pending() {
            Ok(promoted) => promoted,
            Err(e) => {
                tracing::warn!(error = %e, "Hooked source could not be bound; keeping display capture");
                return;
            }
        };
        if !promoted && active.capture.kind() != Some(CaptureKind::Hooked) {
            return;
        }

        self.hook_acquired.store(true, Ordering::SeqCst);
        let session = &mut active.session;
        session.capture = CaptureKind::Hooked;
        apply_hook_report(session, info);
        tracing::info!(
            game = %session.game_name,
            executable = %session.executable,
            promoted,
            "Game hooked"
        );
        self.status.push(StatusUpdate::Session(session.clone()));
        if promoted {
            self.status.push(StatusUpdate::notice(
                NoticeKind::HookUpdated,
                format!("Updated game hook for {}", session.game_name),
            ));
        }
    }

    fn on_hook_timeout(&self, attempt: u64) {
        let mut core = self.core.lock();
        let Some(active) = core.active.as_mut() else {
            return;
        };
        if !active.capture.drop_pending(attempt) {
            return;
        }
        tracing::info!(
            game = %active.session.game_name,
            attempt,
            "Game did not hook; continuing on display capture"
        );
        self.status.push(StatusUpdate::notice(
            NoticeKind::GameNotHooked,
            format!(
                "{} did not hook; recording the display instead",
                active.session.game_name
            ),
        ));
    }
}

/// Take the executable from a hook report. When the hooked process is not
/// the one requested (a launcher handing off to the real game), the window
/// title becomes the game name.
fn apply_hook_report(session: &mut RecordingSession, info: &HookInfo) {
    session.hooked = true;
    session.capture = CaptureKind::Hooked;
    if info.executable.is_empty() {
        return;
    }
    if !info.executable.eq_ignore_ascii_case(&session.executable) && !info.title.is_empty() {
        session.game_name = info.title.clone();
    }
    session.executable = info.executable.clone();
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Sources are released by their guards; outputs need an explicit call.
        if self.core.get_mut().active.is_some() {
            self.engine.release_outputs();
        }
    }
}
