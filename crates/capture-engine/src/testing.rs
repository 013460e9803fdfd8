//! Scripted in-memory engine for exercising the recorder without GStreamer.
//!
//! Every call is logged, sources and bindings are tracked so tests can check
//! what is live, and signals are fired either by the test directly or from a
//! helper thread in response to `stop_output` / `save_replay_buffer`.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use gamecap_common::error::{GameCapError, GameCapResult};
use parking_lot::Mutex;

use crate::engine::{
    CaptureEngine, EngineSignal, OutputKind, OutputSettings, SignalListener, Slot, SourceHandle,
    SourceKind, SourceSettings, VideoGeometry,
};

/// How `start_output` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartBehavior {
    #[default]
    Accept,
    Decline,
    Fail,
}

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ResetVideo(VideoGeometry),
    CreateSource(SourceKind),
    Bind(Option<SourceHandle>),
    Release(SourceHandle),
    StartOutput(OutputKind, OutputSettings),
    StopOutput(OutputKind),
    ForceStop(OutputKind),
    ReleaseOutputs,
    SaveReplay,
}

struct Script {
    listener: Option<SignalListener>,
    next_handle: u64,
    sources: BTreeMap<SourceHandle, SourceKind>,
    bound: Option<SourceHandle>,
    active: HashSet<OutputKind>,
    calls: Vec<EngineCall>,
    start: StartBehavior,
    confirm_stop: bool,
    refuse_game_capture: bool,
    /// `Some(path)` answers a save with `Saved { path }`; `None` never answers.
    save_reply: Option<Option<PathBuf>>,
    last_replay: Option<PathBuf>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            listener: None,
            next_handle: 0,
            sources: BTreeMap::new(),
            bound: None,
            active: HashSet::new(),
            calls: Vec::new(),
            start: StartBehavior::Accept,
            confirm_stop: true,
            refuse_game_capture: false,
            save_reply: None,
            last_replay: None,
        }
    }
}

#[derive(Default)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_start_behavior(&self, behavior: StartBehavior) {
        self.script.lock().start = behavior;
    }

    /// Whether `stop_output` is answered with `Stopped`.
    pub fn set_confirm_stop(&self, confirm: bool) {
        self.script.lock().confirm_stop = confirm;
    }

    pub fn set_refuse_game_capture(&self, refuse: bool) {
        self.script.lock().refuse_game_capture = refuse;
    }

    pub fn set_save_reply(&self, reply: Option<Option<PathBuf>>) {
        self.script.lock().save_reply = reply;
    }

    pub fn set_last_replay(&self, path: Option<PathBuf>) {
        self.script.lock().last_replay = path;
    }

    /// Mark an output active without going through `start_output`.
    pub fn force_active(&self, output: OutputKind) {
        self.script.lock().active.insert(output);
    }

    /// Deliver a signal on the calling thread.
    pub fn emit(&self, signal: EngineSignal) {
        let listener = self.script.lock().listener.clone();
        if let Some(listener) = listener {
            listener(signal);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.script.lock().listener.is_some()
    }

    /// Sources created and not yet released.
    pub fn live_sources(&self) -> Vec<(SourceHandle, SourceKind)> {
        self.script
            .lock()
            .sources
            .iter()
            .map(|(h, k)| (*h, *k))
            .collect()
    }

    pub fn live_count(&self, kind: SourceKind) -> usize {
        self.script
            .lock()
            .sources
            .values()
            .filter(|k| **k == kind)
            .count()
    }

    /// Kind of the source bound to the primary slot.
    pub fn bound_kind(&self) -> Option<SourceKind> {
        let script = self.script.lock();
        script.bound.and_then(|h| script.sources.get(&h).copied())
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.script.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.script.lock().calls.iter().filter(|c| matches(c)).count()
    }

    /// Settings of the most recent successful `start_output` for `output`.
    pub fn started_with(&self, output: OutputKind) -> Option<OutputSettings> {
        self.script.lock().calls.iter().rev().find_map(|c| match c {
            EngineCall::StartOutput(o, settings) if *o == output => Some(settings.clone()),
            _ => None,
        })
    }

    fn reply_later(listener: Option<SignalListener>, signal: EngineSignal) {
        let Some(listener) = listener else {
            return;
        };
        let spawned = std::thread::Builder::new()
            .name("scripted-engine-signal".to_string())
            .spawn(move || listener(signal));
        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn scripted signal thread");
        }
    }
}

impl CaptureEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn set_signal_listener(&self, listener: SignalListener) {
        self.script.lock().listener = Some(listener);
    }

    fn reset_video(&self, geometry: &VideoGeometry) -> GameCapResult<()> {
        self.script
            .lock()
            .calls
            .push(EngineCall::ResetVideo(*geometry));
        Ok(())
    }

    fn create_source(
        &self,
        kind: SourceKind,
        _settings: &SourceSettings,
    ) -> GameCapResult<SourceHandle> {
        let mut script = self.script.lock();
        script.calls.push(EngineCall::CreateSource(kind));
        if kind == SourceKind::GameCapture && script.refuse_game_capture {
            return Err(GameCapError::unsupported("game capture refused by script"));
        }
        script.next_handle += 1;
        let handle = SourceHandle(script.next_handle);
        script.sources.insert(handle, kind);
        Ok(handle)
    }

    fn bind_source(&self, slot: Slot, source: Option<SourceHandle>) -> GameCapResult<()> {
        let mut script = self.script.lock();
        script.calls.push(EngineCall::Bind(source));
        if slot != Slot::PRIMARY_VIDEO {
            return Err(GameCapError::capture(format!("Unknown slot {}", slot.0)));
        }
        if let Some(handle) = source {
            if !script.sources.contains_key(&handle) {
                return Err(GameCapError::capture(format!(
                    "Unknown source handle {}",
                    handle.0
                )));
            }
        }
        script.bound = source;
        Ok(())
    }

    fn release_source(&self, source: SourceHandle) {
        let mut script = self.script.lock();
        script.calls.push(EngineCall::Release(source));
        script.sources.remove(&source);
        if script.bound == Some(source) {
            script.bound = None;
        }
    }

    fn start_output(&self, output: OutputKind, settings: &OutputSettings) -> GameCapResult<bool> {
        let mut script = self.script.lock();
        match script.start {
            StartBehavior::Accept => {
                script
                    .calls
                    .push(EngineCall::StartOutput(output, settings.clone()));
                script.active.insert(output);
                Ok(true)
            }
            StartBehavior::Decline => Ok(false),
            StartBehavior::Fail => Err(GameCapError::output_start("encoder refused by script")),
        }
    }

    fn stop_output(&self, output: OutputKind) {
        let listener = {
            let mut script = self.script.lock();
            script.calls.push(EngineCall::StopOutput(output));
            script.active.remove(&output);
            script.confirm_stop.then(|| script.listener.clone()).flatten()
        };
        Self::reply_later(listener, EngineSignal::Stopped { output });
    }

    fn force_stop_output(&self, output: OutputKind) {
        let mut script = self.script.lock();
        script.calls.push(EngineCall::ForceStop(output));
        script.active.remove(&output);
    }

    fn output_active(&self, output: OutputKind) -> bool {
        self.script.lock().active.contains(&output)
    }

    fn release_outputs(&self) {
        let mut script = self.script.lock();
        script.calls.push(EngineCall::ReleaseOutputs);
        script.active.clear();
    }

    fn save_replay_buffer(&self) -> GameCapResult<()> {
        let (listener, reply) = {
            let mut script = self.script.lock();
            script.calls.push(EngineCall::SaveReplay);
            if !script.active.contains(&OutputKind::ReplayBuffer) {
                return Err(GameCapError::capture("replay buffer is not active"));
            }
            let reply = script.save_reply.clone();
            if let Some(Some(path)) = &reply {
                script.last_replay = Some(path.clone());
            }
            (script.listener.clone(), reply)
        };
        if let Some(path) = reply {
            Self::reply_later(listener, EngineSignal::Saved { path });
        }
        Ok(())
    }

    fn last_replay_path(&self) -> Option<PathBuf> {
        self.script.lock().last_replay.clone()
    }
}
