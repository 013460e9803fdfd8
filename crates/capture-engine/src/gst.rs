//! GStreamer-backed capture engine.
//!
//! Linux has no process-hooking capture, so this engine only offers display
//! capture and file recording. Game capture and the replay buffer report
//! `Unsupported`, which the recorder treats like any other engine refusal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gamecap_common::error::{GameCapError, GameCapResult};
use parking_lot::Mutex;

use crate::engine::{
    CaptureEngine, EngineSignal, OutputKind, OutputSettings, SignalListener, Slot, SourceHandle,
    SourceKind, SourceSettings, VideoGeometry,
};
use crate::pipeline::{build_display_pipeline, CapturePipeline, DisplayPipelineConfig};

/// How long a graceful stop waits for the muxer to finalize.
const EOS_DRAIN: Duration = Duration::from_secs(10);

#[derive(Default)]
struct GstState {
    listener: Option<SignalListener>,
    geometry: Option<VideoGeometry>,
    sources: HashMap<SourceHandle, SourceSettings>,
    bound: Option<SourceHandle>,
    recording: Option<Box<dyn CapturePipeline>>,
    next_handle: u64,
}

pub struct GstCaptureEngine {
    state: Arc<Mutex<GstState>>,
}

impl GstCaptureEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GstState::default())),
        }
    }
}

impl Default for GstCaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(listener: &Option<SignalListener>, signal: EngineSignal) {
    if let Some(listener) = listener {
        listener(signal);
    }
}

impl CaptureEngine for GstCaptureEngine {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn set_signal_listener(&self, listener: SignalListener) {
        self.state.lock().listener = Some(listener);
    }

    fn reset_video(&self, geometry: &VideoGeometry) -> GameCapResult<()> {
        let mut state = self.state.lock();
        if state.recording.is_some() {
            return Err(GameCapError::capture(
                "Cannot reset video while a recording is active",
            ));
        }
        tracing::debug!(
            base = %geometry.base,
            output = %geometry.output,
            fps = geometry.fps,
            "Video geometry reset"
        );
        state.geometry = Some(*geometry);
        Ok(())
    }

    fn create_source(
        &self,
        kind: SourceKind,
        settings: &SourceSettings,
    ) -> GameCapResult<SourceHandle> {
        if kind == SourceKind::GameCapture {
            return Err(GameCapError::unsupported(
                "Game capture hooking is not available with the GStreamer engine",
            ));
        }
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = SourceHandle(state.next_handle);
        state.sources.insert(handle, settings.clone());
        Ok(handle)
    }

    fn bind_source(&self, slot: Slot, source: Option<SourceHandle>) -> GameCapResult<()> {
        if slot != Slot::PRIMARY_VIDEO {
            return Err(GameCapError::capture(format!("Unknown slot {}", slot.0)));
        }
        let mut state = self.state.lock();
        if let Some(handle) = source {
            if !state.sources.contains_key(&handle) {
                return Err(GameCapError::capture(format!(
                    "Unknown source handle {}",
                    handle.0
                )));
            }
        }
        state.bound = source;
        Ok(())
    }

    fn release_source(&self, source: SourceHandle) {
        let mut state = self.state.lock();
        state.sources.remove(&source);
        if state.bound == Some(source) {
            state.bound = None;
        }
    }

    fn start_output(&self, output: OutputKind, settings: &OutputSettings) -> GameCapResult<bool> {
        if output == OutputKind::ReplayBuffer {
            return Err(GameCapError::unsupported(
                "Replay buffer is not available with the GStreamer engine",
            ));
        }

        let mut state = self.state.lock();
        if state.recording.is_some() {
            return Ok(false);
        }
        let Some(source) = state.bound.and_then(|h| state.sources.get(&h)) else {
            return Err(GameCapError::output_start("No source bound to the video slot"));
        };
        let Some(path) = settings.path.as_deref() else {
            return Err(GameCapError::output_start("Recording output needs a file path"));
        };
        let geometry = state.geometry.ok_or_else(|| {
            GameCapError::output_start("Video geometry was never configured")
        })?;

        let mut pipeline = build_display_pipeline(&DisplayPipelineConfig {
            output_path: path,
            monitor: source.monitor.as_ref(),
            output_size: geometry.output,
            fps: geometry.fps,
            bitrate_kbps: settings.bitrate_kbps,
            capture_cursor: source.capture_cursor,
        })?;
        pipeline.start()?;
        tracing::info!(path = %path.display(), encoder = %settings.encoder, "Recording output started");
        state.recording = Some(pipeline);
        Ok(true)
    }

    fn stop_output(&self, output: OutputKind) {
        let (pipeline, listener) = {
            let mut state = self.state.lock();
            let pipeline = match output {
                OutputKind::Recording => state.recording.take(),
                OutputKind::ReplayBuffer => None,
            };
            (pipeline, state.listener.clone())
        };

        // Confirmation always arrives off the caller's thread. Draining blocks
        // for up to EOS_DRAIN.
        let spawned = std::thread::Builder::new()
            .name("gamecap-gst-stop".to_string())
            .spawn(move || {
                if let Some(mut pipeline) = pipeline {
                    if let Err(e) = pipeline.stop(EOS_DRAIN) {
                        tracing::warn!(error = %e, "Pipeline stop reported an error");
                    }
                }
                emit(&listener, EngineSignal::Stopped { output });
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn pipeline stop thread");
        }
    }

    fn force_stop_output(&self, output: OutputKind) {
        let pipeline = match output {
            OutputKind::Recording => self.state.lock().recording.take(),
            OutputKind::ReplayBuffer => None,
        };
        if let Some(mut pipeline) = pipeline {
            pipeline.force_stop();
        }
    }

    fn output_active(&self, output: OutputKind) -> bool {
        match output {
            OutputKind::Recording => self
                .state
                .lock()
                .recording
                .as_ref()
                .is_some_and(|p| p.is_running()),
            OutputKind::ReplayBuffer => false,
        }
    }

    fn release_outputs(&self) {
        self.force_stop_output(OutputKind::Recording);
    }

    fn save_replay_buffer(&self) -> GameCapResult<()> {
        Err(GameCapError::unsupported(
            "Replay buffer is not available with the GStreamer engine",
        ))
    }

    fn last_replay_path(&self) -> Option<PathBuf> {
        None
    }
}

impl Drop for GstCaptureEngine {
    fn drop(&mut self) {
        self.release_outputs();
    }
}
