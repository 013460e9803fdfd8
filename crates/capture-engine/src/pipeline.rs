//! GStreamer pipeline construction for display capture.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use gamecap_common::error::{GameCapError, GameCapResult};
use gamecap_platform_core::{ClientSize, MonitorInfo};
use gst::prelude::*;
use gstreamer as gst;

/// Trait for a media capture pipeline.
pub trait CapturePipeline: Send {
    /// Start the pipeline.
    fn start(&mut self) -> GameCapResult<()>;

    /// Drain encoders and finalize output, waiting at most `drain` for EOS.
    fn stop(&mut self, drain: Duration) -> GameCapResult<()>;

    /// Tear down immediately; the file tail may be lost.
    fn force_stop(&mut self);

    /// Check if the pipeline is currently running.
    fn is_running(&self) -> bool;
}

pub struct GstCapturePipeline {
    name: String,
    pipeline: gst::Pipeline,
    running: Arc<AtomicBool>,
}

impl GstCapturePipeline {
    pub fn from_launch(name: impl Into<String>, launch: &str) -> GameCapResult<Self> {
        init_gstreamer()?;

        let element = gst::parse::launch(launch)
            .map_err(|e| GameCapError::capture(format!("Failed to build pipeline: {e}")))?;

        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| GameCapError::capture("Launch string did not produce a pipeline"))?;

        Ok(Self {
            name: name.into(),
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl CapturePipeline for GstCapturePipeline {
    fn start(&mut self) -> GameCapResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            GameCapError::output_start(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;

        // State changes are async; wait until the source has actually opened.
        match self.pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                return Err(GameCapError::output_start(format!(
                    "{} pipeline failed to reach Playing state: {e:?}",
                    self.name
                )));
            }
        }

        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self, drain: Duration) -> GameCapResult<()> {
        // EOS first so the muxer writes its index; skipping it truncates the file.
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            tracing::warn!(pipeline = %self.name, "Failed to send EOS event; output may be truncated");
        } else if let Some(bus) = self.pipeline.bus() {
            let start = std::time::Instant::now();
            loop {
                let elapsed = start.elapsed();
                if elapsed >= drain {
                    tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                    break;
                }
                let remaining = gst::ClockTime::from_nseconds((drain - elapsed).as_nanos() as u64);
                match bus.timed_pop(remaining) {
                    Some(msg) => match msg.view() {
                        gst::MessageView::Eos(_) => {
                            tracing::debug!(pipeline = %self.name, "EOS received; pipeline drained");
                            break;
                        }
                        gst::MessageView::Error(e) => {
                            tracing::warn!(
                                pipeline = %self.name,
                                error = %e.error(),
                                "Pipeline error during EOS drain"
                            );
                            break;
                        }
                        _ => {}
                    },
                    None => {
                        tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                        break;
                    }
                }
            }
        }

        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            GameCapError::capture(format!("Failed to stop {} pipeline: {e:?}", self.name))
        })?;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn force_stop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Force stop failed");
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Parameters for an X11 display recording.
#[derive(Debug, Clone)]
pub struct DisplayPipelineConfig<'a> {
    pub output_path: &'a Path,
    pub monitor: Option<&'a MonitorInfo>,
    pub output_size: ClientSize,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub capture_cursor: bool,
}

pub fn build_display_pipeline(
    config: &DisplayPipelineConfig<'_>,
) -> GameCapResult<Box<dyn CapturePipeline>> {
    let path = escape_path(config.output_path);
    let show_pointer = if config.capture_cursor { "true" } else { "false" };
    let region = x11_capture_region_fragment(
        config
            .monitor
            .map(|m| (m.x, m.y, m.width, m.height)),
    )?;
    let scale = scale_fragment(config.output_size);
    let fps = config.fps.max(1);
    let keyint = fps.saturating_mul(2).max(2);
    let bitrate = config.bitrate_kbps.max(500);
    // The leaky queue keeps an encoder stall from backing up into ximagesrc.
    let launch = format!(
        "ximagesrc use-damage=false show-pointer={show_pointer}{region} ! queue max-size-buffers=200 leaky=downstream ! videoconvert ! videorate ! video/x-raw,framerate={fps}/1{scale} ! queue max-size-buffers=8 ! x264enc tune=zerolatency speed-preset=veryfast bitrate={bitrate} key-int-max={keyint} ! h264parse ! queue max-size-buffers=8 ! matroskamux ! filesink location=\"{path}\""
    );
    Ok(Box::new(GstCapturePipeline::from_launch(
        "display-x11",
        &launch,
    )?))
}

fn scale_fragment(output: ClientSize) -> String {
    if output.is_zero() {
        return String::new();
    }
    format!(
        " ! videoscale ! video/x-raw,width={},height={}",
        output.width, output.height
    )
}

fn x11_capture_region_fragment(
    capture_region: Option<(i32, i32, u32, u32)>,
) -> GameCapResult<String> {
    let Some((x, y, width, height)) = capture_region else {
        return Ok(String::new());
    };

    if width == 0 || height == 0 {
        return Err(GameCapError::capture(format!(
            "Invalid X11 capture region {width}x{height} at ({x},{y})"
        )));
    }

    let width_i32 = i32::try_from(width)
        .map_err(|_| GameCapError::capture(format!("X11 capture width too large: {width}")))?;
    let height_i32 = i32::try_from(height)
        .map_err(|_| GameCapError::capture(format!("X11 capture height too large: {height}")))?;

    let endx = x
        .checked_add(width_i32 - 1)
        .ok_or_else(|| GameCapError::capture("X11 capture region x-range overflow"))?;
    let endy = y
        .checked_add(height_i32 - 1)
        .ok_or_else(|| GameCapError::capture("X11 capture region y-range overflow"))?;

    Ok(format!(" startx={x} starty={y} endx={endx} endy={endy}"))
}

fn init_gstreamer() -> GameCapResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(GameCapError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x11_region_fragment_uses_inclusive_end_coordinates() {
        let fragment = x11_capture_region_fragment(Some((2560, 0, 2560, 1440))).unwrap();
        assert_eq!(
            fragment,
            " startx=2560 starty=0 endx=5119 endy=1439".to_string()
        );
    }

    #[test]
    fn x11_region_fragment_rejects_zero_size() {
        let err = x11_capture_region_fragment(Some((0, 0, 0, 1080))).unwrap_err();
        assert!(err.to_string().contains("Invalid X11 capture region"));
    }

    #[test]
    fn scale_is_skipped_for_native_geometry() {
        assert_eq!(scale_fragment(ClientSize::default()), "");
        assert_eq!(
            scale_fragment(ClientSize::new(1280, 720)),
            " ! videoscale ! video/x-raw,width=1280,height=720"
        );
    }

    #[test]
    fn escape_path_quotes() {
        assert_eq!(
            escape_path(Path::new("/v/\"quoted\".mkv")),
            "/v/\\\"quoted\\\".mkv"
        );
    }
}
