pub mod check;
pub mod classify;
pub mod config;
pub mod record;
pub mod resolve;
pub mod watch;

use std::sync::Arc;

use gamecap_capture_engine::{CaptureEngine, GstCaptureEngine};
use gamecap_common::config::AppConfig;
use gamecap_platform_core::ProcessInspector;
use gamecap_platform_linux::ProcInspector;
use gamecap_recorder::{BroadcastStatusSink, FsContentSink, RecordingSessionOrchestrator};
use gamecap_session_model::StatusUpdate;
use tokio::sync::broadcast;

/// An orchestrator wired to the Linux platform and the GStreamer engine.
pub struct Recorder {
    pub orchestrator: RecordingSessionOrchestrator,
    pub inspector: Arc<dyn ProcessInspector>,
    pub status: broadcast::Receiver<StatusUpdate>,
}

pub fn build_recorder(config: &AppConfig) -> Recorder {
    let engine: Arc<dyn CaptureEngine> = Arc::new(GstCaptureEngine::new());
    let inspector: Arc<dyn ProcessInspector> = Arc::new(ProcInspector::new());
    let status = BroadcastStatusSink::new(256);
    let rx = status.subscribe();
    let orchestrator = RecordingSessionOrchestrator::new(
        engine,
        Arc::clone(&inspector),
        Arc::new(FsContentSink::new(&config.recording.output_dir)),
        Arc::new(status),
        config.clone(),
    );
    Recorder {
        orchestrator,
        inspector,
        status: rx,
    }
}

/// Print status updates until the channel closes.
pub fn spawn_status_printer(mut rx: broadcast::Receiver<StatusUpdate>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => print_status(&update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Status printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn print_status(update: &StatusUpdate) {
    match update {
        StatusUpdate::PreRecording(pre) => {
            println!("[{}] {}", pre.game_name, pre.status);
        }
        StatusUpdate::Session(session) => {
            let capture = if session.hooked { "hooked" } else { "display" };
            println!(
                "[{}] {:?} ({capture}, {:.1}s, {} bookmarks)",
                session.game_name,
                session.state,
                session.duration_secs(),
                session.bookmarks.len()
            );
            if let Some(path) = &session.output_path {
                println!("     -> {}", path.display());
            }
        }
        StatusUpdate::Idle => println!("Idle"),
        StatusUpdate::Notice { kind, message } => println!("[{kind:?}] {message}"),
    }
}
