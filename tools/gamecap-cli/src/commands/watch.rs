//! Watch for game launches and record automatically.

use std::sync::Arc;
use std::time::Duration;

use gamecap_common::config::AppConfig;
use gamecap_game_detect::{GameClassifier, GameProcessMonitor, ProcessPathResolver, RecordingControl};
use gamecap_platform_linux::{ProcCmdlineQuery, ProcExeQuery, ProcScanner};

use super::{build_recorder, spawn_status_printer};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Watching for games");
    println!("  Output: {}", config.recording.output_dir.display());
    println!("  Mode: {:?}", config.recording.mode);
    println!("  Display fallback: {}", config.recording.display_fallback);
    println!();

    let recorder = build_recorder(&config);
    spawn_status_printer(recorder.status);

    let control: Arc<dyn RecordingControl> = Arc::new(recorder.orchestrator.clone());
    let monitor = GameProcessMonitor::new(
        ProcessPathResolver::new(Box::new(ProcExeQuery::new()), Box::new(ProcCmdlineQuery::new())),
        GameClassifier::from_config(&config.detection),
        recorder.inspector,
        control,
        &config.detection,
    );
    monitor.start(Box::new(ProcScanner::new(Duration::from_millis(
        config.detection.scan_interval_ms,
    ))))?;

    println!("Press Ctrl+C to stop watching...");
    tokio::signal::ctrl_c().await?;
    println!();

    monitor.stop().await;
    let orchestrator = recorder.orchestrator;
    tokio::task::spawn_blocking(move || orchestrator.shutdown()).await?;
    Ok(())
}
