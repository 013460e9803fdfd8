//! Record a game right now.

use std::path::PathBuf;

use gamecap_common::config::AppConfig;
use gamecap_game_detect::{GameClassifier, StartRequest};

use super::{build_recorder, spawn_status_printer};

pub async fn run(
    config: AppConfig,
    executable: PathBuf,
    name: Option<String>,
    pid: Option<u32>,
) -> anyhow::Result<()> {
    let game_name = name.unwrap_or_else(|| {
        GameClassifier::from_config(&config.detection)
            .classify(&executable)
            .display_name
    });
    println!("Recording {game_name}");
    println!("  Executable: {}", executable.display());
    println!("  Output: {}", config.recording.output_dir.display());
    println!("  Mode: {:?}", config.recording.mode);
    println!();

    let recorder = build_recorder(&config);
    spawn_status_printer(recorder.status);

    let request = StartRequest {
        game_name,
        executable,
        pid,
        manual: true,
    };
    let orchestrator = recorder.orchestrator.clone();
    tokio::task::spawn_blocking(move || orchestrator.start_recording(request)).await??;

    println!("Press Ctrl+C to stop recording...");
    tokio::signal::ctrl_c().await?;
    println!();

    let orchestrator = recorder.orchestrator;
    tokio::task::spawn_blocking(move || {
        let result = orchestrator.stop_recording();
        orchestrator.shutdown();
        result
    })
    .await??;
    Ok(())
}
