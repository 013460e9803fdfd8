//! Resolve a process's executable path.

use gamecap_common::config::AppConfig;
use gamecap_game_detect::{GameClassifier, ProcessPathResolver};
use gamecap_platform_linux::{ProcCmdlineQuery, ProcExeQuery};

pub fn run(config: &AppConfig, pid: u32) -> anyhow::Result<()> {
    let resolver =
        ProcessPathResolver::new(Box::new(ProcExeQuery::new()), Box::new(ProcCmdlineQuery::new()));
    let path = resolver.resolve(pid)?;
    let classification = GameClassifier::from_config(&config.detection).classify(&path);

    println!("{pid}: {}", path.display());
    if classification.is_game {
        println!("  Game: {}", classification.display_name);
    }
    Ok(())
}
