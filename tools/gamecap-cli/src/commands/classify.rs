//! Show how a path is classified.

use std::path::PathBuf;

use gamecap_common::config::AppConfig;
use gamecap_game_detect::GameClassifier;

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let classifier = GameClassifier::from_config(&config.detection);
    let classification = classifier.classify(&path);

    println!("Path: {}", path.display());
    println!("  Game: {}", if classification.is_game { "yes" } else { "no" });
    println!("  Name: {}", classification.display_name);
    println!("  Library markers:");
    for marker in classifier.markers() {
        println!("    {} ({:?})", marker.segment, marker.manifests);
    }
    Ok(())
}
