//! Show or write the configuration.

use std::path::Path;

use gamecap_common::config::AppConfig;

pub fn run(config: &AppConfig, path: &Path, init: bool) -> anyhow::Result<()> {
    if init {
        config.save_to(path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let state = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{state}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
