//! GameCap CLI: detect games and record them.
//!
//! Usage:
//!   gamecap watch              Record games automatically as they launch
//!   gamecap record <EXE>       Record a game right now
//!   gamecap classify <PATH>    Show how an executable path is classified
//!   gamecap resolve <PID>      Resolve a process's executable path
//!   gamecap check              Check system capabilities
//!   gamecap config             Show or initialize the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gamecap_common::config::{AppConfig, RecordingMode};

mod commands;

#[derive(Parser)]
#[command(
    name = "gamecap",
    about = "Automatic game recording with replay buffer",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Session,
    Buffer,
    Hybrid,
}

impl From<ModeArg> for RecordingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Session => RecordingMode::Session,
            ModeArg::Buffer => RecordingMode::Buffer,
            ModeArg::Hybrid => RecordingMode::Hybrid,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for game launches and record them until Ctrl+C
    Watch {
        /// Override the configured recording mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Record the display at once and switch to the hooked window later
        #[arg(long)]
        display_fallback: bool,
    },

    /// Start recording a game immediately
    Record {
        /// Path to the game executable
        executable: PathBuf,

        /// Display name (defaults to the classified name)
        #[arg(short, long)]
        name: Option<String>,

        /// Process id, if already known
        #[arg(long)]
        pid: Option<u32>,

        /// Override the configured recording mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify an executable path as game or not
    Classify {
        /// Executable path
        path: PathBuf,
    },

    /// Resolve the executable path of a running process
    Resolve {
        /// Process id
        pid: u32,
    },

    /// Check system capabilities
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(gamecap_common::config::config_file_path);
    let mut config = AppConfig::load_from(&config_path);
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    gamecap_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Watch {
            mode,
            display_fallback,
        } => {
            if let Some(mode) = mode {
                config.recording.mode = mode.into();
            }
            config.recording.display_fallback |= display_fallback;
            commands::watch::run(config).await
        }
        Commands::Record {
            executable,
            name,
            pid,
            mode,
            output,
        } => {
            if let Some(mode) = mode {
                config.recording.mode = mode.into();
            }
            if let Some(output) = output {
                config.recording.output_dir = output;
            }
            commands::record::run(config, executable, name, pid).await
        }
        Commands::Classify { path } => commands::classify::run(&config, path),
        Commands::Resolve { pid } => commands::resolve::run(&config, pid),
        Commands::Check => commands::check::run(),
        Commands::Config { init } => commands::config::run(&config, &config_path, init),
    }
}
