//! Rampcut CLI: plan and export speed-ramped clips.
//!
//! Usage:
//!   rampcut export [SOURCE] [OPTIONS]   Export a trimmed, speed-ramped clip
//!   rampcut plan [SOURCE] [OPTIONS]     Show segments, tempo chains and ffmpeg args
//!   rampcut check                       Check capture and transcoding support
//!   rampcut recent                      List archived recent clips
//!   rampcut init <SOURCE>               Write a starter edit session

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rampcut_common::PathPolicy;

mod commands;

use commands::edit::EditArgs;

#[derive(Parser)]
#[command(
    name = "rampcut",
    about = "Trim, speed-ramp and export video clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PathArg {
    Auto,
    Capture,
    Transcode,
}

impl From<PathArg> for PathPolicy {
    fn from(arg: PathArg) -> Self {
        match arg {
            PathArg::Auto => PathPolicy::Auto,
            PathArg::Capture => PathPolicy::Capture,
            PathArg::Transcode => PathPolicy::Transcode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a trimmed, speed-ramped clip
    Export {
        #[command(flatten)]
        edit: EditArgs,

        /// Execution path (defaults to the configured policy)
        #[arg(long, value_enum)]
        path: Option<PathArg>,

        /// Directory for the delivered file (defaults to the configured exports dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not add the source to the recent-clips archive
        #[arg(long)]
        no_archive: bool,
    },

    /// Print the export plan without running it
    Plan {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Check capture and transcoding support
    Check,

    /// List archived recent clips
    Recent,

    /// Write a starter edit session for a source clip
    Init {
        /// Source video
        source: PathBuf,

        /// Session file to write
        #[arg(short, long, default_value = "edit.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = rampcut_common::AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    rampcut_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export {
            edit,
            path,
            output_dir,
            no_archive,
        } => {
            if let Some(path) = path {
                config.export.path_policy = path.into();
            }
            if let Some(dir) = output_dir {
                config.exports_dir = dir;
            }
            if no_archive {
                config.archive.enabled = false;
            }
            commands::export::run(edit, config).await
        }
        Commands::Plan { edit } => commands::plan::run(edit, config).await,
        Commands::Check => commands::check::run(config).await,
        Commands::Recent => commands::recent::run(config).await,
        Commands::Init { source, output } => commands::init::run(source, output),
    }
}
