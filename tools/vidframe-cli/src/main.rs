//! Vidframe CLI — frame a screen recording and export it.
//!
//! Usage:
//!   vidframe export <VIDEO>     Export a framed video
//!   vidframe snapshot <VIDEO>   Render one framed still to PNG
//!   vidframe info <VIDEO>       Show video metadata and resolved geometry
//!   vidframe check              Check ffmpeg and capture codecs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vidframe_common::config::AppConfig;

mod commands;
mod style;

#[derive(Parser)]
#[command(
    name = "vidframe",
    about = "Frame screen recordings with padding, rounded corners, shadow and a gradient",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a framed video
    Export {
        /// Path to the source video
        video: PathBuf,

        /// Quality tier: 720p|1080p|1440p
        #[arg(short, long)]
        quality: Option<String>,

        /// Delivery format: webm|mp4
        #[arg(short, long)]
        format: Option<String>,

        /// JSON file with frame and gradient settings
        #[arg(short, long)]
        style: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render one framed frame to PNG
    Snapshot {
        /// Path to the source video
        video: PathBuf,

        /// Position in seconds
        #[arg(long, default_value = "0.0")]
        at: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Quality tier: 720p|1080p|1440p
        #[arg(short, long)]
        quality: Option<String>,

        /// JSON file with frame and gradient settings
        #[arg(short, long)]
        style: Option<PathBuf>,
    },

    /// Show video metadata and resolved geometry
    Info {
        /// Path to the source video
        video: PathBuf,

        /// JSON file with frame and gradient settings
        #[arg(short, long)]
        style: Option<PathBuf>,
    },

    /// Check ffmpeg availability and capture codecs
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    vidframe_common::logging::init_logging(&config.logging);
    tracing::debug!(output_dir = %config.output_dir.display(), "Loaded configuration");

    match cli.command {
        Commands::Export {
            video,
            quality,
            format,
            style,
            output,
        } => commands::export::run(&config, video, quality, format, style, output).await,
        Commands::Snapshot {
            video,
            at,
            output,
            quality,
            style,
        } => commands::snapshot::run(&config, video, at, output, quality, style).await,
        Commands::Info { video, style } => commands::info::run(&config, video, style).await,
        Commands::Check => commands::check::run(&config).await,
    }
}
