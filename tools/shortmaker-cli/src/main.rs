//! ShortMaker CLI: render vertical shorts from long videos.
//!
//! Usage:
//!   shortmaker render <VIDEO> --start T --end T   Render one clip
//!   shortmaker batch <VIDEO> <RESPONSE_JSON>      Render every clip in a response
//!   shortmaker check                              Check encoder and font setup

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shortmaker_common::config::AppConfig;

mod commands;
mod report;

#[derive(Parser)]
#[command(
    name = "shortmaker",
    about = "Turn long videos into vertical shorts",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/shortmaker/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the rendering commands.
#[derive(Args, Debug, Clone)]
pub struct RenderOptions {
    /// Subtitle file to burn in
    #[arg(long)]
    srt: Option<PathBuf>,

    /// Output directory (overrides the configured one)
    #[arg(short = 'd', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Cut silent stretches out of each clip
    #[arg(long)]
    remove_silence: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single clip
    Render {
        /// Source video
        video: PathBuf,

        /// Clip start (HH:MM:SS, MM:SS or seconds)
        #[arg(long)]
        start: String,

        /// Clip end (HH:MM:SS, MM:SS or seconds)
        #[arg(long)]
        end: String,

        /// Title drawn on the short and used for the file name
        #[arg(long, default_value = "clip")]
        title: String,

        #[command(flatten)]
        options: RenderOptions,
    },

    /// Render every clip in a clip-selection response
    Batch {
        /// Source video
        video: PathBuf,

        /// JSON response listing the clips
        response: PathBuf,

        #[command(flatten)]
        options: RenderOptions,
    },

    /// Check ffmpeg, hardware encoding and fonts
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    shortmaker_common::logging::init_cli_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::Render {
            video,
            start,
            end,
            title,
            options,
        } => commands::render::run(&config, video, start, end, title, options),
        Commands::Batch {
            video,
            response,
            options,
        } => commands::batch::run(&config, video, response, options),
        Commands::Check => commands::check::run(&config),
    }
}
