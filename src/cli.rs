use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "boxcutter")]
#[command(author, version, about = "Extract H.264 elementary streams from MP4 files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the first video track as an Annex-B elementary stream
    Extract {
        /// MP4 file to read
        #[arg(required = true)]
        input: PathBuf,

        /// Output file (defaults to the input with a .h264 extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip samples with broken NAL units instead of failing
        #[arg(long)]
        best_effort: bool,
    },

    /// Show container and track information
    Info {
        /// MP4 file to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the box tree with offsets and sizes
    Tree {
        /// MP4 file to inspect
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
