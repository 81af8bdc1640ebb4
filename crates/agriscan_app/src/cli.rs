use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `agriscan` binary.
#[derive(Debug, Parser)]
#[command(name = "agriscan", version, about = "Crop disease and multispectral field analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to `<data-dir>/agriscan.ron`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the store, settings and log file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Backend root URL
    #[arg(long, global = true, env = "AGRISCAN_API_URL")]
    pub api_url: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging, also echoed to the terminal)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyse files: images go to disease detection, .txt/.zip bundles to multispectral analysis
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Send images through the multispectral job instead of disease detection
        #[arg(long)]
        multispectral: bool,

        /// Number of predictions requested for a single image
        #[arg(long)]
        top_k: Option<u32>,

        /// Print the finished result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Continue polling the job a previous run left unfinished
    Resume {
        /// Print the finished result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the unfinished job
    Cancel,
    /// Store the bearer token used for backend requests
    Login {
        #[arg(long)]
        token: String,
    },
    /// Remove the stored bearer token
    Logout,
    /// Show the stored token state and any unfinished job
    Status,
}
