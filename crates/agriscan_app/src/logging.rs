//! Logging initialization for the `agriscan` binary.
//!
//! Logs go to `<data-dir>/agriscan.log`, and to the terminal in verbose mode.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub const LOG_FILENAME: &str = "agriscan.log";

/// Destination for log output.
pub enum LogDestination {
    /// Append to the log file in the data directory.
    File,
    /// Write to both the log file and stderr.
    Both,
}

impl LogDestination {
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            Self::Both
        } else {
            Self::File
        }
    }
}

pub fn initialize(destination: LogDestination, level: LevelFilter, data_dir: &Path) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if let LogDestination::Both = destination {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    // The file keeps a full record even in quiet mode.
    if let Some(file_logger) = create_file_logger(level.max(LevelFilter::Info), config, data_dir) {
        loggers.push(file_logger);
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    data_dir: &Path,
) -> Option<Box<WriteLogger<File>>> {
    let log_path = data_dir.join(LOG_FILENAME);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", log_path, err);
            None
        }
    }
}
