//! Subscriber setup for the binary.
//!
//! Stderr is reserved for the JSON error channel, so log lines go either to
//! stdout or to a dated file under the requested log directory.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::EnvFilter;

/// Log file for today under `logdir`: `segrecover_<YYYYMMDD>.log`.
pub fn log_file_path(logdir: &Path) -> PathBuf {
    logdir.join(format!("segrecover_{}.log", Local::now().format("%Y%m%d")))
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber.
pub fn init_logging(logdir: Option<&Path>, verbose: bool) -> Result<(), String> {
    let filter = env_filter(verbose);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match logdir {
        Some(dir) => {
            let file = open_log_file(dir)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| format!("Failed to install logger: {}", e))
        }
        None => builder
            .with_writer(std::io::stdout)
            .try_init()
            .map_err(|e| format!("Failed to install logger: {}", e)),
    }
}

fn open_log_file(dir: &Path) -> Result<File, String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
    let path = log_file_path(dir);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}
