//! Cumulus Logging Module
//!
//! Structured logging setup shared by the binaries.

mod logging;

pub use logging::{cleanup_old_logs, init_logging};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "Cumulus", "Cumulus")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features
pub fn init() -> anyhow::Result<()> {
    init_logging()
}
