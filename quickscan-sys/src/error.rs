// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use thiserror::Error;

/// Error types for host discovery operations
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to start {command}: {reason}")]
    CommandSpawn { command: String, reason: String },

    #[error("{command} failed with rc={code}: {stderr}")]
    ExternalTool {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("unable to parse {source_name} output: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("invalid configuration {path:?}: {reason}")]
    Config { path: Option<PathBuf>, reason: String },
}

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, ScanError>;
