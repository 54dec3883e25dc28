//! Installation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while classifying content or synthesizing instructions
#[derive(Debug, Error)]
pub enum InstallError {
    /// No archetype accepted the file list for this game
    #[error("Unsupported content for game '{game_id}'")]
    Unsupported { game_id: String },

    /// An archetype's test passed but its builder found no anchor file.
    /// Test and build disagree, which is a defect in the archetype table.
    #[error("Archetype '{archetype}' matched but no anchor file was found")]
    MissingAnchor { archetype: &'static str },

    #[error("Failed to read staged file '{path}'")]
    StagingRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Staged file '{path}' is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },
}

impl InstallError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::Unsupported { .. } => "unsupported",
            InstallError::MissingAnchor { .. } => "missing_anchor",
            InstallError::StagingRead { .. } => "staging_read",
            InstallError::InvalidUtf8 { .. } => "invalid_utf8",
        }
    }

    /// Whether the caller should surface this to the user as "unsupported content"
    pub fn is_unsupported(&self) -> bool {
        matches!(self, InstallError::Unsupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
