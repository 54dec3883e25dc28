//! GenerateFile directive implementation
//!
//! Writes synthesized content instead of copying an archive entry.

use serde::{Deserialize, Serialize};

/// Write the given content to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateFileDirective {
    /// Full file content to write
    pub data: String,
    /// Destination path relative to the mod root
    pub destination: String,
}

impl GenerateFileDirective {
    pub fn new<S: Into<String>, D: Into<String>>(data: S, destination: D) -> Self {
        Self {
            data: data.into(),
            destination: destination.into(),
        }
    }
}
