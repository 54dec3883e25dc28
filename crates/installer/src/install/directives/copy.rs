//! Copy directive implementation
//!
//! Places a file from the archive at a destination relative to the game root.

use serde::{Deserialize, Serialize};

/// Copy a file out of the extracted archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyDirective {
    /// Path inside the archive
    pub source: String,
    /// Destination path relative to the mod root
    pub destination: String,
}

impl CopyDirective {
    pub fn new<S: Into<String>, D: Into<String>>(source: S, destination: D) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}
