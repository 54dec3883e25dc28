//! SetModType directive implementation

use serde::{Deserialize, Serialize};

/// Mark the produced mod as belonging to a mod type. Empty means the default type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetModTypeDirective {
    pub value: String,
}

impl SetModTypeDirective {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self { value: value.into() }
    }

    /// The default (untyped) mod type
    pub fn default_type() -> Self {
        Self::new("")
    }
}
