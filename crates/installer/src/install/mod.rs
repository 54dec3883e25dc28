//! Installation module
//!
//! This module classifies archive file lists into mod archetypes and turns
//! them into ordered placement instructions for the host's installer.

pub mod archetypes;
pub mod builder;
pub mod directives;
pub mod error;
pub mod matcher;
pub mod staging;

// Re-export commonly used types
pub use archetypes::{ArchetypeKind, ArchetypeRegistry, InstallPlan};
pub use builder::{BuildContext, DestinationRule};
pub use directives::Instruction;
pub use error::InstallError;
pub use staging::{FsStagingReader, StagingReader};
