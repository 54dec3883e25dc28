//! Installation directive implementations
//!
//! Each directive type is defined in its own file. The [`Instruction`] enum
//! is the ordered unit handed to the host's installer executor, serialized
//! in its `{"type": ...}` wire shape.

use serde::{Deserialize, Serialize};

pub mod copy;
pub mod generate_file;
pub mod set_mod_type;

pub use copy::CopyDirective;
pub use generate_file::GenerateFileDirective;
pub use set_mod_type::SetModTypeDirective;

/// A single placement or transform action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instruction {
    Copy(CopyDirective),
    #[serde(rename = "generatefile")]
    GenerateFile(GenerateFileDirective),
    #[serde(rename = "setmodtype")]
    SetModType(SetModTypeDirective),
}

impl Instruction {
    pub fn copy<S: Into<String>, D: Into<String>>(source: S, destination: D) -> Self {
        Instruction::Copy(CopyDirective::new(source, destination))
    }

    pub fn generate_file<S: Into<String>, D: Into<String>>(data: S, destination: D) -> Self {
        Instruction::GenerateFile(GenerateFileDirective::new(data, destination))
    }

    pub fn set_mod_type<S: Into<String>>(value: S) -> Self {
        Instruction::SetModType(SetModTypeDirective::new(value))
    }

    /// Destination path, if this instruction writes a file
    pub fn destination(&self) -> Option<&str> {
        match self {
            Instruction::Copy(d) => Some(&d.destination),
            Instruction::GenerateFile(d) => Some(&d.destination),
            Instruction::SetModType(_) => None,
        }
    }

    /// Archive path read by this instruction, if any
    pub fn source(&self) -> Option<&str> {
        match self {
            Instruction::Copy(d) => Some(&d.source),
            _ => None,
        }
    }

    pub fn is_set_mod_type(&self) -> bool {
        matches!(self, Instruction::SetModType(_))
    }
}
