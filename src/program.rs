//! Symbolic programs: the YAML list of instruction records fed to the assembler.
//!
//! ```yaml
//! - command: load
//!   constant: 5
//!   address: 0
//! - command: write
//!   value_reg: 0
//!   address_reg: 2
//!   offset: 100
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::isa::Instruction;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("cannot read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid program: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Parse a YAML sequence of instruction records.
///
/// An empty document is an empty program.
pub fn parse_program(source: &str) -> Result<Vec<Instruction>, ProgramError> {
    if source.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(source)?)
}

pub fn load_program(path: &Path) -> Result<Vec<Instruction>, ProgramError> {
    let source = fs::read_to_string(path).map_err(|source| ProgramError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&source)
}
