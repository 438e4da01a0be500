//! End-to-end entry points: source text to bytes, and bytes to a finished machine.

use thiserror::Error;

use crate::assembler::{self, AssembleError, Assembly};
use crate::engine::{self, RunConfig, RunSummary};
use crate::isa::Isa;
use crate::machine::{LoadError, MachineState};
use crate::program::{self, ProgramError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Parse a YAML program and assemble it.
pub fn assemble_source(source: &str, isa: &Isa) -> Result<Assembly, PipelineError> {
    let program = program::parse_program(source)?;
    Ok(assembler::assemble(&program, isa)?)
}

/// A machine after [`execute`], with its run counters.
#[derive(Debug)]
pub struct Outcome {
    pub state: MachineState,
    pub summary: RunSummary,
}

/// Load `binary` at address 0 of a fresh machine and run it.
pub fn execute(binary: &[u8], isa: &Isa, config: &RunConfig) -> Result<Outcome, LoadError> {
    let mut state = MachineState::with_program(binary)?;
    let summary = engine::run(&mut state, isa, config);
    Ok(Outcome { state, summary })
}
