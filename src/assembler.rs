use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::codec::{self, FieldRangeError};
use crate::isa::{Instruction, Isa};

/// Encoding failed for one instruction of a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("instruction {position} ({instruction}): {source}")]
pub struct AssembleError {
    /// 1-based position in the program.
    pub position: usize,
    pub instruction: Instruction,
    #[source]
    pub source: FieldRangeError,
}

/// One line of the intermediate representation: an instruction and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// 1-based position in the program.
    pub position: usize,
    pub instruction: Instruction,
    pub bytes: Vec<u8>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "instruction {}: {}",
            self.position,
            self.instruction.kind().mnemonic().to_uppercase()
        )?;
        let kind = self.instruction.kind();
        let fields: Vec<String> = kind
            .fields()
            .iter()
            .zip(self.instruction.operands())
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        writeln!(
            f,
            "  fields: opcode=0x{:02x}, {}",
            kind.opcode(),
            fields.join(", ")
        )?;
        write!(f, "  bytes:  {}", hex_list(&self.bytes))
    }
}

/// The encoded program together with its per-instruction trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub bytes: Vec<u8>,
    pub trace: Vec<TraceEntry>,
}

impl Assembly {
    pub fn instruction_count(&self) -> usize {
        self.trace.len()
    }
}

/// Encode every instruction of `program` in order.
///
/// The first instruction that fails to encode aborts the whole assembly; no
/// partial output is returned.
pub fn assemble(program: &[Instruction], isa: &Isa) -> Result<Assembly, AssembleError> {
    let mut assembly = Assembly::default();

    for (i, instruction) in program.iter().enumerate() {
        let position = i + 1;
        let bytes = codec::encode(instruction, isa).map_err(|source| AssembleError {
            position,
            instruction: *instruction,
            source,
        })?;
        debug!(position, %instruction, bytes = %hex_list(&bytes), "encoded");
        assembly.bytes.extend_from_slice(&bytes);
        assembly.trace.push(TraceEntry {
            position,
            instruction: *instruction,
            bytes,
        });
    }

    Ok(assembly)
}

/// `[0x06, 0x26, 0xa8]`
pub fn hex_list(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{b:02x}")).collect();
    format!("[{}]", items.join(", "))
}
