use std::fmt;

use thiserror::Error;

use crate::isa::REGISTER_COUNT;

/// Number of bytes of addressable memory.
pub const MEMORY_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program is {len} bytes but memory holds only {capacity}")]
    ProgramTooLarge { len: usize, capacity: usize },
}

/// The 32 general-purpose registers. Each holds a `u32`, wide enough for
/// a clamped `pow` result.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
        }
    }

    /// Value of register `index`, or `None` if no such register exists.
    pub fn get(&self, index: u32) -> Option<u32> {
        self.regs.get(index as usize).copied()
    }

    /// Set register `index`. Returns false (and changes nothing) if it does not exist.
    pub fn set(&mut self, index: u32, value: u32) -> bool {
        match self.regs.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.regs
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.regs.iter()).finish()
    }
}

/// Rows of eight, `R[i]=0xNN` separated by `|`.
impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.regs.chunks(8).enumerate() {
            let cells: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, value)| format!("R[{}]=0x{value:02x}", row * 8 + i))
                .collect();
            writeln!(f, "  {}", cells.join(" | "))?;
        }
        Ok(())
    }
}

/// Flat byte-addressable memory of [`MEMORY_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; MEMORY_SIZE],
        }
    }

    /// Copy `program` to the start of memory.
    ///
    /// A program that does not fit is rejected rather than cut short.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > self.bytes.len() {
            return Err(LoadError::ProgramTooLarge {
                len: program.len(),
                capacity: self.bytes.len(),
            });
        }
        self.bytes[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Byte at `address`, or `None` if the address is outside memory.
    pub fn get(&self, address: u64) -> Option<u8> {
        usize::try_from(address)
            .ok()
            .and_then(|a| self.bytes.get(a))
            .copied()
    }

    /// Store `value` at `address`. Returns false (and changes nothing) when out of range.
    pub fn set(&mut self, address: u64, value: u8) -> bool {
        match usize::try_from(address)
            .ok()
            .and_then(|a| self.bytes.get_mut(a))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.bytes.iter().filter(|&&b| b != 0).count();
        write!(f, "Memory {{ len: {}, nonzero: {used} }}", self.bytes.len())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// Everything one run of the machine mutates.
#[derive(Clone, Debug)]
pub struct MachineState {
    pub registers: RegisterFile,
    pub memory: Memory,
    pub pc: usize,
    pub status: Status,
}

impl MachineState {
    /// A fresh machine: zeroed registers and memory, pc at 0, running.
    pub fn new() -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(),
            pc: 0,
            status: Status::Running,
        }
    }

    /// A fresh machine with `program` loaded at address 0.
    pub fn with_program(program: &[u8]) -> Result<Self, LoadError> {
        let mut state = Self::new();
        state.memory.load(program)?;
        Ok(state)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
