use tracing::{debug, info, trace};

use crate::codec::{self, Decoded};
use crate::isa::{Instruction, Isa};
use crate::machine::{MachineState, Status};

/// How far the program counter moves past a byte that is not a known opcode.
pub const SKIP_BYTES: usize = 3;

/// Options for [`run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Stop after this many steps even if the machine has not halted.
    /// A step is one executed instruction or one skipped opcode.
    pub step_limit: Option<usize>,
}

/// What a single call to [`step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Executed(Instruction),
    /// The byte at pc was not an opcode; pc moved past it.
    Skipped,
    Halted,
}

/// Counters for a finished [`run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn steps(&self) -> usize {
        self.executed + self.skipped
    }
}

/// Advance the machine by one fetch-decode-execute step.
///
/// The machine halts when fewer than three bytes remain at pc, or when a
/// six-byte instruction would run off the end of memory. There is no halt opcode.
pub fn step(state: &mut MachineState, isa: &Isa) -> Step {
    if state.status == Status::Halted {
        return Step::Halted;
    }
    if state.pc + 2 >= state.memory.len() {
        state.status = Status::Halted;
        return Step::Halted;
    }

    match codec::decode(state.memory.as_slice(), state.pc, isa) {
        Decoded::Instruction { instruction, size } => {
            trace!(pc = state.pc, %instruction, "execute");
            execute(state, &instruction);
            state.pc += size;
            Step::Executed(instruction)
        }
        Decoded::Unrecognized => {
            debug!(
                pc = state.pc,
                byte = state.memory.as_slice()[state.pc],
                "unrecognized opcode, skipping"
            );
            state.pc += SKIP_BYTES;
            Step::Skipped
        }
        Decoded::Truncated => {
            debug!(pc = state.pc, "instruction runs past end of memory");
            state.status = Status::Halted;
            Step::Halted
        }
    }
}

/// Run until the machine halts or the step limit is reached.
pub fn run(state: &mut MachineState, isa: &Isa, config: &RunConfig) -> RunSummary {
    let mut summary = RunSummary::default();

    loop {
        if let Some(limit) = config.step_limit {
            if summary.steps() >= limit {
                info!(limit, "step limit reached");
                break;
            }
        }
        match step(state, isa) {
            Step::Executed(_) => summary.executed += 1,
            Step::Skipped => summary.skipped += 1,
            Step::Halted => break,
        }
    }

    info!(
        executed = summary.executed,
        skipped = summary.skipped,
        pc = state.pc,
        halted = state.status == Status::Halted,
        "run finished"
    );
    summary
}

/// Apply the effect of one instruction to registers and memory.
///
/// Accesses that fall outside memory or the register file do nothing. The
/// program counter is left alone.
pub fn execute(state: &mut MachineState, instruction: &Instruction) {
    let MachineState {
        registers, memory, ..
    } = state;

    match *instruction {
        Instruction::Load { constant, address } => {
            if !registers.set(address, constant) {
                debug!(address, "load into missing register ignored");
            }
        }
        Instruction::Read {
            result_reg,
            offset,
            address_reg,
        } => {
            let value = registers
                .get(address_reg)
                .map(|base| base as u64 + offset as u64)
                .and_then(|target| memory.get(target));
            match value {
                Some(value) => {
                    registers.set(result_reg, value as u32);
                }
                None => debug!(address_reg, offset, "out-of-range read ignored"),
            }
        }
        Instruction::Write {
            value_reg,
            address_reg,
            offset,
        } => {
            let operands = registers.get(value_reg).zip(registers.get(address_reg));
            let stored = operands.is_some_and(|(value, base)| {
                // Memory cells are bytes; only the low byte of the register is kept.
                memory.set(base as u64 + offset as u64, value as u8)
            });
            if !stored {
                debug!(value_reg, address_reg, offset, "out-of-range write ignored");
            }
        }
        Instruction::Pow {
            value2_reg,
            result_reg,
            value1_addr,
        } => {
            let base = memory.get(value1_addr as u64).unwrap_or(0);
            let exponent = registers
                .get(value2_reg)
                .and_then(|addr| memory.get(addr as u64))
                .unwrap_or(0);
            registers.set(result_reg, pow_clamped(base as i64, exponent as i64));
        }
    }
}

/// `base ** exponent`, saturating at `u32::MAX`.
///
/// Negative operands give 0 and `0 ** 0` is 1.
pub fn pow_clamped(base: i64, exponent: i64) -> u32 {
    if base < 0 || exponent < 0 {
        return 0;
    }
    if base == 0 && exponent == 0 {
        return 1;
    }
    let exponent = u32::try_from(exponent).unwrap_or(u32::MAX);
    (base as u64)
        .checked_pow(exponent)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(u32::MAX)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn random_memory_never_panics(
            program in prop::collection::vec(any::<u8>(), 0..512),
            limit in 1usize..2000,
        ) {
            let mut state = MachineState::with_program(&program).unwrap();
            let config = RunConfig { step_limit: Some(limit) };
            let summary = run(&mut state, &Isa::default(), &config);
            prop_assert!(summary.steps() <= limit);
            prop_assert_eq!(state.memory.len(), crate::machine::MEMORY_SIZE);
        }

        #[test]
        fn pow_matches_wide_arithmetic(base in 0i64..=255, exponent in 0i64..=255) {
            let wide = (base as u128).checked_pow(exponent as u32);
            let expected = match wide {
                Some(v) if v <= u32::MAX as u128 => v as u32,
                _ => u32::MAX,
            };
            prop_assert_eq!(pow_clamped(base, exponent), expected);
        }
    }
}
