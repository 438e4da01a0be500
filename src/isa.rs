use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The instruction set of the machine.
///
/// Four instruction kinds, each encoded as one little-endian word whose low 6 bits
/// are the opcode. Operand fields follow the opcode, packed low-bit-first in the
/// order given by [`Kind::fields`]:
///
/// ```text
/// Load   0x06  opcode(6) constant(13)  address(R)                    3 bytes
/// Read   0x16  opcode(6) result_reg(R) offset(8)     address_reg(R)  3 bytes
/// Write  0x1A  opcode(6) value_reg(R)  address_reg(R) offset(8)      3 bytes
/// Pow    0x2A  opcode(6) value2_reg(R) result_reg(R) value1_addr(26) 6 bytes
/// ```
///
/// `R` is the register-index width carried by [`Isa`]. Both the encoder and the
/// decoder walk this table, so the two directions cannot disagree on a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Isa {
    register_bits: u32,
}

/// Number of registers in the register file.
pub const REGISTER_COUNT: usize = 32;

/// Width of the opcode in every encoding.
pub const OPCODE_BITS: u32 = 6;

const OPCODE_MASK: u8 = (1 << OPCODE_BITS) - 1;

/// Register-index width used when nothing else is configured.
pub const DEFAULT_REGISTER_BITS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsaError {
    #[error("register index width must be between 1 and {max} bits, got {bits}")]
    RegisterWidth { bits: u32, max: u32 },
}

impl Isa {
    /// Build an ISA whose register-index fields are `register_bits` wide.
    ///
    /// Every index expressible in the field must name a register, so the width is
    /// capped at `log2(REGISTER_COUNT)`.
    pub fn new(register_bits: u32) -> Result<Self, IsaError> {
        let max = REGISTER_COUNT.trailing_zeros();
        if register_bits == 0 || register_bits > max {
            return Err(IsaError::RegisterWidth {
                bits: register_bits,
                max,
            });
        }
        Ok(Self { register_bits })
    }

    pub fn register_bits(&self) -> u32 {
        self.register_bits
    }

    /// Width in bits of `field` under this ISA.
    pub fn width(&self, field: Field) -> u32 {
        match field {
            Field::Constant => 13,
            Field::Offset => 8,
            Field::Value1Addr => 26,
            Field::Address
            | Field::ResultReg
            | Field::AddressReg
            | Field::ValueReg
            | Field::Value2Reg => self.register_bits,
        }
    }

    /// Largest value `field` can hold.
    pub fn max(&self, field: Field) -> u32 {
        ((1u64 << self.width(field)) - 1) as u32
    }
}

impl Default for Isa {
    fn default() -> Self {
        Self {
            register_bits: DEFAULT_REGISTER_BITS,
        }
    }
}

/// The four instruction kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Load,
    Read,
    Write,
    Pow,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Load, Kind::Read, Kind::Write, Kind::Pow];

    pub fn opcode(self) -> u8 {
        match self {
            Kind::Load => 0x06,
            Kind::Read => 0x16,
            Kind::Write => 0x1A,
            Kind::Pow => 0x2A,
        }
    }

    /// Look up the kind for the opcode stored in the low bits of `byte`.
    pub fn from_opcode_byte(byte: u8) -> Option<Kind> {
        let opcode = byte & OPCODE_MASK;
        Kind::ALL.into_iter().find(|kind| kind.opcode() == opcode)
    }

    /// Encoded length in bytes.
    pub fn size(self) -> usize {
        match self {
            Kind::Load | Kind::Read | Kind::Write => 3,
            Kind::Pow => 6,
        }
    }

    /// Operand fields in packing order, starting right above the opcode.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Kind::Load => &[Field::Constant, Field::Address],
            Kind::Read => &[Field::ResultReg, Field::Offset, Field::AddressReg],
            Kind::Write => &[Field::ValueReg, Field::AddressReg, Field::Offset],
            Kind::Pow => &[Field::Value2Reg, Field::ResultReg, Field::Value1Addr],
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Kind::Load => "load",
            Kind::Read => "read",
            Kind::Write => "write",
            Kind::Pow => "pow",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A named operand field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Constant,
    Address,
    ResultReg,
    Offset,
    AddressReg,
    ValueReg,
    Value2Reg,
    Value1Addr,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Constant => "constant",
            Field::Address => "address",
            Field::ResultReg => "result_reg",
            Field::Offset => "offset",
            Field::AddressReg => "address_reg",
            Field::ValueReg => "value_reg",
            Field::Value2Reg => "value2_reg",
            Field::Value1Addr => "value1_addr",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded instruction.
///
/// The serde representation is the symbolic program record: a `command` tag plus
/// the named fields, e.g. `{command: load, constant: 5, address: 0}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Instruction {
    /// `registers[address] = constant`
    Load { constant: u32, address: u32 },
    /// `registers[result_reg] = memory[registers[address_reg] + offset]`
    Read {
        result_reg: u32,
        offset: u32,
        address_reg: u32,
    },
    /// `memory[registers[address_reg] + offset] = registers[value_reg]`
    Write {
        value_reg: u32,
        address_reg: u32,
        offset: u32,
    },
    /// `registers[result_reg] = memory[value1_addr] ** memory[registers[value2_reg]]`
    Pow {
        value2_reg: u32,
        result_reg: u32,
        value1_addr: u32,
    },
}

impl Instruction {
    pub fn kind(&self) -> Kind {
        match self {
            Instruction::Load { .. } => Kind::Load,
            Instruction::Read { .. } => Kind::Read,
            Instruction::Write { .. } => Kind::Write,
            Instruction::Pow { .. } => Kind::Pow,
        }
    }

    /// Operand values in the order of `self.kind().fields()`.
    pub fn operands(&self) -> Vec<u32> {
        match *self {
            Instruction::Load { constant, address } => vec![constant, address],
            Instruction::Read {
                result_reg,
                offset,
                address_reg,
            } => vec![result_reg, offset, address_reg],
            Instruction::Write {
                value_reg,
                address_reg,
                offset,
            } => vec![value_reg, address_reg, offset],
            Instruction::Pow {
                value2_reg,
                result_reg,
                value1_addr,
            } => vec![value2_reg, result_reg, value1_addr],
        }
    }

    /// Inverse of [`Instruction::operands`]. Missing operands read as zero.
    pub fn from_operands(kind: Kind, operands: &[u32]) -> Instruction {
        let op = |i: usize| operands.get(i).copied().unwrap_or(0);
        match kind {
            Kind::Load => Instruction::Load {
                constant: op(0),
                address: op(1),
            },
            Kind::Read => Instruction::Read {
                result_reg: op(0),
                offset: op(1),
                address_reg: op(2),
            },
            Kind::Write => Instruction::Write {
                value_reg: op(0),
                address_reg: op(1),
                offset: op(2),
            },
            Kind::Pow => Instruction::Pow {
                value2_reg: op(0),
                result_reg: op(1),
                value1_addr: op(2),
            },
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        write!(f, "{kind}")?;
        for (i, (field, value)) in kind.fields().iter().zip(self.operands()).enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{field}={value}")?;
        }
        Ok(())
    }
}
