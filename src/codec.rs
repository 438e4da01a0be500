use thiserror::Error;

use crate::isa::{Field, Instruction, Isa, Kind, OPCODE_BITS};

/// A field value does not fit in its declared width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} = {value} is out of range (max {max})")]
pub struct FieldRangeError {
    pub field: Field,
    pub value: u32,
    pub max: u32,
}

/// Outcome of decoding at one position of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Instruction { instruction: Instruction, size: usize },
    /// The low bits of the byte are not a known opcode. No operand bytes were read.
    Unrecognized,
    /// A known opcode whose encoding runs past the end of the buffer.
    Truncated,
}

/// Pack `instruction` into its little-endian byte encoding.
///
/// Fails if any field exceeds its width under `isa`; values are never truncated.
pub fn encode(instruction: &Instruction, isa: &Isa) -> Result<Vec<u8>, FieldRangeError> {
    let kind = instruction.kind();
    let mut word = kind.opcode() as u64;
    let mut shift = OPCODE_BITS;

    for (&field, value) in kind.fields().iter().zip(instruction.operands()) {
        let max = isa.max(field);
        if value > max {
            return Err(FieldRangeError { field, value, max });
        }
        word |= (value as u64) << shift;
        shift += isa.width(field);
    }
    debug_assert!(shift as usize <= kind.size() * 8);

    Ok(word.to_le_bytes()[..kind.size()].to_vec())
}

/// Decode the instruction that starts at `bytes[offset]`.
pub fn decode(bytes: &[u8], offset: usize, isa: &Isa) -> Decoded {
    let Some(&first) = bytes.get(offset) else {
        return Decoded::Truncated;
    };
    let Some(kind) = Kind::from_opcode_byte(first) else {
        return Decoded::Unrecognized;
    };
    let size = kind.size();
    let Some(raw) = bytes.get(offset..offset + size) else {
        return Decoded::Truncated;
    };

    let mut buf = [0u8; 8];
    buf[..size].copy_from_slice(raw);
    let word = u64::from_le_bytes(buf);

    let mut shift = OPCODE_BITS;
    let operands: Vec<u32> = kind
        .fields()
        .iter()
        .map(|&field| {
            let width = isa.width(field);
            let value = (word >> shift) & ((1u64 << width) - 1);
            shift += width;
            value as u32
        })
        .collect();

    Decoded::Instruction {
        instruction: Instruction::from_operands(kind, &operands),
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(inst: Instruction, isa: &Isa) -> Instruction {
        let bytes = encode(&inst, isa).unwrap();
        match decode(&bytes, 0, isa) {
            Decoded::Instruction { instruction, size } => {
                assert_eq!(size, bytes.len());
                instruction
            }
            other => panic!("expected an instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_load() {
        let inst = Instruction::Load {
            constant: 1,
            address: 1,
        };
        assert_eq!(encode(&inst, &Isa::default()).unwrap(), vec![0x46, 0x00, 0x08]);
    }

    #[test]
    fn test_encode_read() {
        let inst = Instruction::Read {
            result_reg: 1,
            offset: 2,
            address_reg: 1,
        };
        assert_eq!(encode(&inst, &Isa::default()).unwrap(), vec![0x56, 0x10, 0x08]);
    }

    #[test]
    fn test_encode_write() {
        // 0x1A | 2 << 6 | 3 << 11 | 100 << 16
        let inst = Instruction::Write {
            value_reg: 2,
            address_reg: 3,
            offset: 100,
        };
        assert_eq!(encode(&inst, &Isa::default()).unwrap(), vec![0x9A, 0x18, 0x64]);
    }

    #[test]
    fn test_encode_pow() {
        // 0x2A | 8 << 6 | 5 << 11 | 470 << 16
        let inst = Instruction::Pow {
            value2_reg: 8,
            result_reg: 5,
            value1_addr: 470,
        };
        assert_eq!(
            encode(&inst, &Isa::default()).unwrap(),
            vec![0x2A, 0x2A, 0xD6, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_reference_encodings() {
        let isa = Isa::default();
        let cases = [
            (
                Instruction::Load {
                    constant: 152,
                    address: 21,
                },
                vec![0x06, 0x26, 0xA8],
            ),
            (
                Instruction::Read {
                    result_reg: 14,
                    offset: 245,
                    address_reg: 24,
                },
                vec![0x96, 0xAB, 0xC7],
            ),
            (
                Instruction::Write {
                    value_reg: 16,
                    address_reg: 28,
                    offset: 127,
                },
                vec![0x1A, 0xE4, 0x7F],
            ),
        ];
        for (inst, bytes) in cases {
            assert_eq!(encode(&inst, &isa).unwrap(), bytes, "{inst}");
            assert_eq!(roundtrip(inst, &isa), inst);
        }
    }

    #[test]
    fn test_decode_scenario_bytes() {
        let isa = Isa::default();
        assert_eq!(
            decode(&[0x46, 0x00, 0x08], 0, &isa),
            Decoded::Instruction {
                instruction: Instruction::Load {
                    constant: 1,
                    address: 1
                },
                size: 3,
            }
        );
        assert_eq!(
            decode(&[0x56, 0x10, 0x08], 0, &isa),
            Decoded::Instruction {
                instruction: Instruction::Read {
                    result_reg: 1,
                    offset: 2,
                    address_reg: 1
                },
                size: 3,
            }
        );
    }

    #[test]
    fn test_lengths() {
        let isa = Isa::default();
        let short = [
            Instruction::Load {
                constant: 8191,
                address: 31,
            },
            Instruction::Read {
                result_reg: 31,
                offset: 255,
                address_reg: 31,
            },
            Instruction::Write {
                value_reg: 31,
                address_reg: 31,
                offset: 255,
            },
        ];
        for inst in short {
            assert_eq!(encode(&inst, &isa).unwrap().len(), 3);
        }
        let pow = Instruction::Pow {
            value2_reg: 31,
            result_reg: 31,
            value1_addr: 0x3FF_FFFF,
        };
        assert_eq!(encode(&pow, &isa).unwrap().len(), 6);
    }

    #[test]
    fn test_constant_range() {
        let isa = Isa::default();
        let ok = Instruction::Load {
            constant: 8191,
            address: 0,
        };
        assert!(encode(&ok, &isa).is_ok());

        let too_big = Instruction::Load {
            constant: 8192,
            address: 0,
        };
        assert_eq!(
            encode(&too_big, &isa),
            Err(FieldRangeError {
                field: Field::Constant,
                value: 8192,
                max: 8191
            })
        );
    }

    #[test]
    fn test_register_range_follows_isa() {
        let narrow = Isa::new(3).unwrap();
        let inst = Instruction::Read {
            result_reg: 8,
            offset: 0,
            address_reg: 0,
        };
        let err = encode(&inst, &narrow).unwrap_err();
        assert_eq!(err.field, Field::ResultReg);
        assert_eq!(err.max, 7);
        assert!(encode(&inst, &Isa::default()).is_ok());
    }

    #[test]
    fn test_error_message_names_field() {
        let inst = Instruction::Pow {
            value2_reg: 0,
            result_reg: 0,
            value1_addr: 1 << 26,
        };
        let err = encode(&inst, &Isa::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "value1_addr = 67108864 is out of range (max 67108863)"
        );
    }

    #[test]
    fn test_narrow_registers_roundtrip() {
        let isa = Isa::new(3).unwrap();
        let inst = Instruction::Write {
            value_reg: 7,
            address_reg: 5,
            offset: 255,
        };
        assert_eq!(roundtrip(inst, &isa), inst);
    }

    #[test]
    fn test_decode_unrecognized() {
        assert_eq!(decode(&[0x00, 0x46, 0x00], 0, &Isa::default()), Decoded::Unrecognized);
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF], 0, &Isa::default()), Decoded::Unrecognized);
    }

    #[test]
    fn test_decode_truncated() {
        let isa = Isa::default();
        assert_eq!(decode(&[0x2A, 0, 0, 0, 0], 0, &isa), Decoded::Truncated);
        assert_eq!(decode(&[0x06, 0], 0, &isa), Decoded::Truncated);
        assert_eq!(decode(&[], 0, &isa), Decoded::Truncated);
    }

    #[test]
    fn test_decode_at_offset() {
        let isa = Isa::default();
        let mut bytes = vec![0xEE, 0xEE];
        bytes.extend([0x46, 0x00, 0x08]);
        assert!(matches!(
            decode(&bytes, 2, &isa),
            Decoded::Instruction {
                instruction: Instruction::Load { constant: 1, address: 1 },
                size: 3
            }
        ));
    }
}
