use std::fmt::Write;

use crate::codec::{self, Decoded};
use crate::engine::SKIP_BYTES;
use crate::isa::Isa;

/// Pretty-print an encoded program for human inspection.
///
/// Walks the buffer the way the engine does: known opcodes are decoded and
/// listed with their fields, anything else is shown as a skipped group of
/// [`SKIP_BYTES`] bytes.
pub fn disassemble(bytes: &[u8], isa: &Isa) -> String {
    let mut out = String::new();
    let mut pc = 0;

    while pc < bytes.len() {
        match codec::decode(bytes, pc, isa) {
            Decoded::Instruction { instruction, size } => {
                let hex = hex_bytes(&bytes[pc..pc + size]);
                let _ = writeln!(out, "{pc:04X}: {hex:<18} {instruction}");
                pc += size;
            }
            Decoded::Unrecognized => {
                let end = (pc + SKIP_BYTES).min(bytes.len());
                let hex = hex_bytes(&bytes[pc..end]);
                let _ = writeln!(out, "{pc:04X}: {hex:<18} (unrecognized)");
                pc = end;
            }
            Decoded::Truncated => {
                let hex = hex_bytes(&bytes[pc..]);
                let _ = writeln!(out, "{pc:04X}: {hex:<18} (truncated)");
                break;
            }
        }
    }
    out
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing() {
        let bytes = [0x46, 0x00, 0x08, 0x56, 0x10, 0x08];
        let text = disassemble(&bytes, &Isa::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 46 00 08"));
        assert!(lines[0].ends_with("load constant=1, address=1"));
        assert!(lines[1].starts_with("0003: 56 10 08"));
        assert!(lines[1].ends_with("read result_reg=1, offset=2, address_reg=1"));
    }

    #[test]
    fn test_unrecognized_and_truncated() {
        let bytes = [0xFF, 0xEE, 0xDD, 0x2A, 0x00];
        let text = disassemble(&bytes, &Isa::default());
        assert!(text.contains("0000: FF EE DD"));
        assert!(text.contains("(unrecognized)"));
        assert!(text.contains("0003: 2A 00"));
        assert!(text.contains("(truncated)"));
    }

    #[test]
    fn test_empty() {
        assert!(disassemble(&[], &Isa::default()).is_empty());
    }
}
