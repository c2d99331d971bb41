//! Disassembler for LS-8 programs.
//!
//! Linear sweep from address 0: code and data share the one memory
//! image, so bytes that do not decode render as `???` with the raw
//! value and the sweep continues at the next byte.

use crate::cpu::decode::{Instruction, OperandKind};

/// Disassemble a program to a listing, one line per instruction.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    let mut addr = 0;

    while addr < bytes.len() {
        let (line, len) = disassemble_at(bytes, addr);
        output.push_str(&format!("{:03}: {}\n", addr, line));
        addr += len;
    }

    output
}

/// Disassemble the instruction at `addr`.
///
/// Returns the rendered text and the number of bytes consumed.
///
/// # Panics
/// Panics if `addr` is past the end of `bytes`.
pub fn disassemble_at(bytes: &[u8], addr: usize) -> (String, usize) {
    let opcode = bytes[addr];

    let instr = match Instruction::decode(opcode) {
        Ok(instr) => instr,
        Err(_) => return (format!("???  # 0b{:08b}", opcode), 1),
    };

    let expected = instr.operands();
    if addr + expected.len() >= bytes.len() {
        // Truncated tail: not enough bytes left for the operands
        return (format!("???  # 0b{:08b}", opcode), 1);
    }

    let mut text = instr.mnemonic().to_string();
    for (i, kind) in expected.iter().enumerate() {
        let operand = bytes[addr + 1 + i];
        text.push(if i == 0 { ' ' } else { ',' });
        match kind {
            OperandKind::Register => text.push_str(&format!("R{}", operand)),
            OperandKind::Immediate => text.push_str(&operand.to_string()),
        }
    }

    (text, 1 + expected.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Instruction::*;

    #[test]
    fn test_disassemble_add_program() {
        let bytes = vec![
            Ldi.opcode(), 0, 8,
            Ldi.opcode(), 1, 9,
            Add.opcode(), 0, 1,
            Prn.opcode(), 0,
            Hlt.opcode(),
        ];

        let listing = disassemble(&bytes);

        assert_eq!(
            listing,
            "000: LDI R0,8\n\
             003: LDI R1,9\n\
             006: ADD R0,R1\n\
             009: PRN R0\n\
             011: HLT\n"
        );
    }

    #[test]
    fn test_unknown_byte_renders_raw() {
        let (text, len) = disassemble_at(&[0b1111_1111], 0);
        assert_eq!(text, "???  # 0b11111111");
        assert_eq!(len, 1);
    }

    #[test]
    fn test_truncated_operands_render_raw() {
        // LDI expects two operands, only one byte remains
        let bytes = vec![Ldi.opcode(), 0];
        let (text, len) = disassemble_at(&bytes, 0);
        assert!(text.starts_with("???"));
        assert_eq!(len, 1);
    }

    #[test]
    fn test_sweep_recovers_after_data() {
        let bytes = vec![0b1111_1111, Hlt.opcode()];
        let listing = disassemble(&bytes);
        assert!(listing.contains("???"));
        assert!(listing.contains("001: HLT"));
    }
}
