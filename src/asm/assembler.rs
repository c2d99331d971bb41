//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! # Comment
//! LABEL:          # Define a label
//!     LDI R0,8    # Load an immediate
//!     ADD R0,R1   # Register-register ALU form
//!     LDI R1,LABEL
//!     JMP R1      # Jump to the address held in R1
//!     HLT
//!
//!     ORG 50      # Zero-pad up to address 50
//!     DAT 42      # Emit a raw data byte
//! ```
//!
//! Labels resolve to byte addresses and are valid wherever an immediate
//! operand is expected (LDI, ADDI, DAT).

use crate::cpu::decode::{Instruction, OperandKind};
use crate::cpu::memory::MEMORY_SIZE;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source text to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, u8>,
    /// Pending references: (output index, label, source line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve forward references
        self.resolve_references()?;

        Ok(self.output.clone())
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Strip comments
        let line = match line.split_once('#') {
            Some((code, _)) => code.trim(),
            None => line.trim(),
        };

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some((label, rest)) = line.split_once(':') {
            let label = label.trim().to_uppercase();
            if !label.is_empty() {
                self.define_label(&label, line_num)?;
            }

            let rest = rest.trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Commas and whitespace both separate operands
        let normalized = line.replace(',', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        let (mnemonic, operands) = match parts.split_first() {
            Some((first, rest)) => (first.to_uppercase(), rest),
            None => return Ok(()),
        };

        match mnemonic.as_str() {
            // Directives
            "ORG" => {
                let [operand] = operands else {
                    return Err(AssemblerError::Syntax {
                        line: line_num,
                        message: "ORG takes one address".into(),
                    });
                };
                let addr = self.parse_value(operand, line_num)?;
                let addr = usize::from(addr);
                if addr < self.output.len() {
                    return Err(AssemblerError::Syntax {
                        line: line_num,
                        message: format!(
                            "ORG {} is behind current address {}",
                            addr,
                            self.output.len()
                        ),
                    });
                }
                self.output.resize(addr, 0);
            }

            "DAT" | "DATA" => {
                let [operand] = operands else {
                    return Err(AssemblerError::Syntax {
                        line: line_num,
                        message: "DAT takes one value".into(),
                    });
                };
                let value = self.parse_immediate(operand, line_num)?;
                self.emit(value, line_num)?;
            }

            _ => {
                let instr = Instruction::from_mnemonic(&mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic {
                        line: line_num,
                        mnemonic: mnemonic.clone(),
                    }
                })?;

                let expected = instr.operands();
                if operands.len() != expected.len() {
                    return Err(AssemblerError::Syntax {
                        line: line_num,
                        message: format!(
                            "{} takes {} operand(s), found {}",
                            instr.mnemonic(),
                            expected.len(),
                            operands.len()
                        ),
                    });
                }

                self.emit(instr.opcode(), line_num)?;
                for (operand, kind) in operands.iter().zip(expected) {
                    let byte = match kind {
                        OperandKind::Register => self.parse_register(operand, line_num)?,
                        OperandKind::Immediate => self.parse_immediate(operand, line_num)?,
                    };
                    self.emit(byte, line_num)?;
                }
            }
        }

        Ok(())
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        let addr = self.current_addr(line_num)?;
        self.symbols.insert(label.to_string(), addr);
        Ok(())
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        if self.output.len() >= MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge { line: line_num });
        }
        self.output.push(byte);
        Ok(())
    }

    fn current_addr(&self, line_num: usize) -> Result<u8, AssemblerError> {
        u8::try_from(self.output.len())
            .map_err(|_| AssemblerError::ProgramTooLarge { line: line_num })
    }

    /// Parse a register operand: R0-R7, case-insensitive.
    fn parse_register(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let upper = operand.to_uppercase();
        let index = upper
            .strip_prefix('R')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 8);

        index.ok_or_else(|| AssemblerError::Syntax {
            line: line_num,
            message: format!("expected register R0-R7, found `{}`", operand),
        })
    }

    /// Parse an immediate operand: a numeric value or a label reference.
    /// Label references emit a placeholder patched in pass 2.
    fn parse_immediate(&mut self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        if Self::is_numeric(operand) {
            return self.parse_value(operand, line_num);
        }

        // Label reference
        let label = operand.to_uppercase();
        self.pending.push((self.output.len(), label, line_num));
        Ok(0)
    }

    /// Parse a numeric value: decimal, `0x` hex, or `0b` binary.
    fn parse_value(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let parsed = if let Some(hex) = operand.strip_prefix("0x").or(operand.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
        } else if let Some(bin) = operand.strip_prefix("0b").or(operand.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2)
        } else {
            operand.parse::<i64>()
        };

        let value = parsed.map_err(|_| AssemblerError::Syntax {
            line: line_num,
            message: format!("expected a value, found `{}`", operand),
        })?;

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange {
            line: line_num,
            value,
        })
    }

    fn is_numeric(operand: &str) -> bool {
        operand
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-')
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (index, label, line_num) in &self.pending {
            let addr = self
                .symbols
                .get(label)
                .ok_or_else(|| AssemblerError::UnknownLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;
            self.output[*index] = *addr;
        }
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown mnemonic `{mnemonic}` on line {line}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("unknown label `{label}` on line {line}")]
    UnknownLabel { line: usize, label: String },

    #[error("value {value} out of byte range on line {line}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program exceeds memory size at line {line}")]
    ProgramTooLarge { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_add_program() {
        let source = "\
# add two numbers and print the sum
LDI R0,8
LDI R1,9
ADD R0,R1
PRN R0
HLT
";
        let bytes = assemble(source).unwrap();
        assert_eq!(
            bytes,
            vec![
                0b1000_0010, 0, 8,
                0b1000_0010, 1, 9,
                0b1010_0000, 0, 1,
                0b0100_0111, 0,
                0b0000_0001,
            ]
        );
    }

    #[test]
    fn test_labels_resolve_forward_and_back() {
        let source = "\
LDI R2,LOOP
LOOP:
    INC R0
    JMP R2
";
        let bytes = assemble(source).unwrap();
        assert_eq!(
            bytes,
            vec![0b1000_0010, 2, 3, 0b0110_0101, 0, 0b0101_0100, 2]
        );
    }

    #[test]
    fn test_label_on_same_line_as_instruction() {
        let source = "START: HLT\n";
        let bytes = assemble(source).unwrap();
        assert_eq!(bytes, vec![0b0000_0001]);
    }

    #[test]
    fn test_case_and_comma_insensitive() {
        let bytes = assemble("ldi r0, 8\nhlt\n").unwrap();
        assert_eq!(bytes, vec![0b1000_0010, 0, 8, 0b0000_0001]);
    }

    #[test]
    fn test_numeric_bases() {
        let bytes = assemble("LDI R0,0x10\nLDI R1,0b101\nLDI R2,42\n").unwrap();
        assert_eq!(bytes[2], 0x10);
        assert_eq!(bytes[5], 0b101);
        assert_eq!(bytes[8], 42);
    }

    #[test]
    fn test_org_pads_with_zeros() {
        let bytes = assemble("HLT\nORG 4\nDAT 7\n").unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0, 7]);
    }

    #[test]
    fn test_dat_accepts_label() {
        let source = "\
DAT END
END: HLT
";
        let bytes = assemble(source).unwrap();
        assert_eq!(bytes, vec![1, 1]);
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = assemble("FROB R0\n").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UnknownMnemonic {
                line: 1,
                mnemonic: "FROB".into(),
            }
        );
    }

    #[test]
    fn test_unknown_label() {
        let err = assemble("LDI R0,NOWHERE\n").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UnknownLabel {
                line: 1,
                label: "NOWHERE".into(),
            }
        );
    }

    #[test]
    fn test_wrong_operand_count() {
        assert!(matches!(
            assemble("ADD R0\n").unwrap_err(),
            AssemblerError::Syntax { line: 1, .. }
        ));
    }

    #[test]
    fn test_bad_register() {
        assert!(matches!(
            assemble("PRN R9\n").unwrap_err(),
            AssemblerError::Syntax { line: 1, .. }
        ));
    }

    #[test]
    fn test_register_operand_rejects_immediate() {
        assert!(assemble("ADD R0,8\n").is_err());
    }

    #[test]
    fn test_value_out_of_range() {
        assert_eq!(
            assemble("LDI R0,300\n").unwrap_err(),
            AssemblerError::ValueOutOfRange {
                line: 1,
                value: 300,
            }
        );
    }
}
