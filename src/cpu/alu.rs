//! Arithmetic logic unit.
//!
//! Executes the ALU subset of the instruction set against the register
//! file. All arithmetic is unsigned 8-bit; results wrap mod 256, which is
//! the machine's entire overflow policy. Overflow is never an error.

use crate::cpu::decode::Instruction;
use crate::cpu::execute::CpuError;
use crate::cpu::registers::Registers;

/// Execute an ALU instruction.
///
/// `reg_a` is the destination register index. `operand_b` is a register
/// index for the register-operand forms and a literal byte for ADDI.
/// CMP writes only FL; everything else writes `reg[a]`.
///
/// DIV and MOD with a zero divisor fail before touching the destination.
pub(crate) fn execute(
    regs: &mut Registers,
    instr: Instruction,
    reg_a: u8,
    operand_b: u8,
) -> Result<(), CpuError> {
    use Instruction::*;

    let a = regs.get(reg_a);

    match instr {
        Add => regs.set(reg_a, a.wrapping_add(regs.get(operand_b))),
        Sub => regs.set(reg_a, a.wrapping_sub(regs.get(operand_b))),
        Mul => regs.set(reg_a, a.wrapping_mul(regs.get(operand_b))),
        Div => {
            let divisor = regs.get(operand_b);
            if divisor == 0 {
                return Err(CpuError::DivideByZero);
            }
            regs.set(reg_a, a / divisor);
        }
        Mod => {
            let divisor = regs.get(operand_b);
            if divisor == 0 {
                return Err(CpuError::DivideByZero);
            }
            regs.set(reg_a, a % divisor);
        }
        And => regs.set(reg_a, a & regs.get(operand_b)),
        Or => regs.set(reg_a, a | regs.get(operand_b)),
        Xor => regs.set(reg_a, a ^ regs.get(operand_b)),
        Not => regs.set(reg_a, !a),
        // Shift counts of 8 or more shift every bit out
        Shl => regs.set(reg_a, a.checked_shl(u32::from(regs.get(operand_b))).unwrap_or(0)),
        Shr => regs.set(reg_a, a.checked_shr(u32::from(regs.get(operand_b))).unwrap_or(0)),
        Inc => regs.set(reg_a, a.wrapping_add(1)),
        Dec => regs.set(reg_a, a.wrapping_sub(1)),
        Cmp => regs.set_compare_flags(a, regs.get(operand_b)),
        Addi => regs.set(reg_a, a.wrapping_add(operand_b)),
        _ => unreachable!("non-ALU instruction {:?} routed to ALU", instr),
    }

    Ok(())
}
