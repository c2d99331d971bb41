//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction
//! behaviors. The dispatcher matches the closed [`Instruction`] enum
//! exhaustively and advances the PC from the opcode's sets-PC bit:
//! instructions with the bit clear advance by `operand_count + 1`,
//! instructions with the bit set (jumps, call, return) place the PC
//! themselves.

use crate::cpu::alu;
use crate::cpu::decode::{DecodeError, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{FL_EQ, FL_GT, FL_LT, NUM_REGISTERS};
use crate::cpu::{Memory, Registers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU stopped on a fatal error.
    Error,
}

/// Output emitted by the print instructions.
///
/// The machine only queues the register value; the embedder decides how
/// to render it (the CLI prints `Value` as a decimal line and `Char` as
/// a code-point character line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// Decimal register value (PRN).
    Value(u8),
    /// Character code point (PRA).
    Char(u8),
}

/// The LS-8 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
    /// Queued print output, drained by the embedder.
    output: Vec<Output>,
}

impl Cpu {
    /// Create a new CPU in the reset state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            output: Vec::new(),
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        self.output.clear();
    }

    /// Load a program into memory starting at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load(0, program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. Fatal errors (unknown
    /// opcode, divide by zero) move the CPU into the `Error` state and
    /// are returned to the caller.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch: the opcode and both potential operand bytes
        let pc = self.regs.pc;
        let opcode = self.mem.read(pc);
        let operand_a = self.mem.read(pc.wrapping_add(1));
        let operand_b = self.mem.read(pc.wrapping_add(2));

        // Decode
        let instr = match Instruction::decode(opcode) {
            Ok(instr) => instr,
            Err(DecodeError::InvalidOpcode(byte)) => {
                self.state = CpuState::Error;
                return Err(CpuError::InvalidOpcode(byte));
            }
        };

        // Execute
        if let Err(e) = self.execute(instr, operand_a, operand_b) {
            self.state = CpuState::Error;
            return Err(e);
        }

        // Instructions that set the PC have already done so
        if !instr.sets_pc() {
            self.regs.pc = pc.wrapping_add(instr.operand_count() + 1);
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    ///
    /// `operand_a` and `operand_b` are the bytes following the opcode;
    /// instructions with fewer operands ignore the extras.
    fn execute(&mut self, instr: Instruction, operand_a: u8, operand_b: u8) -> Result<(), CpuError> {
        use Instruction::*;

        if instr.is_alu() {
            return alu::execute(&mut self.regs, instr, operand_a, operand_b);
        }

        match instr {
            // ==================== System ====================
            Hlt => {
                self.state = CpuState::Halted;
            }

            Nop => {}

            // Interrupt delivery is not modeled. Both opcodes carry the
            // sets-PC bit, so the inert handlers must move the PC past
            // the instruction themselves.
            Int => {
                self.regs.advance_pc(2);
            }

            Iret => {
                self.regs.advance_pc(1);
            }

            // ==================== Load / Store ====================
            Ldi => {
                self.regs.set(operand_a, operand_b);
            }

            Ld => {
                let addr = self.regs.get(operand_b);
                self.regs.set(operand_a, self.mem.read(addr));
            }

            St => {
                let addr = self.regs.get(operand_a);
                self.mem.write(addr, self.regs.get(operand_b));
            }

            // ==================== Print ====================
            Prn => {
                self.output.push(Output::Value(self.regs.get(operand_a)));
            }

            Pra => {
                self.output.push(Output::Char(self.regs.get(operand_a)));
            }

            // ==================== Stack ====================
            Push => {
                self.push_byte(self.regs.get(operand_a));
            }

            Pop => {
                let value = self.pop_byte();
                self.regs.set(operand_a, value);
            }

            // ==================== Subroutines ====================
            Call => {
                let return_addr = self.regs.pc.wrapping_add(2);
                self.push_byte(return_addr);
                self.regs.jump(self.regs.get(operand_a));
            }

            Ret => {
                let return_addr = self.pop_byte();
                self.regs.jump(return_addr);
            }

            // ==================== Jumps ====================
            Jmp => {
                self.regs.jump(self.regs.get(operand_a));
            }

            Jeq => self.branch_if(self.regs.flag(FL_EQ), operand_a),
            Jne => self.branch_if(!self.regs.flag(FL_EQ), operand_a),
            Jgt => self.branch_if(self.regs.flag(FL_GT), operand_a),
            Jge => self.branch_if(self.regs.flag(FL_EQ | FL_GT), operand_a),
            Jlt => self.branch_if(self.regs.flag(FL_LT), operand_a),
            Jle => self.branch_if(self.regs.flag(FL_EQ | FL_LT), operand_a),

            // ALU instructions were routed above
            Add | Sub | Mul | Div | Mod | Cmp | And | Or | Xor | Not | Shl | Shr | Inc | Dec
            | Addi => unreachable!("ALU instruction {:?} fell through dispatch", instr),
        }

        Ok(())
    }

    /// Jump to the address in `target_reg` if the condition holds,
    /// otherwise step over the instruction and its operand.
    fn branch_if(&mut self, condition: bool, target_reg: u8) {
        if condition {
            self.regs.jump(self.regs.get(target_reg));
        } else {
            self.regs.advance_pc(2);
        }
    }

    /// Push a byte onto the stack. SP wraps mod 256; over-push is
    /// unchecked and clobbers whatever the wrapped address holds.
    fn push_byte(&mut self, value: u8) {
        let sp = self.regs.sp().wrapping_sub(1);
        self.regs.set_sp(sp);
        self.mem.write(sp, value);
    }

    /// Pop a byte off the stack. SP wraps mod 256.
    fn pop_byte(&mut self) -> u8 {
        let sp = self.regs.sp();
        let value = self.mem.read(sp);
        self.regs.set_sp(sp.wrapping_add(1));
        value
    }

    /// Format a one-line state trace: PC, the three bytes at PC, and
    /// every register, all in hex.
    pub fn trace(&self) -> String {
        let pc = self.regs.pc;
        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            pc,
            self.mem.read(pc),
            self.mem.read(pc.wrapping_add(1)),
            self.mem.read(pc.wrapping_add(2)),
        );

        for i in 0..NUM_REGISTERS as u8 {
            line.push_str(&format!(" {:02X}", self.regs.get(i)));
        }

        line
    }

    /// Drain the queued print output.
    pub fn drain_output(&mut self) -> Vec<Output> {
        self.output.drain(..).collect()
    }

    /// Queued print output that has not been drained yet.
    pub fn output(&self) -> &[Output] {
        &self.output
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("invalid opcode: 0b{0:08b}")]
    InvalidOpcode(u8),

    #[error("cannot divide by zero")]
    DivideByZero,
}
