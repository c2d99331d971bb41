//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - 256 byte-sized memory cells
//! - 8 general-purpose byte registers, R7 reserved as the stack pointer
//! - PC and FL internal registers
//! - 35-instruction set with operand count, ALU class, and sets-PC
//!   markers packed into the opcode byte

pub mod alu;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;

pub use decode::{DecodeError, Instruction, OpcodeFields, OperandKind};
pub use execute::{Cpu, CpuError, CpuState, Output};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
