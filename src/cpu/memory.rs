//! LS-8 memory subsystem.
//!
//! The LS-8 has 256 byte-sized memory cells. Addresses are `u8`, so every
//! representable address is a valid cell and address arithmetic wraps
//! mod 256.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of memory cells in the LS-8.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: 256 byte cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read the cell at an address.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[usize::from(addr)]
    }

    /// Write a value to the cell at an address.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[usize::from(addr)] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = 0;
        }
    }

    /// Load a program into memory starting at the given address.
    pub fn load(&mut self, start: u8, program: &[u8]) -> Result<(), MemoryError> {
        let start = usize::from(start);
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: u8, count: usize) -> Vec<(u8, u8)> {
        let start = usize::from(start);
        let end = (start + count).min(MEMORY_SIZE);
        (start..end).map(|i| (i as u8, self.cells[i])).collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();

        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
    }

    #[test]
    fn test_memory_starts_zeroed() {
        let mem = Memory::new();
        for addr in 0..=255u8 {
            assert_eq!(mem.read(addr), 0);
        }
    }

    #[test]
    fn test_memory_full_range() {
        let mut mem = Memory::new();

        mem.write(0, 1);
        mem.write(255, 2);

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(255), 2);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();

        mem.load(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(1), 2);
        assert_eq!(mem.read(2), 3);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();
        let program = vec![0u8; 10];

        let err = mem.load(250, &program).unwrap_err();
        assert_eq!(
            err,
            MemoryError::ProgramTooLarge {
                size: 10,
                available: 6,
            }
        );
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.write(100, 0xAB);

        mem.clear();

        assert_eq!(mem.read(100), 0);
    }
}
