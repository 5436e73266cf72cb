//! Main memory.
//!
//! A flat, byte-addressable array starting at address zero. It is the backing
//! store beneath every cache level; line fills read from it and write-backs
//! land in it.

use crate::common::addr::LineAddr;
use crate::common::error::ProgramError;

/// Flat byte-addressable main memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Creates a zero-filled memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether every byte of `addrs` lies inside memory.
    ///
    /// # Errors
    ///
    /// `ProgramError::MemoryOutOfBounds` naming the first offending address.
    pub fn check(&self, addrs: impl IntoIterator<Item = u32>) -> Result<(), ProgramError> {
        for addr in addrs {
            if addr as usize >= self.bytes.len() {
                return Err(ProgramError::MemoryOutOfBounds {
                    addr,
                    size: self.bytes.len(),
                });
            }
        }
        Ok(())
    }

    /// Reads one byte. Out-of-range addresses read as zero.
    #[inline]
    pub fn read_byte(&self, addr: u32) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    /// Writes one byte. Out-of-range addresses are ignored.
    #[inline]
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr as usize) {
            *b = value;
        }
    }

    /// Copies a whole line out of memory, zero-padding past the end.
    pub fn read_line(&self, line: LineAddr, line_bytes: usize) -> Vec<u8> {
        (0..line_bytes as u32)
            .map(|i| self.read_byte(line.val().wrapping_add(i)))
            .collect()
    }

    /// Writes a whole line back, dropping bytes past the end.
    pub fn write_line(&mut self, line: LineAddr, data: &[u8]) {
        for (i, b) in (0u32..).zip(data) {
            self.write_byte(line.val().wrapping_add(i), *b);
        }
    }

    /// Loads `data` starting at `addr`.
    ///
    /// # Errors
    ///
    /// `ProgramError::MemoryOutOfBounds` if any byte falls outside memory; nothing is written.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), ProgramError> {
        let end = addr as usize + data.len();
        if end > self.bytes.len() {
            return Err(ProgramError::MemoryOutOfBounds {
                addr: end.saturating_sub(1) as u32,
                size: self.bytes.len(),
            });
        }
        self.bytes[addr as usize..end].copy_from_slice(data);
        Ok(())
    }

    /// The raw contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.bytes.iter().filter(|b| **b != 0).count();
        f.debug_struct("Memory")
            .field("size", &self.bytes.len())
            .field("nonzero", &used)
            .finish()
    }
}
