//! Cache-line address arithmetic.
//!
//! Every cache store in the simulator is line-granular. This module provides:
//! 1. **Type Safety:** `LineAddr` distinguishes a line base from an arbitrary byte address.
//! 2. **Alignment:** Helpers to align a byte address down to its line boundary.
//! 3. **Grouping:** Splitting an address list into per-line chunks, preserving order.

use std::fmt;

/// The aligned base address of a cache line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineAddr(pub u32);

impl LineAddr {
    /// Aligns `addr` down to a multiple of `line_bytes`.
    ///
    /// `line_bytes` must be a power of two (enforced by `Config::validate`).
    #[inline]
    pub const fn containing(addr: u32, line_bytes: usize) -> Self {
        Self(addr & !((line_bytes as u32) - 1))
    }

    /// Returns the raw base address.
    #[inline]
    pub const fn val(self) -> u32 {
        self.0
    }

    /// Byte offset of `addr` within this line.
    #[inline]
    pub const fn offset_of(self, addr: u32) -> usize {
        (addr - self.0) as usize
    }
}

impl fmt::Display for LineAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Splits `addresses` into runs of consecutive entries sharing a cache line.
///
/// The relative order of addresses is preserved, so the bytes gathered chunk by
/// chunk line up with the original address list.
pub fn group_by_line(addresses: &[u32], line_bytes: usize) -> Vec<(LineAddr, Vec<u32>)> {
    let mut chunks: Vec<(LineAddr, Vec<u32>)> = Vec::new();
    for &addr in addresses {
        let line = LineAddr::containing(addr, line_bytes);
        match chunks.last_mut() {
            Some((last, members)) if *last == line => members.push(addr),
            _ => chunks.push((line, vec![addr])),
        }
    }
    chunks
}
