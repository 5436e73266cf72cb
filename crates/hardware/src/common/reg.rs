//! Register identifiers, register sets and the architectural register file.
//!
//! This module provides:
//! 1. **Identifiers:** `RegisterId`, a checked ordinal for the 32 logical registers.
//! 2. **Sets:** `RegSet`, a 32-bit bitset used for read/write sets and hazard checks.
//! 3. **Storage:** `RegisterFile`, the committed architectural state (`zero` hardwired).
//! 4. **Bookkeeping:** `PendingWrites`, per-register counts of issued-but-uncommitted writers.

use std::fmt;

use crate::common::constants::REGISTER_COUNT;
use crate::isa::abi;

/// A logical register ordinal (`0..32`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RegisterId(u8);

impl RegisterId {
    /// The hardwired zero register.
    pub const ZERO: Self = Self(0);
    /// Return address.
    pub const RA: Self = Self(1);
    /// Stack pointer.
    pub const SP: Self = Self(2);
    /// Thread pointer; seeded with the core index.
    pub const TP: Self = Self(4);
    /// First argument / return value.
    pub const A0: Self = Self(10);
    /// Second argument.
    pub const A1: Self = Self(11);

    /// Creates a register id, returning `None` when out of range.
    pub const fn new(idx: usize) -> Option<Self> {
        if idx < REGISTER_COUNT {
            Some(Self(idx as u8))
        } else {
            None
        }
    }

    /// Returns the ordinal of this register.
    #[inline]
    pub const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the hardwired zero register.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Iterates over all logical registers.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..REGISTER_COUNT as u8).map(Self)
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(abi::NAMES[self.idx()])
    }
}

/// A set of logical registers.
///
/// The zero register is never a member: it can neither carry a dependency nor
/// be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RegSet(u32);

impl RegSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from a list of registers, dropping `zero`.
    pub fn of(regs: &[RegisterId]) -> Self {
        let mut set = Self::EMPTY;
        for &r in regs {
            set.insert(r);
        }
        set
    }

    /// Adds `reg` to the set (no-op for `zero`).
    #[inline]
    pub fn insert(&mut self, reg: RegisterId) {
        if !reg.is_zero() {
            self.0 |= 1 << reg.idx();
        }
    }

    /// Whether `reg` belongs to the set.
    #[inline]
    pub const fn contains(self, reg: RegisterId) -> bool {
        self.0 & (1 << reg.idx()) != 0
    }

    /// Whether the two sets share a register.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of the two sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the set is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of registers in the set.
    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the members in ordinal order.
    pub fn iter(self) -> impl Iterator<Item = RegisterId> {
        RegisterId::all().filter(move |r| self.contains(*r))
    }
}

/// Committed architectural register state.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [i32; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a register file with every register set to zero.
    pub const fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
        }
    }

    /// Reads a register. `zero` always reads 0.
    #[inline]
    pub const fn read(&self, reg: RegisterId) -> i32 {
        if reg.is_zero() { 0 } else { self.regs[reg.idx()] }
    }

    /// Writes a register. Writes to `zero` are ignored.
    #[inline]
    pub fn write(&mut self, reg: RegisterId, val: i32) {
        if !reg.is_zero() {
            self.regs[reg.idx()] = val;
        }
    }

    /// Returns the raw register array (index = ordinal).
    pub const fn values(&self) -> [i32; REGISTER_COUNT] {
        self.regs
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for reg in RegisterId::all().skip(1) {
            let v = self.read(reg);
            if v != 0 {
                let _ = map.entry(&format_args!("{reg}"), &v);
            }
        }
        map.finish()
    }
}

/// Pending-write bookkeeping indexed by register ordinal.
///
/// Counts issued writers that have not yet retired. The issue unit increments,
/// the write-back unit decrements, and a flush rebuilds the table from the
/// surviving reorder-buffer entries.
#[derive(Clone, Debug, Default)]
pub struct PendingWrites {
    counts: [u16; REGISTER_COUNT],
}

impl PendingWrites {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more in-flight writer for every register in `regs`.
    pub fn add(&mut self, regs: RegSet) {
        for r in regs.iter() {
            self.counts[r.idx()] += 1;
        }
    }

    /// Retires one writer for every register in `regs`.
    pub fn remove(&mut self, regs: RegSet) {
        for r in regs.iter() {
            self.counts[r.idx()] = self.counts[r.idx()].saturating_sub(1);
        }
    }

    /// Whether `reg` has at least one in-flight writer.
    #[inline]
    pub const fn is_pending(&self, reg: RegisterId) -> bool {
        self.counts[reg.idx()] > 0
    }

    /// Whether any register of `regs` has an in-flight writer.
    pub fn any_pending(&self, regs: RegSet) -> bool {
        regs.iter().any(|r| self.is_pending(r))
    }

    /// Clears every counter.
    pub fn clear(&mut self) {
        self.counts = [0; REGISTER_COUNT];
    }
}
