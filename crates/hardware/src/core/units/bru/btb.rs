//! Branch Target Buffer (BTB).
//!
//! A small, fully associative table mapping the address of a jump or return to
//! the target it last resolved to. Decode consults it to redirect fetch before
//! the jump executes. When full, the oldest inserted entry is evicted; updating
//! an existing entry keeps its position.

use std::collections::VecDeque;

/// A single BTB entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BtbEntry {
    /// Address of the control instruction.
    source: u32,
    /// Last observed target.
    target: u32,
}

/// Branch Target Buffer with insertion-order replacement.
#[derive(Clone, Debug)]
pub struct Btb {
    /// Entries, oldest inserted first.
    table: VecDeque<BtbEntry>,
    /// Capacity in entries.
    size: usize,
}

impl Btb {
    /// Creates an empty BTB.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of entries. A zero-sized table never hits.
    pub fn new(size: usize) -> Self {
        Self {
            table: VecDeque::with_capacity(size),
            size,
        }
    }

    /// Looks up the predicted target for the instruction at `pc`.
    ///
    /// # Returns
    ///
    /// The last resolved target, or `None` when `pc` has no entry.
    pub fn lookup(&self, pc: u32) -> Option<u32> {
        self.table
            .iter()
            .find(|e| e.source == pc)
            .map(|e| e.target)
    }

    /// Records that the instruction at `pc` jumped to `target`.
    ///
    /// # Arguments
    ///
    /// * `pc` - Address of the jump or return.
    /// * `target` - Resolved target address.
    pub fn update(&mut self, pc: u32, target: u32) {
        if self.size == 0 {
            return;
        }
        if let Some(e) = self.table.iter_mut().find(|e| e.source == pc) {
            e.target = target;
            return;
        }
        if self.table.len() >= self.size {
            let _ = self.table.pop_front();
        }
        self.table.push_back(BtbEntry { source: pc, target });
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
