//! Register alias table.
//!
//! A fixed pool of physical slots. While renaming is enabled every dispatched
//! register writer owns one slot from issue to retirement, so a younger writer
//! of the same logical register never waits for an older one (WAW), and a
//! consumer can read a completed producer's value straight from its slot
//! instead of waiting for the architectural register file.

use crate::common::reg::RegisterId;
use crate::core::pipeline::signals::SeqId;

#[derive(Clone, Copy, Debug)]
struct PhysSlot {
    owner: SeqId,
    reg: RegisterId,
    value: Option<i32>,
}

/// Physical slot pool indexed by owner sequence ID.
#[derive(Clone, Debug)]
pub struct RenameTable {
    slots: Vec<Option<PhysSlot>>,
}

impl RenameTable {
    /// Creates a pool of `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Whether at least one slot is free.
    pub fn has_free(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Number of occupied slots.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Claims a slot for `owner` writing `reg`. Returns the slot index.
    pub fn allocate(&mut self, owner: SeqId, reg: RegisterId) -> Option<usize> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(PhysSlot {
            owner,
            reg,
            value: None,
        });
        Some(idx)
    }

    fn find(&self, owner: SeqId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_some_and(|s| s.owner == owner))
    }

    /// Whether `owner` holds a slot.
    pub fn owns(&self, owner: SeqId) -> bool {
        self.find(owner).is_some()
    }

    /// Stores the value produced by `owner`.
    pub fn fill(&mut self, owner: SeqId, value: i32) {
        let Some(idx) = self.find(owner) else {
            return;
        };
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.value = Some(value);
        }
    }

    /// Value produced by `owner`, once executed.
    pub fn value_of(&self, owner: SeqId) -> Option<i32> {
        self.find(owner)
            .and_then(|i| self.slots[i])
            .and_then(|s| s.value)
    }

    /// Frees `owner`'s slot, returning the logical register and value it held.
    pub fn release(&mut self, owner: SeqId) -> Option<(RegisterId, Option<i32>)> {
        let idx = self.find(owner)?;
        self.slots[idx].take().map(|s| (s.reg, s.value))
    }

    /// Frees every slot owned by an instruction younger than `boundary`.
    pub fn discard_newer(&mut self, boundary: SeqId) {
        for slot in &mut self.slots {
            if slot.is_some_and(|s| s.owner > boundary) {
                *slot = None;
            }
        }
    }

    /// Frees every slot.
    pub fn clear(&mut self) {
        self.slots.fill(None);
    }
}
