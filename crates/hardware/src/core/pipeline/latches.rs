//! Staged pipeline latches for inter-stage communication.
//!
//! A `Bus` models one cycle of wire delay between two adjacent units. Each bus
//! has three stages:
//! 1. **Entry:** Values written by the producer during the current cycle.
//! 2. **Buffer:** Values that could not become visible because the consumer fell behind.
//! 3. **Visible:** Values the consumer may `peek` / `get` this cycle.
//!
//! `connect()` is called once per cycle, before any unit runs, and moves values
//! forward. A value added in cycle `t` is visible in cycle `t + 1` when the
//! consumer keeps up, and never earlier.

use std::collections::VecDeque;

/// A multi-slot staged latch of capacity `width`.
#[derive(Clone, Debug)]
pub struct Bus<T> {
    entry: VecDeque<T>,
    buffer: VecDeque<T>,
    visible: VecDeque<T>,
    width: usize,
}

impl<T> Bus<T> {
    /// Creates an empty bus carrying up to `width` values per stage.
    pub fn new(width: usize) -> Self {
        Self {
            entry: VecDeque::with_capacity(width),
            buffer: VecDeque::with_capacity(width),
            visible: VecDeque::with_capacity(width),
            width: width.max(1),
        }
    }

    /// Whether the producer may add another value this cycle.
    ///
    /// Full when the values waiting to become visible already fill one stage.
    #[inline]
    pub fn can_add(&self) -> bool {
        self.entry.len() + self.buffer.len() < self.width
    }

    /// Adds a value to the entry stage.
    ///
    /// # Errors
    ///
    /// Hands the value back when the bus is full.
    pub fn add(&mut self, value: T) -> Result<(), T> {
        if !self.can_add() {
            return Err(value);
        }
        self.entry.push_back(value);
        Ok(())
    }

    /// Advances the bus by one cycle.
    ///
    /// Buffered values become visible first, then fresh entries; whatever does
    /// not fit in the visible stage waits in the buffer.
    pub fn connect(&mut self) {
        while self.visible.len() < self.width {
            match self.buffer.pop_front() {
                Some(v) => self.visible.push_back(v),
                None => break,
            }
        }
        while self.visible.len() < self.width {
            match self.entry.pop_front() {
                Some(v) => self.visible.push_back(v),
                None => break,
            }
        }
        self.buffer.extend(self.entry.drain(..));
    }

    /// Consumes the oldest visible value.
    pub fn get(&mut self) -> Option<T> {
        self.visible.pop_front()
    }

    /// Reads the oldest visible value without consuming it.
    pub fn peek(&self) -> Option<&T> {
        self.visible.front()
    }

    /// Iterates over the visible values, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &T> {
        self.visible.iter()
    }

    /// Whether every stage is empty.
    pub fn is_empty(&self) -> bool {
        self.entry.is_empty() && self.buffer.is_empty() && self.visible.is_empty()
    }

    /// Total number of values held across all stages.
    pub fn len(&self) -> usize {
        self.entry.len() + self.buffer.len() + self.visible.len()
    }

    /// Clears every stage.
    pub fn flush(&mut self) {
        self.entry.clear();
        self.buffer.clear();
        self.visible.clear();
    }

    /// Keeps only the values satisfying `keep`, in every stage.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entry.retain(&mut keep);
        self.buffer.retain(&mut keep);
        self.visible.retain(&mut keep);
    }
}
