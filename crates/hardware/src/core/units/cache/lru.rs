//! Least Recently Used (LRU) line store.
//!
//! A fixed-capacity, fully associative store of whole cache lines. It keeps a
//! usage stack: index 0 is the Most Recently Used line, the last index is the
//! Least Recently Used line and the next victim.
//!
//! # Performance
//!
//! - **Time Complexity:** O(N) lookups and touches, N being the capacity in lines.
//! - **Space Complexity:** O(N) lines plus their payloads.

use crate::common::addr::LineAddr;

/// Line-granular LRU store carrying a payload `V` per line.
///
/// Instruction caches use `V = ()` (presence only); data caches carry the
/// line's bytes.
#[derive(Clone, Debug)]
pub struct LruCache<V> {
    /// Usage stack, MRU first.
    lines: Vec<(LineAddr, V)>,
    capacity: usize,
    line_bytes: usize,
}

impl<V> LruCache<V> {
    /// Creates an empty store of `capacity` lines of `line_bytes` bytes.
    pub fn new(capacity: usize, line_bytes: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity),
            capacity,
            line_bytes,
        }
    }

    /// Line size in bytes.
    #[inline]
    pub const fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Capacity in lines.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no line is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line containing byte address `addr`.
    #[inline]
    pub const fn line_of(&self, addr: u32) -> LineAddr {
        LineAddr::containing(addr, self.line_bytes)
    }

    fn position(&self, line: LineAddr) -> Option<usize> {
        self.lines.iter().position(|(l, _)| *l == line)
    }

    /// Whether `line` is resident. Does not update recency.
    pub fn contains(&self, line: LineAddr) -> bool {
        self.position(line).is_some()
    }

    /// Marks `line` most recently used. Returns `false` on a miss.
    pub fn touch(&mut self, line: LineAddr) -> bool {
        match self.position(line) {
            Some(pos) => {
                let entry = self.lines.remove(pos);
                self.lines.insert(0, entry);
                true
            }
            None => false,
        }
    }

    /// Reads a resident line's payload and marks it most recently used.
    pub fn get(&mut self, line: LineAddr) -> Option<&V> {
        if self.touch(line) {
            self.lines.first().map(|(_, v)| v)
        } else {
            None
        }
    }

    /// Mutable access to a resident line's payload; marks it most recently used.
    pub fn get_mut(&mut self, line: LineAddr) -> Option<&mut V> {
        if self.touch(line) {
            self.lines.first_mut().map(|(_, v)| v)
        } else {
            None
        }
    }

    /// Reads a payload without changing recency.
    pub fn peek(&self, line: LineAddr) -> Option<&V> {
        self.lines.iter().find(|(l, _)| *l == line).map(|(_, v)| v)
    }

    /// Installs or replaces `line` as most recently used.
    ///
    /// Returns the evicted least recently used line when the store was full.
    pub fn put(&mut self, line: LineAddr, value: V) -> Option<(LineAddr, V)> {
        self.lines.retain(|(l, _)| *l != line);
        let evicted = if self.lines.len() >= self.capacity {
            self.lines.pop()
        } else {
            None
        };
        self.lines.insert(0, (line, value));
        evicted
    }

    /// Drops `line`, returning its payload.
    pub fn remove(&mut self, line: LineAddr) -> Option<V> {
        self.position(line).map(|pos| self.lines.remove(pos).1)
    }

    /// Iterates resident lines, most recently used first.
    pub fn iter(&self) -> impl Iterator<Item = (LineAddr, &V)> {
        self.lines.iter().map(|(l, v)| (*l, v))
    }
}
