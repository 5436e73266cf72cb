//! MSI coherence directory.
//!
//! Shared by every core's data cache. The directory owns:
//! 1. **Line States:** `(core, line) -> {Invalid, Shared, Modified}`, absent meaning Invalid.
//! 2. **Line Semaphores:** Many readers or one writer per line; while any writer waits, new readers are refused.
//! 3. **Command Queues:** Evict / write-back requests addressed to a core, deduplicated while outstanding.
//! 4. **Invariant Checks:** At most one Modified holder, and a Modified holder excludes all others.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::common::addr::LineAddr;
use crate::common::error::InvariantViolation;

/// Coherence state of one line in one private cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MsiState {
    /// Not present.
    #[default]
    Invalid,
    /// Clean copy; other cores may also hold it.
    Shared,
    /// Dirty exclusive copy.
    Modified,
}

impl MsiState {
    /// Short name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Shared => "shared",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for MsiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a peer is asked to do with a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Drop the line.
    Evict,
    /// Flush dirty bytes to the shared level, then drop the line.
    WriteBack,
}

/// A coherence command addressed to one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandKey {
    /// Core that must act.
    pub target: usize,
    /// Line concerned.
    pub line: LineAddr,
    /// Action.
    pub kind: CommandKind,
}

/// Reader/writer lock for one line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineSemaphore {
    readers: u32,
    writer: bool,
    /// Writers that failed to acquire and are still retrying.
    waiting_writers: u32,
}

impl LineSemaphore {
    /// Takes a read lock. Fails while a writer holds or waits on the line.
    pub fn try_read(&mut self) -> bool {
        if self.writer || self.waiting_writers > 0 {
            return false;
        }
        self.readers += 1;
        true
    }

    /// Takes the write lock.
    ///
    /// `waiting` says whether the caller already queued itself on an earlier
    /// failed attempt. A first failure queues the caller; a success dequeues it.
    pub fn try_write(&mut self, waiting: bool) -> bool {
        if self.writer || self.readers > 0 {
            if !waiting {
                self.waiting_writers += 1;
            }
            return false;
        }
        if waiting {
            self.waiting_writers = self.waiting_writers.saturating_sub(1);
        }
        self.writer = true;
        true
    }

    /// Drops a read lock.
    ///
    /// # Errors
    ///
    /// `NegativeSemaphore` when no reader holds the line.
    pub fn release_read(&mut self, line: LineAddr) -> Result<(), InvariantViolation> {
        if self.readers == 0 {
            return Err(InvariantViolation::NegativeSemaphore { line });
        }
        self.readers -= 1;
        Ok(())
    }

    /// Drops the write lock.
    ///
    /// # Errors
    ///
    /// `NegativeSemaphore` when no writer holds the line.
    pub fn release_write(&mut self, line: LineAddr) -> Result<(), InvariantViolation> {
        if !self.writer {
            return Err(InvariantViolation::NegativeSemaphore { line });
        }
        self.writer = false;
        Ok(())
    }

    /// Withdraws one waiting writer.
    pub fn cancel_waiting_writer(&mut self) {
        self.waiting_writers = self.waiting_writers.saturating_sub(1);
    }

    /// Writers queued behind the current holders.
    pub const fn waiting_writers(&self) -> u32 {
        self.waiting_writers
    }

    /// Current reader count.
    pub const fn readers(&self) -> u32 {
        self.readers
    }

    /// Whether a writer holds the line.
    pub const fn has_writer(&self) -> bool {
        self.writer
    }

    /// Whether nobody holds or waits on the line.
    pub const fn is_idle(&self) -> bool {
        self.readers == 0 && !self.writer && self.waiting_writers == 0
    }
}

/// Directory of MSI states, line locks and pending peer commands.
#[derive(Debug)]
pub struct MsiDirectory {
    cores: usize,
    states: HashMap<(usize, LineAddr), MsiState>,
    semaphores: HashMap<LineAddr, LineSemaphore>,
    queues: Vec<VecDeque<CommandKey>>,
    outstanding: HashSet<CommandKey>,
}

impl MsiDirectory {
    /// Creates an empty directory for `cores` private caches.
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            states: HashMap::new(),
            semaphores: HashMap::new(),
            queues: vec![VecDeque::new(); cores],
            outstanding: HashSet::new(),
        }
    }

    /// Number of participating cores.
    pub const fn cores(&self) -> usize {
        self.cores
    }

    /// State of `line` in `core`'s cache.
    pub fn state(&self, core: usize, line: LineAddr) -> MsiState {
        self.states.get(&(core, line)).copied().unwrap_or_default()
    }

    /// Sets the state of `line` in `core`'s cache. Invalid entries are dropped.
    pub fn set_state(&mut self, core: usize, line: LineAddr, state: MsiState) {
        if state == MsiState::Invalid {
            let _ = self.states.remove(&(core, line));
        } else {
            let _ = self.states.insert((core, line), state);
        }
    }

    /// Cores other than `me` holding `line` in `state`.
    pub fn holders(&self, me: usize, line: LineAddr, state: MsiState) -> Vec<usize> {
        (0..self.cores)
            .filter(|&c| c != me && self.state(c, line) == state)
            .collect()
    }

    /// The lock for `line`.
    pub fn semaphore(&mut self, line: LineAddr) -> &mut LineSemaphore {
        self.semaphores.entry(line).or_default()
    }

    /// Drops the lock record for `line` once nobody holds or waits on it.
    pub fn prune(&mut self, line: LineAddr) {
        if self.semaphores.get(&line).is_some_and(LineSemaphore::is_idle) {
            let _ = self.semaphores.remove(&line);
        }
    }

    /// Number of lines with a live lock record.
    pub fn locked_lines(&self) -> usize {
        self.semaphores.len()
    }

    /// Number of `(core, line)` pairs in a valid state.
    pub fn tracked_entries(&self) -> usize {
        self.states.len()
    }

    /// Read-only view of the lock for `line`.
    pub fn semaphore_of(&self, line: LineAddr) -> LineSemaphore {
        self.semaphores.get(&line).copied().unwrap_or_default()
    }

    /// Queues `cmd` for its target. Returns `false` if an identical command is already outstanding.
    pub fn request(&mut self, cmd: CommandKey) -> bool {
        if !self.outstanding.insert(cmd) {
            return false;
        }
        if let Some(q) = self.queues.get_mut(cmd.target) {
            q.push_back(cmd);
        }
        true
    }

    /// Whether `cmd` has been queued and not yet served.
    pub fn is_outstanding(&self, cmd: &CommandKey) -> bool {
        self.outstanding.contains(cmd)
    }

    /// Removes every queued command addressed to `core`.
    pub fn take_commands(&mut self, core: usize) -> Vec<CommandKey> {
        self.queues
            .get_mut(core)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// Marks `cmd` served.
    pub fn complete(&mut self, cmd: &CommandKey) {
        let _ = self.outstanding.remove(cmd);
    }

    /// Number of commands not yet served.
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Checks the exclusion invariant for `line`.
    ///
    /// # Errors
    ///
    /// `IllegalMsiState` when two cores hold it Modified, or a Modified holder
    /// coexists with a Shared one.
    pub fn check_line(&self, line: LineAddr) -> Result<(), InvariantViolation> {
        let mut modified = 0usize;
        let mut shared = 0usize;
        for core in 0..self.cores {
            match self.state(core, line) {
                MsiState::Modified => modified += 1,
                MsiState::Shared => shared += 1,
                MsiState::Invalid => {}
            }
        }
        if modified > 1 {
            return Err(InvariantViolation::IllegalMsiState {
                line,
                detail: format!("{modified} modified holders"),
            });
        }
        if modified == 1 && shared > 0 {
            return Err(InvariantViolation::IllegalMsiState {
                line,
                detail: format!("modified holder alongside {shared} shared"),
            });
        }
        Ok(())
    }

    /// Checks every tracked line.
    ///
    /// # Errors
    ///
    /// The first violation found.
    pub fn check_all(&self) -> Result<(), InvariantViolation> {
        let lines: HashSet<LineAddr> = self.states.keys().map(|(_, l)| *l).collect();
        for line in lines {
            self.check_line(line)?;
        }
        Ok(())
    }
}
