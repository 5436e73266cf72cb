//! Coherent data-cache controller.
//!
//! Each core owns one controller wrapping its private L1 data cache. Loads and
//! stores become a `MemoryAccess`: a multi-cycle state machine stepped once per
//! cycle by the unit that owns it. A multi-line access runs line by line:
//!
//! `Locking -> WaitingOnPeers -> Fetching(latency) | Accessing(latency) -> next line`
//!
//! 1. **Locking:** Take the line's read or write lock in the directory; retry every cycle.
//! 2. **WaitingOnPeers:** Ask Modified peers to write back (and, for writes, Shared
//!    peers to evict); wait until every command has been served.
//! 3. **Fetching / Accessing:** Count down the fill or hit latency, then copy or
//!    apply the bytes, update the MSI state and release the lock.
//!
//! Without an L1 data cache every access goes straight to memory and costs the
//! memory latency once.

use std::collections::VecDeque;

use crate::common::addr::LineAddr;
use crate::common::error::InvariantViolation;
use crate::config::Config;
use crate::core::units::cache::LruCache;
use crate::core::units::cache::msi::{CommandKey, CommandKind, MsiDirectory, MsiState};
use crate::soc::System;
use crate::stats::SimStats;

/// Direction of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Load bytes.
    Read,
    /// Store bytes.
    Write,
}

/// The part of an access that falls in one cache line.
#[derive(Clone, Debug)]
struct Chunk {
    line: LineAddr,
    addrs: Vec<u32>,
    /// Bytes to store, parallel to `addrs`. Empty for reads.
    values: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Locking,
    WaitingOnPeers { cmds: Vec<CommandKey> },
    Fetching { remaining: u64 },
    Accessing { remaining: u64 },
}

/// An in-progress load or store.
#[derive(Clone, Debug)]
pub struct MemoryAccess {
    kind: AccessKind,
    chunks: VecDeque<Chunk>,
    phase: Phase,
    /// Whether the current chunk's line lock is held.
    locked: bool,
    /// Whether this write is queued on the current chunk's line lock.
    waiting: bool,
    /// Bytes gathered so far, in request order.
    data: Vec<u8>,
}

impl MemoryAccess {
    fn new(kind: AccessKind, chunks: VecDeque<Chunk>) -> Self {
        Self {
            kind,
            chunks,
            phase: Phase::Locking,
            locked: false,
            waiting: false,
            data: Vec::new(),
        }
    }

    /// Direction of the access.
    pub const fn kind(&self) -> AccessKind {
        self.kind
    }

    /// Whether every line has been served.
    pub fn is_done(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Bytes loaded so far, in the order the addresses were requested.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the access, returning the loaded bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Per-core L1 data cache and coherence agent.
#[derive(Debug)]
pub struct CacheController {
    core: usize,
    l1: Option<LruCache<Vec<u8>>>,
    line_bytes: usize,
    hit_latency: u64,
}

impl CacheController {
    /// Creates the controller for `core`.
    pub fn new(core: usize, config: &Config) -> Self {
        let l1d = &config.cache.l1_d;
        Self {
            core,
            l1: l1d.enabled.then(|| LruCache::new(l1d.lines, l1d.line_bytes)),
            line_bytes: config.data_line_bytes(),
            hit_latency: l1d.latency,
        }
    }

    /// The private data cache, when enabled.
    pub fn l1(&self) -> Option<&LruCache<Vec<u8>>> {
        self.l1.as_ref()
    }

    fn chunks(&self, addrs: &[u32], values: &[u8]) -> VecDeque<Chunk> {
        let mut chunks: VecDeque<Chunk> = VecDeque::new();
        for (i, &addr) in addrs.iter().enumerate() {
            let line = LineAddr::containing(addr, self.line_bytes);
            let value = values.get(i).copied();
            match chunks.back_mut() {
                Some(c) if c.line == line => {
                    c.addrs.push(addr);
                    c.values.extend(value);
                }
                _ => chunks.push_back(Chunk {
                    line,
                    addrs: vec![addr],
                    values: value.into_iter().collect(),
                }),
            }
        }
        chunks
    }

    /// Starts a load of `addrs`.
    pub fn read(&self, addrs: &[u32]) -> MemoryAccess {
        MemoryAccess::new(AccessKind::Read, self.chunks(addrs, &[]))
    }

    /// Starts a store of `(address, byte)` pairs.
    pub fn write(&self, changes: &[(u32, u8)]) -> MemoryAccess {
        let (addrs, values): (Vec<u32>, Vec<u8>) = changes.iter().copied().unzip();
        MemoryAccess::new(AccessKind::Write, self.chunks(&addrs, &values))
    }

    /// Advances `access` by one cycle.
    ///
    /// # Returns
    ///
    /// `true` once every line has been served.
    ///
    /// # Errors
    ///
    /// An `InvariantViolation` when the directory and the cache disagree.
    pub fn step(
        &mut self,
        access: &mut MemoryAccess,
        sys: &mut System,
        stats: &mut SimStats,
    ) -> Result<bool, InvariantViolation> {
        if access.is_done() {
            return Ok(true);
        }
        if self.l1.is_none() {
            return Ok(Self::step_uncached(access, sys));
        }
        loop {
            let Some(line) = access.chunks.front().map(|c| c.line) else {
                return Ok(true);
            };
            match std::mem::replace(&mut access.phase, Phase::Locking) {
                Phase::Locking => {
                    let sem = sys.directory.semaphore(line);
                    let acquired = match access.kind {
                        AccessKind::Read => sem.try_read(),
                        AccessKind::Write => sem.try_write(access.waiting),
                    };
                    if !acquired {
                        access.waiting = access.kind == AccessKind::Write;
                        return Ok(false);
                    }
                    access.waiting = false;
                    access.locked = true;
                    if sys.directory.state(self.core, line) == MsiState::Invalid {
                        stats.dcache_misses += 1;
                    } else {
                        stats.dcache_hits += 1;
                    }
                    let cmds = self.request_peers(access.kind, line, &mut sys.directory, stats);
                    access.phase = Phase::WaitingOnPeers { cmds };
                }
                Phase::WaitingOnPeers { cmds } => {
                    if cmds.iter().any(|c| sys.directory.is_outstanding(c)) {
                        access.phase = Phase::WaitingOnPeers { cmds };
                        return Ok(false);
                    }
                    access.phase = if sys.directory.state(self.core, line) == MsiState::Invalid {
                        Phase::Fetching {
                            remaining: sys.shared.fill(line),
                        }
                    } else {
                        Phase::Accessing {
                            remaining: self.hit_latency,
                        }
                    };
                }
                Phase::Fetching { remaining } if remaining > 1 => {
                    access.phase = Phase::Fetching {
                        remaining: remaining - 1,
                    };
                    return Ok(false);
                }
                Phase::Accessing { remaining } if remaining > 1 => {
                    access.phase = Phase::Accessing {
                        remaining: remaining - 1,
                    };
                    return Ok(false);
                }
                Phase::Fetching { .. } | Phase::Accessing { .. } => {
                    self.perform(access, sys)?;
                    let _ = access.chunks.pop_front();
                    return Ok(access.is_done());
                }
            }
        }
    }

    fn request_peers(
        &self,
        kind: AccessKind,
        line: LineAddr,
        dir: &mut MsiDirectory,
        stats: &mut SimStats,
    ) -> Vec<CommandKey> {
        let mut cmds: Vec<CommandKey> = dir
            .holders(self.core, line, MsiState::Modified)
            .into_iter()
            .map(|target| CommandKey {
                target,
                line,
                kind: CommandKind::WriteBack,
            })
            .collect();
        if kind == AccessKind::Write {
            cmds.extend(
                dir.holders(self.core, line, MsiState::Shared)
                    .into_iter()
                    .map(|target| CommandKey {
                        target,
                        line,
                        kind: CommandKind::Evict,
                    }),
            );
        }
        for cmd in &cmds {
            if dir.request(*cmd) {
                stats.coherence_requests += 1;
            }
        }
        cmds
    }

    /// Copies or applies the current chunk, updates MSI state and releases the lock.
    fn perform(&mut self, access: &mut MemoryAccess, sys: &mut System) -> Result<(), InvariantViolation> {
        let Some(chunk) = access.chunks.front() else {
            return Ok(());
        };
        let line = chunk.line;
        let Some(l1) = self.l1.as_mut() else {
            return Err(InvariantViolation::Unreachable("cached access without a data cache"));
        };
        let state = sys.directory.state(self.core, line);
        if state != MsiState::Invalid && !l1.contains(line) {
            return Err(InvariantViolation::MissingLine {
                core: self.core,
                line,
                state: state.name(),
            });
        }
        if !l1.contains(line) {
            let data = sys.memory.read_line(line, self.line_bytes);
            Self::install(self.core, l1, line, data, sys);
            sys.directory.set_state(self.core, line, MsiState::Shared);
        }
        match access.kind {
            AccessKind::Read => {
                if let Some(bytes) = l1.get(line) {
                    access.data.extend(
                        chunk
                            .addrs
                            .iter()
                            .map(|a| bytes.get(line.offset_of(*a)).copied().unwrap_or(0)),
                    );
                }
                sys.directory.semaphore(line).release_read(line)?;
                sys.directory.prune(line);
            }
            AccessKind::Write => {
                if let Some(bytes) = l1.get_mut(line) {
                    for (addr, value) in chunk.addrs.iter().zip(&chunk.values) {
                        if let Some(b) = bytes.get_mut(line.offset_of(*addr)) {
                            *b = *value;
                        }
                    }
                }
                sys.directory.set_state(self.core, line, MsiState::Modified);
                sys.directory.semaphore(line).release_write(line)?;
                sys.directory.prune(line);
            }
        }
        access.locked = false;
        access.phase = Phase::Locking;
        sys.directory.check_line(line)
    }

    /// Installs a line, writing back a Modified victim.
    fn install(
        core: usize,
        l1: &mut LruCache<Vec<u8>>,
        line: LineAddr,
        data: Vec<u8>,
        sys: &mut System,
    ) {
        if let Some((victim, bytes)) = l1.put(line, data) {
            if sys.directory.state(core, victim) == MsiState::Modified {
                sys.memory.write_line(victim, &bytes);
                sys.shared.write_back(victim);
            }
            sys.directory.set_state(core, victim, MsiState::Invalid);
        }
    }

    fn step_uncached(access: &mut MemoryAccess, sys: &mut System) -> bool {
        let remaining = match access.phase {
            Phase::Accessing { remaining } => remaining,
            _ => sys.shared.memory_latency(),
        };
        if remaining > 1 {
            access.phase = Phase::Accessing {
                remaining: remaining - 1,
            };
            return false;
        }
        for chunk in access.chunks.drain(..) {
            match access.kind {
                AccessKind::Read => access
                    .data
                    .extend(chunk.addrs.iter().map(|a| sys.memory.read_byte(*a))),
                AccessKind::Write => {
                    for (addr, value) in chunk.addrs.iter().zip(&chunk.values) {
                        sys.memory.write_byte(*addr, *value);
                    }
                }
            }
        }
        access.phase = Phase::Locking;
        true
    }

    /// Serves the coherence commands peers have addressed to this core.
    ///
    /// # Errors
    ///
    /// `MissingLine` when a write-back targets a line the directory says is
    /// Modified here but the cache no longer holds.
    pub fn snoop(&mut self, sys: &mut System, stats: &mut SimStats) -> Result<(), InvariantViolation> {
        for cmd in sys.directory.take_commands(self.core) {
            let state = sys.directory.state(self.core, cmd.line);
            let data = self.l1.as_mut().and_then(|l1| l1.remove(cmd.line));
            if state == MsiState::Modified {
                let Some(bytes) = data else {
                    return Err(InvariantViolation::MissingLine {
                        core: self.core,
                        line: cmd.line,
                        state: state.name(),
                    });
                };
                sys.memory.write_line(cmd.line, &bytes);
                sys.shared.write_back(cmd.line);
            }
            sys.directory.set_state(self.core, cmd.line, MsiState::Invalid);
            sys.directory.complete(&cmd);
            stats.snoops_served += 1;
            sys.directory.check_line(cmd.line)?;
        }
        Ok(())
    }

    /// Abandons `access`, releasing any lock it holds.
    ///
    /// # Errors
    ///
    /// `NegativeSemaphore` if the directory lost track of the lock.
    pub fn abort(&mut self, access: &MemoryAccess, sys: &mut System) -> Result<(), InvariantViolation> {
        let Some(line) = access.chunks.front().map(|c| c.line) else {
            return Ok(());
        };
        if self.l1.is_none() {
            return Ok(());
        }
        let sem = sys.directory.semaphore(line);
        match (access.locked, access.kind) {
            (true, AccessKind::Read) => sem.release_read(line)?,
            (true, AccessKind::Write) => sem.release_write(line)?,
            (false, AccessKind::Write) if access.waiting => sem.cancel_waiting_writer(),
            (false, _) => {}
        }
        sys.directory.prune(line);
        Ok(())
    }

    /// Writes every Modified line back to memory, leaving it Shared.
    pub fn drain(&mut self, sys: &mut System) {
        let Some(l1) = self.l1.as_ref() else {
            return;
        };
        for (line, bytes) in l1.iter() {
            if sys.directory.state(self.core, line) == MsiState::Modified {
                sys.memory.write_line(line, bytes);
                sys.shared.write_back(line);
                sys.directory.set_state(self.core, line, MsiState::Shared);
            }
        }
    }
}
