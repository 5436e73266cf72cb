//! Instruction pipeline implementation.
//!
//! The pipeline is built from:
//! 1. **Latches:** Staged buses giving every hop one cycle of delay.
//! 2. **Signals:** Sequence IDs, runners, completions and branch events.
//! 3. **Bookkeeping:** Reorder buffer, pending queue, rename slots and forwarding mailboxes.
//! 4. **Hazards:** The issue decision procedure.
//! 5. **Stages and Engine:** The per-cycle stage functions and the driver that sequences them.

/// Per-core cycle driver.
pub mod engine;

/// Single-assignment forwarding mailboxes.
pub mod forward;

/// Issue hazard classification.
pub mod hazards;

/// Staged inter-unit buses.
pub mod latches;

/// Bounded queue of stalled instructions.
pub mod queue;

/// Physical rename slots.
pub mod rename;

/// Reorder buffer.
pub mod rob;

/// Records carried between units.
pub mod signals;

/// Stage implementations.
pub mod stages;

/// Observation hooks.
pub mod traits;
