//! # Unit Components
//!
//! Tests grouped by the component they exercise, from the bus primitives up
//! to whole-machine runs across every preset.

/// Staged bus latch timing and flush behaviour.
pub mod bus;

/// LRU line store.
pub mod cache;

/// MSI directory and cache controller under multi-core traffic.
pub mod coherence;

/// Configuration loading, presets and validation.
pub mod config;

/// Architectural equivalence of every preset on the reference programs.
pub mod equivalence;

/// Misprediction recovery and branch target buffer behaviour.
pub mod flush;

/// Forwarding, renaming and issue stalls observed end to end.
pub mod hazards;

/// Assembler and program fault reporting.
pub mod isa;

/// Multi-core runs.
pub mod multicore;

/// Statistics aggregation and rendering.
pub mod stats;
