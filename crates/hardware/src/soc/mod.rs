//! System-on-Chip (SoC) Components.
//!
//! The uncore shared by every simulated core: main memory, the coherence
//! directory and the optional shared cache, plus the builder that assembles
//! them from configuration.

/// Uncore builder.
pub mod builder;

/// Shared cache level between private caches and memory.
pub mod interconnect;

/// Main memory.
pub mod memory;

pub use builder::System;
