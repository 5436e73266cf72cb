//! Data and instruction caches.
//!
//! Caches are fully associative, line granular and use least-recently-used
//! replacement. The data side is kept coherent across cores:
//! 1. **Line Store:** `LruCache`, shared by instruction, data and shared caches.
//! 2. **Directory:** `MsiDirectory` with per-line locks and peer command queues.
//! 3. **Controller:** `CacheController`, the per-core multi-cycle access state machine.

/// Coherent data-cache controller.
pub mod controller;

/// Least-recently-used line store.
pub mod lru;

/// MSI coherence directory.
pub mod msi;

pub use controller::{AccessKind, CacheController, MemoryAccess};
pub use lru::LruCache;
pub use msi::{MsiDirectory, MsiState};
