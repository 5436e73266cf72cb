//! Functional units shared by the pipeline stages.
//!
//! This module contains the branch unit with its target buffer and the cache
//! system with MSI coherence.

/// Branch unit and Branch Target Buffer.
pub mod bru;

/// Caches, coherence directory and the data-cache controller.
pub mod cache;
