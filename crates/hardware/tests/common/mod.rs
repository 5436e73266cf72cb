//! Shared test infrastructure.

/// Run helpers and tracing setup.
pub mod harness;

/// Reference programs.
pub mod programs;
