//! # Simulator Testing Library
//!
//! Central entry point for the integration test suite. Shared helpers live in
//! `common`; the tests themselves are grouped by component under `unit`.

/// Shared test infrastructure.
///
/// - **Harness**: A `TestContext` that assembles a program, runs it on a chosen
///   machine variant and exposes the resulting architectural state.
/// - **Programs**: Reference assembly programs with known results.
pub mod common;

/// Component and whole-machine tests.
pub mod unit;
