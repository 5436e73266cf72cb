//! Simulation driver and event sinks.
//!
//! Provides the multi-core `Simulator` facade and the `tracing` observer.

/// `tracing`-backed pipeline observer.
pub mod observer;

/// Multi-core simulation driver.
pub mod simulator;

pub use observer::TracingObserver;
pub use simulator::{ArchState, RunReport, Simulator};
