//! Pipeline stage implementations.
//!
//! Every stage is a free function over the `Cpu` and runs once per cycle:
//! 1. **Fetch:** Places instruction addresses on the decode bus.
//! 2. **Decode:** Stamps instructions and steers fetch around control flow.
//! 3. **Issue:** Registers instructions in the ROB and dispatches them once hazard-free.
//! 4. **Execute:** Runs instructions, loads operands and resolves branches.
//! 5. **Writeback:** Records completions and retires in program order.

/// Instruction decode stage.
pub mod decode;

/// Execute units.
pub mod execute;

/// Instruction fetch stage.
pub mod fetch;

/// Issue unit and pending queue.
pub mod issue;

/// Write-back and commit.
pub mod writeback;

pub use decode::decode_stage;
pub use execute::execute_stage;
pub use fetch::fetch_stage;
pub use issue::issue_stage;
pub use writeback::writeback_stage;
