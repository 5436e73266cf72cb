//! Application Binary Interface (ABI) register names.
//!
//! Maps the 32 logical register ordinals to their ABI names and parses both
//! ABI (`a0`, `sp`, `s0`/`fp`) and architectural (`x10`) spellings.

use crate::common::reg::RegisterId;

/// ABI name of each register, indexed by ordinal.
pub const NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Parses a register name.
///
/// Accepts ABI names, the `fp` alias for `s0`, and `x0`..`x31`.
pub fn parse_register(name: &str) -> Option<RegisterId> {
    if name == "fp" {
        return RegisterId::new(8);
    }
    if let Some(idx) = NAMES.iter().position(|n| *n == name) {
        return RegisterId::new(idx);
    }
    let digits = name.strip_prefix('x')?;
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    RegisterId::new(digits.parse().ok()?)
}
