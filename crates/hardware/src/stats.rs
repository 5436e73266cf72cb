//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for one core or a whole run. It provides:
//! 1. **Cycle and IPC:** Total cycles, retired instructions, and derived CPI/IPC.
//! 2. **Instruction mix:** Counts by category (load, store, branch).
//! 3. **Pipeline:** Forwards, renames, rename bypasses, stalls and flushes.
//! 4. **Branch prediction:** BTB predictions and mispredictions.
//! 5. **Memory hierarchy:** Hit/miss counts for L1-I and L1-D, coherence traffic.

use std::fmt::Write as _;

use serde::Serialize;

/// Simulation statistics structure tracking all performance metrics.
///
/// Each core keeps its own copy; `merge` folds them into a run total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Total simulator cycles elapsed.
    pub cycles: u64,
    /// Number of instructions retired.
    pub instructions_retired: u64,

    /// Count of load instructions retired.
    pub inst_load: u64,
    /// Count of store instructions retired.
    pub inst_store: u64,
    /// Count of conditional branches resolved.
    pub branches: u64,
    /// Count of conditional branches resolved as taken.
    pub branches_taken: u64,
    /// Count of jumps and returns retired.
    pub inst_jump: u64,

    /// Values handed from producer to consumer through a forwarding mailbox.
    pub forwards: u64,
    /// Physical slots allocated for a write-after-write hazard.
    pub renames: u64,
    /// Operands read from a completed physical slot.
    pub rename_bypasses: u64,
    /// Candidate-cycles the issue unit held an instruction.
    pub stalls: u64,
    /// Pipeline flushes that redirected fetch away from the fall-through path.
    pub flushes: u64,
    /// Instructions discarded by flushes.
    pub squashed: u64,

    /// BTB hits used to redirect fetch.
    pub btb_predictions: u64,
    /// Predictions that turned out wrong.
    pub btb_mispredictions: u64,

    /// L1 instruction cache hit count.
    pub icache_hits: u64,
    /// L1 instruction cache miss count.
    pub icache_misses: u64,
    /// L1 data cache hit count.
    pub dcache_hits: u64,
    /// L1 data cache miss count.
    pub dcache_misses: u64,
    /// Evict / write-back commands sent to peers.
    pub coherence_requests: u64,
    /// Evict / write-back commands served for peers.
    pub snoops_served: u64,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"pipeline"`, `"instruction_mix"`, `"branch"`, `"memory"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "pipeline", "instruction_mix", "branch", "memory"];

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

impl SimStats {
    /// Adds every counter of `other` except `cycles`, which is a shared clock.
    pub fn merge(&mut self, other: &Self) {
        self.instructions_retired += other.instructions_retired;
        self.inst_load += other.inst_load;
        self.inst_store += other.inst_store;
        self.branches += other.branches;
        self.branches_taken += other.branches_taken;
        self.inst_jump += other.inst_jump;
        self.forwards += other.forwards;
        self.renames += other.renames;
        self.rename_bypasses += other.rename_bypasses;
        self.stalls += other.stalls;
        self.flushes += other.flushes;
        self.squashed += other.squashed;
        self.btb_predictions += other.btb_predictions;
        self.btb_mispredictions += other.btb_mispredictions;
        self.icache_hits += other.icache_hits;
        self.icache_misses += other.icache_misses;
        self.dcache_hits += other.dcache_hits;
        self.dcache_misses += other.dcache_misses;
        self.coherence_requests += other.coherence_requests;
        self.snoops_served += other.snoops_served;
        self.cycles = self.cycles.max(other.cycles);
    }

    /// Renders the requested sections as text.
    ///
    /// Unknown section names are ignored; an empty slice renders everything.
    pub fn render_sections(&self, sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cyc = self.cycles.max(1);
        let instr = self.instructions_retired.max(1);
        let mut out = String::new();

        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "PIPELINE SIMULATION STATISTICS");
        let _ = writeln!(out, "==========================================================");
        if want("summary") {
            let _ = writeln!(out, "sim_cycles               {}", self.cycles);
            let _ = writeln!(out, "sim_insts                {}", self.instructions_retired);
            let _ = writeln!(
                out,
                "sim_ipc                  {:.4}",
                self.instructions_retired as f64 / cyc as f64
            );
            let _ = writeln!(out, "sim_cpi                  {:.4}", cyc as f64 / instr as f64);
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("pipeline") {
            let _ = writeln!(out, "PIPELINE");
            let _ = writeln!(out, "  forwards               {}", self.forwards);
            let _ = writeln!(out, "  renames                {}", self.renames);
            let _ = writeln!(out, "  rename_bypasses        {}", self.rename_bypasses);
            let _ = writeln!(out, "  stalls                 {}", self.stalls);
            let _ = writeln!(out, "  flushes                {}", self.flushes);
            let _ = writeln!(out, "  squashed               {}", self.squashed);
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("instruction_mix") {
            let _ = writeln!(out, "INSTRUCTION MIX");
            for (name, n) in [
                ("op.load", self.inst_load),
                ("op.store", self.inst_store),
                ("op.branch", self.branches),
                ("op.jump", self.inst_jump),
            ] {
                let _ = writeln!(out, "  {name:<22} {n} ({:.2}%)", pct(n, instr));
            }
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("branch") {
            let hits = self.btb_predictions;
            let miss = self.btb_mispredictions;
            let _ = writeln!(out, "BRANCH PREDICTION");
            let _ = writeln!(out, "  branches.taken         {} / {}", self.branches_taken, self.branches);
            let _ = writeln!(out, "  btb.predictions        {hits}");
            let _ = writeln!(out, "  btb.mispredicts        {miss}");
            let _ = writeln!(out, "  btb.accuracy           {:.2}%", pct(hits - miss.min(hits), hits));
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("memory") {
            let _ = writeln!(out, "MEMORY HIERARCHY");
            for (name, hits, misses) in [
                ("L1-I", self.icache_hits, self.icache_misses),
                ("L1-D", self.dcache_hits, self.dcache_misses),
            ] {
                let total = hits + misses;
                let _ = writeln!(
                    out,
                    "  {:<6} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}%",
                    name,
                    total,
                    hits,
                    pct(misses, total)
                );
            }
            let _ = writeln!(out, "  coherence.requests     {}", self.coherence_requests);
            let _ = writeln!(out, "  coherence.snoops       {}", self.snoops_served);
        }
        let _ = writeln!(out, "==========================================================");
        out
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_counters_and_keeps_clock() {
        let mut a = SimStats {
            cycles: 100,
            instructions_retired: 10,
            forwards: 2,
            ..SimStats::default()
        };
        let b = SimStats {
            cycles: 100,
            instructions_retired: 5,
            snoops_served: 3,
            ..SimStats::default()
        };
        a.merge(&b);
        assert_eq!(a.cycles, 100);
        assert_eq!(a.instructions_retired, 15);
        assert_eq!(a.forwards, 2);
        assert_eq!(a.snoops_served, 3);
    }

    #[test]
    fn sections_are_selective() {
        let stats = SimStats::default();
        let text = stats.render_sections(&["memory".to_string()]);
        assert!(text.contains("MEMORY HIERARCHY"));
        assert!(!text.contains("PIPELINE\n"));
        assert!(stats.render_sections(&[]).contains("BRANCH PREDICTION"));
    }
}
