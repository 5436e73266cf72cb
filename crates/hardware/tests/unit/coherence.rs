//! Coherence Tests.
//!
//! Drives several `CacheController`s against one `System` and checks the
//! results against a flat sequential memory. Every core snoops every cycle,
//! as the simulator does.

use pipesim_core::common::LineAddr;
use pipesim_core::config::{Config, Variant};
use pipesim_core::core::units::cache::{CacheController, MemoryAccess, MsiState};
use pipesim_core::soc::System;
use pipesim_core::stats::SimStats;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn machine(cores: usize) -> (Config, System, Vec<CacheController>) {
    let mut config = Config::for_variant(Variant::MultiCore);
    config.system.cores = cores;
    let sys = System::new(&config);
    let ctrls = (0..cores).map(|c| CacheController::new(c, &config)).collect();
    (config, sys, ctrls)
}

/// Steps `access` on `core` to completion while every controller keeps snooping.
fn complete(
    core: usize,
    mut access: MemoryAccess,
    sys: &mut System,
    ctrls: &mut [CacheController],
    stats: &mut SimStats,
) -> MemoryAccess {
    for _ in 0..10_000 {
        for ctrl in ctrls.iter_mut() {
            ctrl.snoop(sys, stats).unwrap();
        }
        if ctrls[core].step(&mut access, sys, stats).unwrap() {
            sys.directory.check_all().unwrap();
            return access;
        }
        sys.directory.check_all().unwrap();
    }
    panic!("access on core {core} never finished");
}

// ══════════════════════════════════════════════════════════
// 1. Scenarios
// ══════════════════════════════════════════════════════════

#[test]
fn readers_share_a_line() {
    let (config, mut sys, mut ctrls) = machine(2);
    let mut stats = SimStats::default();
    for core in 0..2 {
        let access = ctrls[core].read(&[0x10]);
        let _ = complete(core, access, &mut sys, &mut ctrls, &mut stats);
    }
    let line = LineAddr::containing(0x10, config.data_line_bytes());
    assert_eq!(sys.directory.state(0, line), MsiState::Shared);
    assert_eq!(sys.directory.state(1, line), MsiState::Shared);
    assert_eq!(stats.snoops_served, 0);
}

#[test]
fn ping_pong_writes_move_ownership() {
    let (config, mut sys, mut ctrls) = machine(2);
    let mut stats = SimStats::default();
    let line = LineAddr::containing(0x20, config.data_line_bytes());
    for round in 0..4u8 {
        let core = usize::from(round % 2);
        let access = ctrls[core].write(&[(0x20, round)]);
        let _ = complete(core, access, &mut sys, &mut ctrls, &mut stats);
        assert_eq!(sys.directory.state(core, line), MsiState::Modified);
        assert_eq!(sys.directory.state(1 - core, line), MsiState::Invalid);
    }
    assert_eq!(stats.snoops_served, 3);
    let access = ctrls[0].read(&[0x20]);
    let access = complete(0, access, &mut sys, &mut ctrls, &mut stats);
    assert_eq!(access.data(), &[3]);
}

// ══════════════════════════════════════════════════════════
// 2. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    /// Any serial mix of loads and stores across cores behaves like one flat
    /// memory, and the directory never holds an illegal state combination.
    #[test]
    fn serial_accesses_match_flat_memory(
        cores in 2usize..4,
        ops in proptest::collection::vec((0usize..3, any::<bool>(), 0u32..48, any::<u8>()), 1..40),
    ) {
        let (_, mut sys, mut ctrls) = machine(cores);
        let mut stats = SimStats::default();
        let mut model = [0u8; 48];

        for (core, is_write, addr, value) in ops {
            let core = core % cores;
            if is_write {
                let access = ctrls[core].write(&[(addr, value)]);
                let _ = complete(core, access, &mut sys, &mut ctrls, &mut stats);
                model[addr as usize] = value;
            } else {
                let access = ctrls[core].read(&[addr]);
                let access = complete(core, access, &mut sys, &mut ctrls, &mut stats);
                prop_assert_eq!(access.data(), &[model[addr as usize]]);
            }
        }

        for ctrl in &mut ctrls {
            ctrl.drain(&mut sys);
        }
        prop_assert_eq!(&sys.memory.as_slice()[..48], &model[..]);
    }
}
