//! Bus Latch Tests.
//!
//! Verifies the one-cycle visibility rule, FIFO ordering under back-pressure,
//! and flush semantics of the staged `Bus`.

use pipesim_core::core::pipeline::latches::Bus;
use proptest::prelude::*;

// ══════════════════════════════════════════════════════════
// 1. Visibility
// ══════════════════════════════════════════════════════════

#[test]
fn value_is_invisible_until_connect() {
    let mut bus = Bus::new(1);
    bus.add(7).unwrap();
    assert_eq!(bus.peek(), None);
    assert_eq!(bus.get(), None);
    bus.connect();
    assert_eq!(bus.get(), Some(7));
}

#[test]
fn flush_empties_every_stage() {
    let mut bus = Bus::new(2);
    bus.add(1).unwrap();
    bus.connect();
    bus.add(2).unwrap();
    bus.flush();
    assert!(bus.is_empty());
    bus.connect();
    assert_eq!(bus.get(), None);
}

#[test]
fn full_bus_hands_value_back() {
    let mut bus = Bus::new(1);
    bus.add(1).unwrap();
    assert_eq!(bus.add(2), Err(2));
}

// ══════════════════════════════════════════════════════════
// 2. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    /// Random producer/consumer schedules: nothing is seen in the cycle it was
    /// added, and values come out in the order they went in.
    #[test]
    fn delay_and_order_hold(
        width in 1usize..4,
        schedule in proptest::collection::vec((0usize..4, 0usize..4), 1..40),
    ) {
        let mut bus = Bus::new(width);
        let mut next = 0u32;
        let mut added_at = Vec::new();
        let mut received = Vec::new();

        for (cycle, (adds, takes)) in schedule.into_iter().enumerate() {
            bus.connect();
            for _ in 0..takes {
                if let Some(v) = bus.get() {
                    prop_assert!(added_at[v as usize] < cycle);
                    received.push(v);
                }
            }
            for _ in 0..adds {
                if bus.add(next).is_ok() {
                    added_at.push(cycle);
                    next += 1;
                }
            }
        }

        let expected: Vec<u32> = (0..received.len() as u32).collect();
        prop_assert_eq!(received, expected);
    }
}
