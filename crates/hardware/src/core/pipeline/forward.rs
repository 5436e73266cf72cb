//! One-shot forwarding mailbox.
//!
//! Every issued instruction owns an outbound mailbox. When the issue unit
//! forwards a producer's result to a consumer, the consumer attaches to the
//! producer's mailbox. The producer writes its register result exactly once
//! after executing (`write_once`) and the consumer polls with `take_if_present`
//! while its execute unit waits. The relationship lives only as long as the
//! two in-flight records that hold the handle.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Slot {
    attached: Cell<bool>,
    value: Cell<Option<i32>>,
}

/// Shared handle to a single-value mailbox.
#[derive(Clone, Debug, Default)]
pub struct ForwardMailbox(Rc<Slot>);

impl ForwardMailbox {
    /// Creates an empty, unattached mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer. Returns `false` if one is already attached.
    pub fn attach(&self) -> bool {
        !self.0.attached.replace(true)
    }

    /// Whether a consumer is attached.
    pub fn is_attached(&self) -> bool {
        self.0.attached.get()
    }

    /// Publishes the produced value. Later writes are ignored.
    pub fn write_once(&self, value: i32) {
        if self.0.value.get().is_none() {
            self.0.value.set(Some(value));
        }
    }

    /// Takes the value if the producer has written it.
    pub fn take_if_present(&self) -> Option<i32> {
        self.0.value.take()
    }
}
