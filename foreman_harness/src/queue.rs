// Delayed notification queue for the fake engine.
//
// A real engine reports a new entity some frames after the build order that
// caused it, and several notifications can become due on the same frame.
// Notifications are keyed by `(delivery frame, arrival number)` in a
// `BTreeMap`, so draining a frame is a `split_off` and notifications due on
// the same frame come out in the order they were scheduled. A notification
// can be retracted before delivery when the entity it reports is abandoned.

use foreman_core::event::WorldEvent;
use foreman_core::types::UnitId;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct NotificationQueue {
    pending: BTreeMap<(u64, u64), WorldEvent>,
    arrivals: u64,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` on `frame`, after anything already due then.
    pub fn schedule(&mut self, frame: u64, event: WorldEvent) {
        self.arrivals += 1;
        self.pending.insert((frame, self.arrivals), event);
    }

    /// Remove and return every notification due at or before `frame`, in
    /// delivery order.
    pub fn drain_due(&mut self, frame: u64) -> Vec<WorldEvent> {
        let later = self.pending.split_off(&(frame + 1, 0));
        std::mem::replace(&mut self.pending, later)
            .into_values()
            .collect()
    }

    /// Drop undelivered notifications about `entity`. Returns how many were
    /// dropped.
    pub fn retract(&mut self, entity: UnitId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, event| event.entity().id != entity);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
