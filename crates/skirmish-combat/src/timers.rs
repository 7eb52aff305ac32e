//! Deferred callbacks on simulation time.
//!
//! Every suspension point of a unit (attack cue reset, melee wind-up,
//! death grace period, respawn delay) is a [`Deferred`] value parked in a
//! [`TimerQueue`]. The owner advances the queue and runs whatever is due.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use skirmish_common::{TimerId, UnitId};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::services::Clock;

/// A continuation waiting on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deferred {
    /// Turn the attacking animation cue off.
    EndAttackCue(UnitId),
    /// Land a melee strike at the end of the wind-up.
    MeleeStrike {
        /// Striking unit.
        attacker: UnitId,
        /// Attack the strike belongs to.
        serial: u64,
    },
    /// Bring a dead unit back at its spawn point.
    Respawn(UnitId),
    /// Permanently remove a dead unit.
    Destroy(UnitId),
}

impl Deferred {
    /// Unit the continuation belongs to.
    #[must_use]
    pub const fn owner(&self) -> UnitId {
        match *self {
            Self::EndAttackCue(unit) | Self::Respawn(unit) | Self::Destroy(unit) => unit,
            Self::MeleeStrike { attacker, .. } => attacker,
        }
    }
}

/// Heap entry; ordered by deadline, then by scheduling order.
#[derive(Debug, Clone, Copy)]
struct Slot {
    deadline: f64,
    id: TimerId,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .total_cmp(&other.deadline)
            .then(self.id.cmp(&other.id))
    }
}

/// Min-heap of deferred callbacks keyed by deadline.
///
/// Cancelled timers are dropped from the payload map and skipped lazily
/// when they surface at the top of the heap.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: f64,
    next_id: u64,
    heap: BinaryHeap<Reverse<Slot>>,
    pending: AHashMap<TimerId, Deferred>,
}

impl TimerQueue {
    /// Create an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward. Negative steps are ignored.
    pub fn advance(&mut self, dt: f32) {
        if dt > 0.0 {
            self.now += f64::from(dt);
        }
    }

    /// Pop the earliest callback whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<(TimerId, Deferred)> {
        while let Some(Reverse(slot)) = self.heap.peek().copied() {
            if slot.deadline > self.now {
                return None;
            }
            self.heap.pop();
            if let Some(deferred) = self.pending.remove(&slot.id) {
                return Some((slot.id, deferred));
            }
        }
        None
    }

    /// Number of callbacks still waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Clock for TimerQueue {
    fn now(&self) -> f64 {
        self.now
    }

    fn after(&mut self, delay: f32, deferred: Deferred) -> TimerId {
        let id = TimerId::new(self.next_id);
        self.next_id += 1;
        let deadline = self.now + f64::from(delay.max(0.0));
        self.heap.push(Reverse(Slot { deadline, id }));
        self.pending.insert(id, deferred);
        id
    }

    fn cancel(&mut self, timer: TimerId) -> bool {
        self.pending.remove(&timer).is_some()
    }
}
