//! Event bus for combat notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use skirmish_common::UnitId;

use crate::team::Team;

/// Something that happened on the battlefield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Unit entered the battlefield
    UnitSpawned {
        /// Unit ID
        unit: UnitId,
        /// Team the unit fights for
        team: Team,
        /// Spawn position
        position: Vec3,
    },
    /// Unit took damage
    UnitDamaged {
        /// Unit ID
        unit: UnitId,
        /// Damage requested
        amount: u32,
        /// Hit points left
        remaining: u32,
        /// Attacking unit (if any)
        source: Option<UnitId>,
    },
    /// Unit reached zero hit points
    UnitDied {
        /// Unit ID
        unit: UnitId,
        /// Unit that landed the final blow (if any)
        killer: Option<UnitId>,
        /// Whether a respawn is scheduled
        will_respawn: bool,
    },
    /// Unit came back at its spawn point
    UnitRespawned {
        /// Unit ID
        unit: UnitId,
        /// Spawn position
        position: Vec3,
    },
    /// Unit was removed for good
    UnitDestroyed {
        /// Unit ID
        unit: UnitId,
    },
    /// Projectile effect spawned
    ProjectileFired {
        /// Firing unit
        unit: UnitId,
        /// Projectile origin
        origin: Vec3,
        /// Projectile orientation
        rotation: Quat,
        /// Team the projectile can hurt
        target_team: Team,
    },
    /// Melee strike landed
    MeleeHit {
        /// Striking unit
        attacker: UnitId,
        /// Struck unit
        target: UnitId,
        /// Damage dealt
        damage: u32,
    },
    /// Melee attack dropped without dealing damage
    AttackAbandoned {
        /// Attacking unit
        attacker: UnitId,
        /// Why the attack was dropped
        reason: AbandonReason,
    },
}

/// Why a melee attack ended without a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbandonReason {
    /// Arrived while the attack was still cooling down.
    OnCooldown,
    /// Target died, vanished or was cleared during the wind-up.
    TargetLost,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    ///
    /// Never blocks. Returns `false` when the bus is full and the event was
    /// dropped.
    pub fn publish(&self, event: CombatEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Event bus full, dropping {:?}", e.into_inner());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(4);
        let unit = UnitId::from_raw(7);
        bus.publish(CombatEvent::UnitDestroyed { unit });
        bus.sender().send(CombatEvent::UnitDestroyed { unit }).expect("open channel");

        assert_eq!(bus.pending_count(), 2);
        assert_eq!(bus.drain().len(), 2);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let unit = UnitId::from_raw(1);
        assert!(bus.publish(CombatEvent::UnitDestroyed { unit }));
        assert!(!bus.publish(CombatEvent::UnitDestroyed { unit }));
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.publish(CombatEvent::UnitDestroyed { unit }));
        assert_eq!(bus.capacity(), 1);
    }
}
