//! Event bus for combat notifications.
//!
//! Health changes, deaths, payload drops and session changes are published
//! here and drained by the simulation driver once per frame.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use smalltime_common::ActorId;
use tracing::warn;

use crate::damage::{DamageInfo, DamageReport};
use crate::session::GameState;

/// Event types published by the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A hit went through the damage pipeline
    DamageTaken {
        /// Actor that was hit
        actor: ActorId,
        /// Hit parameters
        info: DamageInfo,
        /// Outcome
        report: DamageReport,
    },
    /// Actor was killed by the damage pipeline
    Death {
        /// Actor that died
        actor: ActorId,
        /// Report of the killing hit
        report: DamageReport,
    },
    /// Actor health changed
    HealthChanged {
        /// Actor
        actor: ActorId,
        /// New health
        health: i32,
        /// Max health
        max_health: i32,
    },
    /// Player jumped
    Jumped {
        /// Actor
        actor: ActorId,
        /// Jump charges left
        jumps_left: u32,
    },
    /// Player dashed
    Dashed {
        /// Actor
        actor: ActorId,
        /// Dash direction
        direction: Vec2,
    },
    /// Actor touched ground after a fall
    Landed {
        /// Actor
        actor: ActorId,
        /// Height fallen since the last surface
        fall_distance: f32,
    },
    /// Fuse carrier started its fuse
    FuseStarted {
        /// Actor
        actor: ActorId,
        /// Fuse length in seconds
        fuse_time: f32,
    },
    /// Payload was dropped
    PayloadDropped {
        /// Actor that carried it
        actor: ActorId,
        /// Drop position
        position: Vec2,
        /// Fuse left on the payload
        fuse_time: f32,
    },
    /// Gold balance changed
    GoldChanged {
        /// New balance
        gold: u64,
    },
    /// Session state changed
    GameStateChanged {
        /// New state
        state: GameState,
    },
    /// Actor was removed from the simulation
    Despawned {
        /// Actor
        actor: ActorId,
    },
}

impl CombatEvent {
    /// Actor the event is about, if any.
    #[must_use]
    pub fn actor(&self) -> Option<ActorId> {
        match self {
            Self::DamageTaken { actor, .. }
            | Self::Death { actor, .. }
            | Self::HealthChanged { actor, .. }
            | Self::Jumped { actor, .. }
            | Self::Dashed { actor, .. }
            | Self::Landed { actor, .. }
            | Self::FuseStarted { actor, .. }
            | Self::PayloadDropped { actor, .. }
            | Self::Despawned { actor } => Some(*actor),
            Self::GoldChanged { .. } | Self::GameStateChanged { .. } => None,
        }
    }
}

/// Event queue drained by the driver.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for publishing events
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
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. A full queue drops the event with a warning.
    pub fn publish(&self, event: CombatEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            warn!(?event, "event queue full, dropping event");
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
    fn test_publish_and_drain_in_order() {
        let bus = EventBus::new(8);
        bus.publish(CombatEvent::GoldChanged { gold: 1 });
        bus.publish(CombatEvent::GoldChanged { gold: 2 });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(
            events,
            vec![
                CombatEvent::GoldChanged { gold: 1 },
                CombatEvent::GoldChanged { gold: 2 }
            ]
        );
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_queue_drops() {
        let bus = EventBus::new(1);
        bus.publish(CombatEvent::GoldChanged { gold: 1 });
        bus.publish(CombatEvent::GoldChanged { gold: 2 });
        assert_eq!(bus.drain(), vec![CombatEvent::GoldChanged { gold: 1 }]);
    }

    #[test]
    fn test_external_sender() {
        let bus = EventBus::default();
        let sender = bus.sender();
        let actor = ActorId::from_raw(3);
        sender
            .send(CombatEvent::Despawned { actor })
            .expect("send");
        let events = bus.drain();
        assert_eq!(events[0].actor(), Some(actor));
    }
}
