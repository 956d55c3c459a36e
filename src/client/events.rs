use crate::codec::{Vec3, Weather};
use crate::protocol::{LobbyId, PeerId};
use crate::state::{PickupableId, Seat, VehicleId};
use crate::sync::OwnershipEvent;

pub use crate::protocol::{DisconnectReason, JoinAbortReason};

/// Session events that can be received
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Lobby created, we are hosting
    LobbyCreated {
        lobby: LobbyId,
    },

    /// A joiner completed the handshake
    PlayerJoined {
        peer: PeerId,
    },

    /// Handshake with the host completed, world state requested
    Connected {
        host: PeerId,
    },

    /// Joining failed before the world was loaded
    JoinAborted {
        reason: JoinAbortReason,
    },

    /// Host snapshot applied
    WorldSynced,

    /// Remote peer left or timed out
    PlayerLeft {
        peer: PeerId,
        reason: DisconnectReason,
    },

    /// Local session ended
    Disconnected {
        reason: DisconnectReason,
    },

    /// Session ended by a fatal protocol error; back to idle
    SessionAborted {
        error: String,
    },

    Ownership(OwnershipEvent),

    VehicleEntered {
        peer: PeerId,
        vehicle_id: VehicleId,
        seat: Seat,
    },

    VehicleLeft {
        peer: PeerId,
        vehicle_id: VehicleId,
    },

    PickupableSpawned {
        id: PickupableId,
    },

    PickupableDestroyed {
        id: PickupableId,
    },

    DoorChanged {
        position: Vec3,
        open: bool,
    },

    LightSwitchChanged {
        position: Vec3,
        on: bool,
    },

    WeatherChanged {
        weather: Weather,
    },
}

impl SessionEvent {
    /// Human readable text for the ones the UI should show
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::JoinAborted { reason } => Some(format!("Cannot join: {}.", reason.description())),
            Self::PlayerLeft { reason: DisconnectReason::Timeout, .. } => {
                Some("Other player timed out.".to_string())
            }
            Self::Disconnected { reason: DisconnectReason::Timeout } => {
                Some("Connection to host lost.".to_string())
            }
            Self::SessionAborted { error } => Some(format!("Session ended: {error}")),
            _ => None,
        }
    }
}

/// Event handler trait
pub trait EventHandler {
    fn on_event(&mut self, event: SessionEvent);
}

/// Simple event collector
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<SessionEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventHandler for EventCollector {
    fn on_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_collector() {
        let mut collector = EventCollector::new();
        assert!(collector.is_empty());

        collector.on_event(SessionEvent::WorldSynced);
        collector.on_event(SessionEvent::PlayerJoined { peer: PeerId(1) });

        assert!(!collector.is_empty());

        let events = collector.drain();
        assert_eq!(events.len(), 2);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_user_message() {
        let event = SessionEvent::JoinAborted {
            reason: JoinAbortReason::HostNewer { host: 3, local: 2 },
        };
        assert_eq!(
            event.user_message().as_deref(),
            Some("Cannot join: host has newer version of the mod.")
        );
        assert_eq!(SessionEvent::WorldSynced.user_message(), None);
    }
}
