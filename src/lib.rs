//! Two-peer multiplayer session layer
//!
//! Keeps vehicles, pickupable objects, world state and player avatars of a
//! single-player simulation in sync between a host and one joiner over a
//! datagram transport.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod client;
pub mod logging;

pub use error::{Error, Result, Severity};
pub use protocol::{
    Connection, ConnectionState, Message, MessageId, PeerId, SendMode, SyncType,
    PROTOCOL_VERSION,
};
pub use codec::{Quat, Transform, Vec3, Weather, WeatherType};
pub use state::{GameWorld, Pickupable, PickupableId, Player, Vehicle, VehicleId};
pub use sync::{
    EntityStateSource, EventHookRegistry, FsmEventSink, ObjectKind, ObjectSyncManager,
    OwnershipEvent, OwnershipState, SimpleEntity, AUTOMATIC_ID,
};
pub use client::{Session, SessionBuilder, SessionConfig, SessionEvent};
