//! Object ownership, world snapshots and event hooks

pub mod event_hook;
pub mod manager;
pub mod ownership;
pub mod policy;
pub mod snapshot;
pub mod source;
pub mod triggers;

pub use event_hook::{EventHookRegistry, FsmEventSink, HookRegistration, NAMED_EVENT_ID};
pub use manager::{ObjectSyncManager, OwnershipEvent, SyncedObject, AUTOMATIC_ID};
pub use ownership::{OwnershipState, Transition};
pub use policy::{policy_for, ObjectKind, SyncPolicy};
pub use snapshot::{
    apply_full_world_sync, apply_periodic_update, write_full_world_sync,
    write_periodic_update, SnapshotReport,
};
pub use source::{EntityStateSource, SimpleEntity};
pub use triggers::{TriggerEvent, TriggerKind, TriggerQueue};
