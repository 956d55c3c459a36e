//! Per-type synchronization behaviour

use std::fmt;

use super::source::EntityStateSource;

/// Minimum squared speed for a moving object to stream its state
pub const MOVING_SQR_VELOCITY: f32 = 0.01;

/// Minimum garage door rotation change worth sending
pub const GARAGE_DOOR_ROTATION_DELTA: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Pickupable,
    PlayerVehicle,
    AiVehicle,
    Boat,
    GarageDoor,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pickupable => "pickupable",
            Self::PlayerVehicle => "player vehicle",
            Self::AiVehicle => "ai vehicle",
            Self::Boat => "boat",
            Self::GarageDoor => "garage door",
        };
        f.write_str(name)
    }
}

/// Type-specific answers the sync engine needs about an object
pub trait SyncPolicy {
    fn kind(&self) -> ObjectKind;

    fn periodic_sync_enabled(&self) -> bool;

    /// Should the local owner stream state this tick?
    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool;

    fn should_take_ownership(&self) -> bool {
        true
    }

    fn synced_variables(&self, source: &dyn EntityStateSource) -> Option<Vec<f32>>;

    fn apply_synced_variables(&mut self, source: &mut dyn EntityStateSource, variables: &[f32]);

    fn owner_set_to_remote(&mut self, _source: &mut dyn EntityStateSource) {}

    fn owner_removed(&mut self, _source: &mut dyn EntityStateSource) {}

    fn sync_taken_by_force(&mut self, _source: &mut dyn EntityStateSource) {}

    fn constant_sync_changed(&mut self, _source: &mut dyn EntityStateSource, _constant: bool) {}
}

pub fn policy_for(kind: ObjectKind) -> Box<dyn SyncPolicy> {
    match kind {
        ObjectKind::Pickupable => Box::new(PickupablePolicy::default()),
        ObjectKind::PlayerVehicle => Box::new(PlayerVehiclePolicy::default()),
        ObjectKind::AiVehicle => Box::new(AiVehiclePolicy::default()),
        ObjectKind::Boat => Box::new(BoatPolicy),
        ObjectKind::GarageDoor => Box::new(GarageDoorPolicy::default()),
    }
}

fn is_moving(source: &dyn EntityStateSource) -> bool {
    source.velocity().sqr_magnitude() >= MOVING_SQR_VELOCITY
}

fn read_variables(source: &dyn EntityStateSource, names: &[&str]) -> Vec<f32> {
    names.iter().map(|name| source.variable(name).unwrap_or(0.0)).collect()
}

fn write_variables(source: &mut dyn EntityStateSource, names: &[&str], values: &[f32]) {
    if values.len() < names.len() {
        tracing::warn!(expected = names.len(), got = values.len(), "short synced variable vector");
    }
    for (name, &value) in names.iter().zip(values) {
        source.set_variable(name, value);
    }
}

pub const USE_GRAVITY: &str = "use_gravity";

#[derive(Debug, Default)]
pub struct PickupablePolicy {
    holding: bool,
}

impl SyncPolicy for PickupablePolicy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Pickupable
    }

    fn periodic_sync_enabled(&self) -> bool {
        false
    }

    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool {
        is_moving(source)
    }

    fn synced_variables(&self, _source: &dyn EntityStateSource) -> Option<Vec<f32>> {
        Some(vec![if self.holding { 1.0 } else { 0.0 }])
    }

    fn apply_synced_variables(&mut self, source: &mut dyn EntityStateSource, variables: &[f32]) {
        // A held object floats in the holder's hand.
        if let Some(&held) = variables.first() {
            source.set_variable(USE_GRAVITY, if held == 1.0 { 0.0 } else { 1.0 });
        }
    }

    fn owner_removed(&mut self, source: &mut dyn EntityStateSource) {
        source.set_variable(USE_GRAVITY, 1.0);
    }

    fn sync_taken_by_force(&mut self, source: &mut dyn EntityStateSource) {
        if self.holding {
            tracing::info!("dropped object because remote player has taken control of it");
            self.holding = false;
            source.send_event("drop_stolen_object");
        }
    }

    fn constant_sync_changed(&mut self, source: &mut dyn EntityStateSource, constant: bool) {
        self.holding = constant;
        if !constant {
            source.set_variable(USE_GRAVITY, 1.0);
        }
    }
}

pub const PLAYER_VEHICLE_VARIABLES: &[&str] = &["steering", "throttle", "brake", "clutch", "gear", "fuel"];
/// Set to 1.0 on the engine object while the local player drives it
pub const LOCAL_DRIVER: &str = "local_driver";

#[derive(Debug, Default)]
pub struct PlayerVehiclePolicy {
    syncing: bool,
}

impl SyncPolicy for PlayerVehiclePolicy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::PlayerVehicle
    }

    fn periodic_sync_enabled(&self) -> bool {
        true
    }

    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool {
        let driving = source.variable(LOCAL_DRIVER) == Some(1.0);
        self.syncing = driving || is_moving(source);
        self.syncing
    }

    fn synced_variables(&self, source: &dyn EntityStateSource) -> Option<Vec<f32>> {
        self.syncing.then(|| read_variables(source, PLAYER_VEHICLE_VARIABLES))
    }

    fn apply_synced_variables(&mut self, source: &mut dyn EntityStateSource, variables: &[f32]) {
        write_variables(source, PLAYER_VEHICLE_VARIABLES, variables);
    }

    fn owner_set_to_remote(&mut self, source: &mut dyn EntityStateSource) {
        source.send_event("remote_steering_on");
    }

    fn owner_removed(&mut self, source: &mut dyn EntityStateSource) {
        source.send_event("remote_steering_off");
    }

    fn sync_taken_by_force(&mut self, source: &mut dyn EntityStateSource) {
        source.send_event("remote_steering_on");
    }
}

pub const AI_VEHICLE_VARIABLES: &[&str] = &[
    "steering",
    "throttle",
    "brake",
    "target_speed",
    "waypoint",
    "route",
    "waypoint_start",
    "waypoint_end",
    "clockwise",
];

#[derive(Debug, Default)]
pub struct AiVehiclePolicy {
    syncing: bool,
}

impl SyncPolicy for AiVehiclePolicy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::AiVehicle
    }

    fn periodic_sync_enabled(&self) -> bool {
        true
    }

    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool {
        self.syncing = is_moving(source);
        self.syncing
    }

    fn synced_variables(&self, source: &dyn EntityStateSource) -> Option<Vec<f32>> {
        self.syncing.then(|| read_variables(source, AI_VEHICLE_VARIABLES))
    }

    fn apply_synced_variables(&mut self, source: &mut dyn EntityStateSource, variables: &[f32]) {
        write_variables(source, AI_VEHICLE_VARIABLES, variables);
    }

    fn owner_set_to_remote(&mut self, source: &mut dyn EntityStateSource) {
        source.send_event("activate");
    }
}

pub const BOAT_VARIABLES: &[&str] = &["throttle", "rpm_max", "motor_rotation"];

#[derive(Debug, Default)]
pub struct BoatPolicy;

impl SyncPolicy for BoatPolicy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Boat
    }

    fn periodic_sync_enabled(&self) -> bool {
        true
    }

    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool {
        is_moving(source)
    }

    fn synced_variables(&self, source: &dyn EntityStateSource) -> Option<Vec<f32>> {
        Some(read_variables(source, BOAT_VARIABLES))
    }

    fn apply_synced_variables(&mut self, source: &mut dyn EntityStateSource, variables: &[f32]) {
        write_variables(source, BOAT_VARIABLES, variables);
    }
}

#[derive(Debug, Default)]
pub struct GarageDoorPolicy {
    last_rotation: f32,
}

impl SyncPolicy for GarageDoorPolicy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::GarageDoor
    }

    fn periodic_sync_enabled(&self) -> bool {
        false
    }

    fn can_sync(&mut self, source: &dyn EntityStateSource) -> bool {
        let rotation = source.transform().rotation.z;
        if (self.last_rotation - rotation).abs() > GARAGE_DOOR_ROTATION_DELTA {
            self.last_rotation = rotation;
            true
        } else {
            false
        }
    }

    fn synced_variables(&self, _source: &dyn EntityStateSource) -> Option<Vec<f32>> {
        None
    }

    fn apply_synced_variables(&mut self, _source: &mut dyn EntityStateSource, _variables: &[f32]) {}
}
