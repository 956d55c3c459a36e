pub mod pickupable;
pub mod player;
pub mod vehicle;
pub mod world;

pub use pickupable::{full_beer_case, Pickupable, PickupableId, PickupablePool, BEER_CASE_FULL};
pub use player::{AnimState, Player};
pub use vehicle::{Seat, SwitchValue, Vehicle, VehicleId, VehicleInputs, VehiclePool, MAX_VEHICLES};
pub use world::{
    Door, GameWorld, LightSwitch, WorldClock,
    MANDATORY_OBJECTS, POSITION_MATCH_EPSILON,
};
