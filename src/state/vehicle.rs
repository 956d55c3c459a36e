use std::collections::BTreeMap;

use crate::codec::Transform;
use crate::error::{Error, Result};
use crate::protocol::PeerId;

/// Vehicle ids are a single byte on the wire
pub const MAX_VEHICLES: usize = 255;

pub type VehicleId = u8;

/// Driver inputs streamed by `VehicleSync`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleInputs {
    pub steering: f32,
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    pub fuel: f32,
    pub gear: Option<i32>,
    pub range: Option<bool>,
    pub hydraulic: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SwitchValue {
    pub on: bool,
    pub value: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Driver,
    Passenger,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub transform: Transform,
    pub driver: Option<PeerId>,
    pub passenger: Option<PeerId>,
    pub inputs: VehicleInputs,
    pub engine_state: i32,
    pub dash_state: i32,
    pub start_time: Option<f32>,
    pub switches: BTreeMap<i32, SwitchValue>,
}

impl Vehicle {
    fn new(id: VehicleId, name: String, transform: Transform) -> Self {
        Self {
            id,
            name,
            transform,
            driver: None,
            passenger: None,
            inputs: VehicleInputs::default(),
            engine_state: 0,
            dash_state: 0,
            start_time: None,
            switches: BTreeMap::new(),
        }
    }

    pub fn seat_of(&self, peer: PeerId) -> Option<Seat> {
        if self.driver == Some(peer) {
            Some(Seat::Driver)
        } else if self.passenger == Some(peer) {
            Some(Seat::Passenger)
        } else {
            None
        }
    }
}

/// Dense vehicle pool; ids are assigned in registration order
#[derive(Debug, Clone, Default)]
pub struct VehiclePool {
    vehicles: Vec<Vehicle>,
}

impl VehiclePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    pub fn register(&mut self, name: impl Into<String>, transform: Transform) -> Result<VehicleId> {
        if self.vehicles.len() >= MAX_VEHICLES {
            return Err(Error::PoolExhausted { category: "vehicle" });
        }
        let id = self.vehicles.len() as VehicleId;
        let name = name.into();
        tracing::debug!(vehicle_id = id, %name, "registered vehicle");
        self.vehicles.push(Vehicle::new(id, name, transform));
        Ok(id)
    }

    pub fn get(&self, id: VehicleId) -> Result<&Vehicle> {
        self.vehicles.get(id as usize).ok_or_else(|| Error::unknown_entity("vehicle", id))
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle> {
        self.vehicles.get_mut(id as usize).ok_or_else(|| Error::unknown_entity("vehicle", id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.name == name)
    }

    /// Seat `peer` in a vehicle. Returns the seat taken, or `None` when it is occupied.
    pub fn enter(&mut self, id: VehicleId, peer: PeerId, passenger: bool) -> Result<Option<Seat>> {
        let seat = if passenger { Seat::Passenger } else { Seat::Driver };
        let vehicle = self.get(id)?;
        let occupant = match seat {
            Seat::Driver => vehicle.driver,
            Seat::Passenger => vehicle.passenger,
        };
        if occupant.is_some_and(|other| other != peer) {
            tracing::debug!(vehicle_id = id, %peer, ?seat, "seat occupied");
            return Ok(None);
        }

        // a peer sits in one place at a time
        self.leave(peer);
        let vehicle = self.get_mut(id)?;
        match seat {
            Seat::Driver => vehicle.driver = Some(peer),
            Seat::Passenger => vehicle.passenger = Some(peer),
        }
        Ok(Some(seat))
    }

    /// Clear every seat held by `peer`, returning the vehicle it left
    pub fn leave(&mut self, peer: PeerId) -> Option<VehicleId> {
        let mut left = None;
        for vehicle in &mut self.vehicles {
            if vehicle.driver == Some(peer) {
                vehicle.driver = None;
                left = Some(vehicle.id);
            }
            if vehicle.passenger == Some(peer) {
                vehicle.passenger = None;
                left = Some(vehicle.id);
            }
        }
        left
    }

    pub fn occupied_by(&self, peer: PeerId) -> Option<(VehicleId, Seat)> {
        self.vehicles
            .iter()
            .find_map(|v| v.seat_of(peer).map(|seat| (v.id, seat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: PeerId = PeerId(1);
    const B: PeerId = PeerId(2);

    fn pool(n: usize) -> VehiclePool {
        let mut pool = VehiclePool::new();
        for i in 0..n {
            pool.register(format!("CAR{i}"), Transform::default()).unwrap();
        }
        pool
    }

    #[test]
    fn test_dense_ids() {
        let pool = pool(3);
        let ids: Vec<_> = pool.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(matches!(pool.get(3), Err(Error::UnknownEntity { category: "vehicle", id: 3 })));
    }

    #[test]
    fn test_pool_exhausted() {
        let mut pool = pool(MAX_VEHICLES);
        assert!(matches!(
            pool.register("ONE_TOO_MANY", Transform::default()),
            Err(Error::PoolExhausted { .. })
        ));
    }

    #[test]
    fn test_driver_seat_exclusive() {
        let mut pool = pool(1);
        assert_eq!(pool.enter(0, A, false).unwrap(), Some(Seat::Driver));
        assert_eq!(pool.enter(0, B, false).unwrap(), None);
        assert_eq!(pool.enter(0, B, true).unwrap(), Some(Seat::Passenger));
        assert_eq!(pool.occupied_by(B), Some((0, Seat::Passenger)));
    }

    #[test]
    fn test_leave_clears_seat() {
        let mut pool = pool(2);
        pool.enter(1, A, false).unwrap();
        assert_eq!(pool.leave(A), Some(1));
        assert!(pool.get(1).unwrap().driver.is_none());
        assert_eq!(pool.leave(A), None);
    }

    #[test]
    fn test_switching_vehicles_frees_old_seat() {
        let mut pool = pool(2);
        pool.enter(0, A, false).unwrap();
        pool.enter(1, A, false).unwrap();
        assert!(pool.get(0).unwrap().driver.is_none());
        assert_eq!(pool.get(1).unwrap().driver, Some(A));
    }
}
