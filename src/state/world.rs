use crate::codec::{Vec3, Weather};
use crate::error::{Error, Result};
use crate::protocol::PeerId;
use crate::state::pickupable::PickupablePool;
use crate::state::player::Player;
use crate::state::vehicle::VehiclePool;

/// Doors and light switches are addressed by position within this distance
pub const POSITION_MATCH_EPSILON: f32 = 0.1;

/// Objects every world must provide when it loads
pub const MANDATORY_OBJECTS: &[&str] = &["SUN", "MAILBOX", "Clouds"];

/// In-game time of day
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldClock {
    pub hour: i32,
    pub minutes: f32,
    /// Day of the week
    pub day: i32,
}

impl WorldClock {
    /// Hour with two-hour precision, as broadcast in periodic updates
    pub fn sun_clock(&self) -> u8 {
        (self.hour.rem_euclid(24) / 2) as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Door {
    pub name: String,
    pub position: Vec3,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSwitch {
    pub name: String,
    pub position: Vec3,
    pub on: bool,
}

/// Local replica of the synchronizable world
#[derive(Debug, Clone, Default)]
pub struct GameWorld {
    pub clock: WorldClock,
    pub mailbox_name: String,
    pub doors: Vec<Door>,
    pub light_switches: Vec<LightSwitch>,
    pub weather: Weather,
    pub vehicles: VehiclePool,
    pub pickupables: PickupablePool,
    pub local_player: Player,
    pub remote_player: Player,
}

impl GameWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that the engine reported every mandatory object
    pub fn verify_loaded<'a>(&self, found: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let found: Vec<&str> = found.into_iter().collect();
        for &name in MANDATORY_OBJECTS {
            if !found.contains(&name) {
                return Err(Error::MissingWorldObject { name: name.to_string() });
            }
        }
        tracing::debug!(objects = found.len(), "world objects verified");
        Ok(())
    }

    pub fn add_door(&mut self, name: impl Into<String>, position: Vec3, open: bool) {
        self.doors.push(Door { name: name.into(), position, open });
    }

    pub fn add_light_switch(&mut self, name: impl Into<String>, position: Vec3, on: bool) {
        self.light_switches.push(LightSwitch { name: name.into(), position, on });
    }

    pub fn find_door(&self, position: Vec3) -> Option<&Door> {
        self.doors.iter().find(|d| d.position.approx_eq(position, POSITION_MATCH_EPSILON))
    }

    pub fn set_door_open(&mut self, position: Vec3, open: bool) -> Result<()> {
        let door = self
            .doors
            .iter_mut()
            .find(|d| d.position.approx_eq(position, POSITION_MATCH_EPSILON))
            .ok_or_else(|| Error::UnknownEntity { category: "door", id: -1 })?;
        door.open = open;
        Ok(())
    }

    pub fn find_light_switch(&self, position: Vec3) -> Option<&LightSwitch> {
        self.light_switches.iter().find(|l| l.position.approx_eq(position, POSITION_MATCH_EPSILON))
    }

    pub fn set_light_switch(&mut self, position: Vec3, on: bool) -> Result<()> {
        let light = self
            .light_switches
            .iter_mut()
            .find(|l| l.position.approx_eq(position, POSITION_MATCH_EPSILON))
            .ok_or_else(|| Error::UnknownEntity { category: "light switch", id: -1 })?;
        light.on = on;
        Ok(())
    }

    /// Move the hour only when it falls in a different two-hour bucket
    pub fn apply_sun_clock(&mut self, sun_clock: u8) {
        if self.clock.sun_clock() != sun_clock {
            self.clock.hour = sun_clock as i32 * 2;
            self.clock.minutes = 0.0;
        }
    }

    pub fn spawn_remote_player(&mut self, peer: PeerId) {
        self.remote_player = Player::spawned(peer);
    }

    /// Forget everything the departed peer occupied
    pub fn remove_peer(&mut self, peer: PeerId) {
        let left = self.vehicles.leave(peer);
        let released = self.pickupables.release_all(peer);
        if self.remote_player.peer == Some(peer) {
            self.remote_player = Player::default();
        }
        tracing::debug!(%peer, vehicle = ?left, released, "removed peer from world");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Transform;

    #[test]
    fn test_sun_clock() {
        let clock = WorldClock { hour: 15, minutes: 20.0, day: 2 };
        assert_eq!(clock.sun_clock(), 7);
        assert_eq!(WorldClock { hour: 0, ..clock }.sun_clock(), 0);
        assert_eq!(WorldClock { hour: 23, ..clock }.sun_clock(), 11);
    }

    #[test]
    fn test_apply_sun_clock_same_bucket() {
        let mut world = GameWorld::new();
        world.clock = WorldClock { hour: 15, minutes: 20.0, day: 2 };
        world.apply_sun_clock(7);
        assert_eq!(world.clock.hour, 15);
        world.apply_sun_clock(8);
        assert_eq!(world.clock.hour, 16);
    }

    #[test]
    fn test_doors_matched_by_position() {
        let mut world = GameWorld::new();
        world.add_door("HOUSE", Vec3::new(10.0, 0.0, 5.0), false);
        world.set_door_open(Vec3::new(10.05, 0.0, 5.0), true).unwrap();
        assert!(world.find_door(Vec3::new(10.0, 0.0, 5.0)).unwrap().open);
        assert!(matches!(
            world.set_door_open(Vec3::new(11.0, 0.0, 5.0), true),
            Err(Error::UnknownEntity { category: "door", .. })
        ));
    }

    #[test]
    fn test_verify_loaded() {
        let world = GameWorld::new();
        assert!(world.verify_loaded(["SUN", "MAILBOX", "Clouds", "extra"]).is_ok());
        assert!(matches!(
            world.verify_loaded(["SUN", "MAILBOX"]),
            Err(Error::MissingWorldObject { name }) if name == "Clouds"
        ));
    }

    #[test]
    fn test_remove_peer_clears_occupancy() {
        let mut world = GameWorld::new();
        let peer = PeerId(2);
        let id = world.vehicles.register("SATSUMA", Transform::default()).unwrap();
        world.vehicles.enter(id, peer, false).unwrap();
        world.spawn_remote_player(peer);

        world.remove_peer(peer);
        assert!(world.vehicles.get(id).unwrap().driver.is_none());
        assert!(!world.remote_player.is_spawned());
    }
}
