//! Full world snapshot and the host's periodic world broadcast

use std::collections::BTreeSet;

use crate::protocol::message::{
    DoorState, FullWorldSync, LightSwitchState, VehicleTransform, WorldPeriodicalUpdate,
};
use crate::state::{GameWorld, PickupableId};

/// What a snapshot could not place in the local world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotReport {
    pub doors_missing: usize,
    pub light_switches_missing: usize,
    pub vehicles_missing: usize,
    pub pickupables_upserted: usize,
    pub pickupables_removed: usize,
}

/// Host side: describe everything a joiner needs to match our world
pub fn write_full_world_sync(world: &GameWorld) -> FullWorldSync {
    FullWorldSync {
        hour: world.clock.hour,
        minutes: world.clock.minutes,
        day: world.clock.day,
        mailbox_name: world.mailbox_name.clone(),
        doors: world
            .doors
            .iter()
            .map(|d| DoorState { position: d.position, open: d.open })
            .collect(),
        light_switches: world
            .light_switches
            .iter()
            .map(|l| LightSwitchState { position: l.position, on: l.on })
            .collect(),
        weather: world.weather,
        vehicles: world
            .vehicles
            .iter()
            .map(|v| VehicleTransform { id: v.id, transform: v.transform })
            .collect(),
        pickupables: world.pickupables.iter().map(|p| p.to_spawn()).collect(),
    }
}

/// Joiner side: bring the local world in line with the host's snapshot
///
/// Applied in a fixed order: time, mailbox, doors, lights, weather, vehicles,
/// pickupables. Entries that name unknown local objects are skipped.
pub fn apply_full_world_sync(world: &mut GameWorld, snapshot: &FullWorldSync) -> SnapshotReport {
    let mut report = SnapshotReport::default();

    world.clock.hour = snapshot.hour;
    world.clock.minutes = snapshot.minutes;
    world.clock.day = snapshot.day;

    world.mailbox_name.clone_from(&snapshot.mailbox_name);

    for door in &snapshot.doors {
        if let Err(e) = world.set_door_open(door.position, door.open) {
            tracing::warn!(position = ?door.position, error = %e, "snapshot door not found");
            report.doors_missing += 1;
        }
    }

    for light in &snapshot.light_switches {
        if let Err(e) = world.set_light_switch(light.position, light.on) {
            tracing::warn!(position = ?light.position, error = %e, "snapshot light switch not found");
            report.light_switches_missing += 1;
        }
    }

    world.weather = snapshot.weather;

    for entry in &snapshot.vehicles {
        match world.vehicles.get_mut(entry.id) {
            Ok(vehicle) => vehicle.transform = entry.transform,
            Err(e) => {
                tracing::warn!(vehicle_id = entry.id, error = %e, "snapshot vehicle not found");
                report.vehicles_missing += 1;
            }
        }
    }

    let listed: BTreeSet<PickupableId> = snapshot.pickupables.iter().map(|p| p.id).collect();
    for spawn in &snapshot.pickupables {
        world.pickupables.upsert(spawn);
        report.pickupables_upserted += 1;
    }
    // Inactive leftovers are stale local copies; active ones stay.
    report.pickupables_removed = world.pickupables.retain(|p| listed.contains(&p.id) || p.active);

    tracing::info!(
        hour = snapshot.hour,
        doors = snapshot.doors.len(),
        vehicles = snapshot.vehicles.len(),
        pickupables = snapshot.pickupables.len(),
        removed = report.pickupables_removed,
        "applied full world sync"
    );
    report
}

pub fn write_periodic_update(world: &GameWorld) -> WorldPeriodicalUpdate {
    WorldPeriodicalUpdate {
        sun_clock: world.clock.sun_clock(),
        world_day: world.clock.day.clamp(0, u8::MAX as i32) as u8,
        weather: world.weather,
    }
}

pub fn apply_periodic_update(world: &mut GameWorld, update: &WorldPeriodicalUpdate) {
    world.apply_sun_clock(update.sun_clock);
    world.clock.day = update.world_day as i32;
    world.weather = update.weather;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Transform, Vec3, Weather, WeatherType};
    use crate::protocol::message::PickupableSpawn;
    use crate::protocol::PeerId;
    use crate::state::WorldClock;

    fn spawn(id: u16, active: bool) -> PickupableSpawn {
        PickupableSpawn { id, prefab_id: 7, transform: Transform::default(), active, data: None }
    }

    fn host_world() -> GameWorld {
        let mut world = GameWorld::new();
        world.clock = WorldClock { hour: 14, minutes: 30.0, day: 3 };
        world.mailbox_name = "MAILBOX_KESSELI".into();
        world.add_door("HOUSE", Vec3::new(1.0, 0.0, 1.0), true);
        world.add_light_switch("KITCHEN", Vec3::new(2.0, 1.0, 0.0), true);
        world.weather = Weather { kind: WeatherType::Rain, ..Default::default() };
        world.vehicles.register("SATSUMA", Transform::at(Vec3::new(5.0, 0.0, 5.0))).unwrap();
        world.pickupables.spawn(&spawn(0, true)).unwrap();
        world.pickupables.spawn(&spawn(2, false)).unwrap();
        world
    }

    fn joiner_world() -> GameWorld {
        let mut world = GameWorld::new();
        world.add_door("HOUSE", Vec3::new(1.0, 0.0, 1.0), false);
        world.add_light_switch("KITCHEN", Vec3::new(2.0, 1.0, 0.0), false);
        world.vehicles.register("SATSUMA", Transform::default()).unwrap();
        world.pickupables.spawn(&spawn(5, false)).unwrap();
        world.pickupables.spawn(&spawn(6, true)).unwrap();
        world
    }

    #[test]
    fn test_apply_matches_host() {
        let host = host_world();
        let mut joiner = joiner_world();
        let snapshot = write_full_world_sync(&host);

        let report = apply_full_world_sync(&mut joiner, &snapshot);
        assert_eq!(report.pickupables_upserted, 2);
        assert_eq!(report.pickupables_removed, 1);
        assert_eq!(joiner.clock, host.clock);
        assert_eq!(joiner.mailbox_name, "MAILBOX_KESSELI");
        assert!(joiner.doors[0].open);
        assert!(joiner.light_switches[0].on);
        assert_eq!(joiner.weather.kind, WeatherType::Rain);
        assert_eq!(joiner.vehicles.get(0).unwrap().transform.position, Vec3::new(5.0, 0.0, 5.0));

        // inactive unlisted removed, active unlisted kept
        assert!(!joiner.pickupables.contains(5));
        assert!(joiner.pickupables.contains(6));
    }

    #[test]
    fn test_apply_twice_equals_once() {
        let snapshot = write_full_world_sync(&host_world());
        let mut once = joiner_world();
        apply_full_world_sync(&mut once, &snapshot);
        let mut twice = once.clone();
        let report = apply_full_world_sync(&mut twice, &snapshot);

        assert_eq!(report.pickupables_removed, 0);
        assert_eq!(write_full_world_sync(&once), write_full_world_sync(&twice));
    }

    #[test]
    fn test_unknown_entries_skipped() {
        let mut snapshot = write_full_world_sync(&host_world());
        snapshot.doors.push(DoorState { position: Vec3::new(50.0, 0.0, 0.0), open: true });
        snapshot.vehicles.push(VehicleTransform { id: 9, transform: Transform::default() });

        let mut joiner = joiner_world();
        let report = apply_full_world_sync(&mut joiner, &snapshot);
        assert_eq!(report.doors_missing, 1);
        assert_eq!(report.vehicles_missing, 1);
        assert!(joiner.doors[0].open);
    }

    #[test]
    fn test_upsert_keeps_holder() {
        let snapshot = write_full_world_sync(&host_world());
        let mut joiner = joiner_world();
        joiner.pickupables.spawn(&spawn(0, true)).unwrap();
        joiner.pickupables.pick_up(0, PeerId(1)).unwrap();
        apply_full_world_sync(&mut joiner, &snapshot);
        assert_eq!(joiner.pickupables.get(0).unwrap().holder, Some(PeerId(1)));
    }

    #[test]
    fn test_periodic_update() {
        let host = host_world();
        let update = write_periodic_update(&host);
        assert_eq!(update.sun_clock, 7);
        assert_eq!(update.world_day, 3);

        let mut joiner = GameWorld::new();
        joiner.clock = WorldClock { hour: 15, minutes: 10.0, day: 1 };
        apply_periodic_update(&mut joiner, &update);
        // same two-hour bucket, hour untouched
        assert_eq!(joiner.clock.hour, 15);
        assert_eq!(joiner.clock.minutes, 10.0);
        assert_eq!(joiner.clock.day, 3);
        assert_eq!(joiner.weather.kind, WeatherType::Rain);
    }
}
