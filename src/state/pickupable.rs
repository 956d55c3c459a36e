use std::collections::BTreeMap;

use crate::codec::{Transform, Vec3};
use crate::error::{Error, Result};
use crate::protocol::PeerId;
use crate::protocol::message::PickupableSpawn;

pub type PickupableId = u16;

/// Bottles in a full beer case
pub const BEER_CASE_FULL: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Pickupable {
    pub id: PickupableId,
    pub prefab_id: i32,
    pub transform: Transform,
    pub active: bool,
    pub holder: Option<PeerId>,
    /// Prefab-specific payload; for beer cases `[remaining_bottles]`
    pub data: Option<Vec<f32>>,
}

impl Pickupable {
    pub fn to_spawn(&self) -> PickupableSpawn {
        PickupableSpawn {
            id: self.id,
            prefab_id: self.prefab_id,
            transform: self.transform,
            active: self.active,
            data: self.data.clone(),
        }
    }

    pub fn remaining_bottles(&self) -> Option<u32> {
        self.data.as_ref().and_then(|d| d.first()).map(|&n| n.max(0.0) as u32)
    }

    /// Beer cases are spawned carrying their bottle count
    pub fn is_beer_case(&self) -> bool {
        self.remaining_bottles().is_some()
    }
}

/// Spawn payload of an unopened beer case
pub fn full_beer_case() -> Vec<f32> {
    vec![BEER_CASE_FULL as f32]
}

/// Sparse pickupable pool keyed by network id
#[derive(Debug, Clone, Default)]
pub struct PickupablePool {
    items: BTreeMap<PickupableId, Pickupable>,
}

impl PickupablePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: PickupableId) -> bool {
        self.items.contains_key(&id)
    }

    /// Ascending by id
    pub fn iter(&self) -> impl Iterator<Item = &Pickupable> {
        self.items.values()
    }

    pub fn get(&self, id: PickupableId) -> Result<&Pickupable> {
        self.items.get(&id).ok_or_else(|| Error::unknown_entity("pickupable", id))
    }

    pub fn get_mut(&mut self, id: PickupableId) -> Result<&mut Pickupable> {
        self.items.get_mut(&id).ok_or_else(|| Error::unknown_entity("pickupable", id))
    }

    /// Lowest id not in use
    pub fn allocate_id(&self) -> Result<PickupableId> {
        let mut candidate: u32 = 0;
        for &id in self.items.keys() {
            if id as u32 != candidate {
                break;
            }
            candidate += 1;
        }
        if candidate > PickupableId::MAX as u32 {
            return Err(Error::PoolExhausted { category: "pickupable" });
        }
        Ok(candidate as PickupableId)
    }

    /// Register a new pickupable; an id already in use is rejected
    pub fn spawn(&mut self, spawn: &PickupableSpawn) -> Result<()> {
        if self.items.contains_key(&spawn.id) {
            return Err(Error::duplicate_entity("pickupable", spawn.id));
        }
        self.upsert(spawn);
        Ok(())
    }

    /// Insert or overwrite from a snapshot entry, keeping the current holder
    pub fn upsert(&mut self, spawn: &PickupableSpawn) {
        let holder = self.items.get(&spawn.id).and_then(|p| p.holder);
        self.items.insert(
            spawn.id,
            Pickupable {
                id: spawn.id,
                prefab_id: spawn.prefab_id,
                transform: spawn.transform,
                active: spawn.active,
                holder,
                data: spawn.data.clone(),
            },
        );
    }

    pub fn destroy(&mut self, id: PickupableId) -> Result<Pickupable> {
        self.items.remove(&id).ok_or_else(|| Error::unknown_entity("pickupable", id))
    }

    /// Drop every entry `keep` rejects, returning how many were removed
    pub fn retain(&mut self, mut keep: impl FnMut(&Pickupable) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|_, p| keep(p));
        before - self.items.len()
    }

    pub fn set_active(&mut self, id: PickupableId, active: bool) -> Result<()> {
        self.get_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_position(&mut self, id: PickupableId, position: Vec3) -> Result<()> {
        self.get_mut(id)?.transform.position = position;
        Ok(())
    }

    /// Returns false when someone else already holds it
    pub fn pick_up(&mut self, id: PickupableId, peer: PeerId) -> Result<bool> {
        let item = self.get_mut(id)?;
        match item.holder {
            Some(holder) if holder != peer => Ok(false),
            _ => {
                item.holder = Some(peer);
                Ok(true)
            }
        }
    }

    pub fn release(&mut self, id: PickupableId, peer: PeerId) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.holder == Some(peer) {
            item.holder = None;
        }
        Ok(())
    }

    /// Release everything held by `peer`
    pub fn release_all(&mut self, peer: PeerId) -> usize {
        let mut count = 0;
        for item in self.items.values_mut().filter(|p| p.holder == Some(peer)) {
            item.holder = None;
            count += 1;
        }
        count
    }

    /// Take one bottle out of a beer case, returning the bottles left
    pub fn remove_bottle(&mut self, id: PickupableId) -> Result<u32> {
        let item = self.get_mut(id)?;
        let Some(remaining) = item.remaining_bottles() else {
            return Err(Error::unknown_entity("beer case", id));
        };
        if remaining == 0 {
            return Err(Error::EntityState { category: "beer case", id: id.into(), reason: "is already empty" });
        }
        let remaining = remaining - 1;
        item.data = Some(vec![remaining as f32]);
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(id: PickupableId, active: bool) -> PickupableSpawn {
        PickupableSpawn {
            id,
            prefab_id: 1,
            transform: Transform::default(),
            active,
            data: None,
        }
    }

    #[test]
    fn test_allocate_lowest_free() {
        let mut pool = PickupablePool::new();
        assert_eq!(pool.allocate_id().unwrap(), 0);
        for id in [0, 1, 3] {
            pool.spawn(&spawn(id, true)).unwrap();
        }
        assert_eq!(pool.allocate_id().unwrap(), 2);
        pool.spawn(&spawn(2, true)).unwrap();
        assert_eq!(pool.allocate_id().unwrap(), 4);
    }

    #[test]
    fn test_duplicate_spawn_rejected() {
        let mut pool = PickupablePool::new();
        pool.spawn(&spawn(5, true)).unwrap();
        assert!(matches!(
            pool.spawn(&spawn(5, false)),
            Err(Error::DuplicateEntity { category: "pickupable", id: 5 })
        ));
        assert!(pool.get(5).unwrap().active);
    }

    #[test]
    fn test_holder_exclusive() {
        let mut pool = PickupablePool::new();
        pool.spawn(&spawn(0, true)).unwrap();
        assert!(pool.pick_up(0, PeerId(1)).unwrap());
        assert!(!pool.pick_up(0, PeerId(2)).unwrap());
        pool.release(0, PeerId(2)).unwrap();
        assert_eq!(pool.get(0).unwrap().holder, Some(PeerId(1)));
        assert_eq!(pool.release_all(PeerId(1)), 1);
        assert_eq!(pool.get(0).unwrap().holder, None);
    }

    #[test]
    fn test_remove_bottle() {
        let mut pool = PickupablePool::new();
        pool.spawn(&PickupableSpawn { data: Some(full_beer_case()), ..spawn(0, true) }).unwrap();
        assert!(pool.get(0).unwrap().is_beer_case());
        assert_eq!(pool.remove_bottle(0).unwrap(), BEER_CASE_FULL - 1);
        assert_eq!(pool.remove_bottle(0).unwrap(), BEER_CASE_FULL - 2);

        pool.get_mut(0).unwrap().data = Some(vec![0.0]);
        let empty = pool.remove_bottle(0).unwrap_err();
        assert!(matches!(empty, Error::EntityState { category: "beer case", id: 0, .. }));
        assert_eq!(empty.severity(), crate::error::Severity::EntityMissing);
        assert_eq!(pool.get(0).unwrap().remaining_bottles(), Some(0));

        assert!(matches!(pool.remove_bottle(9), Err(Error::UnknownEntity { category: "pickupable", .. })));
    }

    #[test]
    fn test_remove_bottle_from_other_prefab_rejected() {
        let mut pool = PickupablePool::new();
        pool.spawn(&spawn(3, true)).unwrap();
        assert!(!pool.get(3).unwrap().is_beer_case());
        assert!(matches!(
            pool.remove_bottle(3),
            Err(Error::UnknownEntity { category: "beer case", id: 3 })
        ));
        assert_eq!(pool.get(3).unwrap().data, None);
    }

    #[test]
    fn test_upsert_keeps_holder() {
        let mut pool = PickupablePool::new();
        pool.spawn(&spawn(0, true)).unwrap();
        pool.pick_up(0, PeerId(1)).unwrap();
        pool.upsert(&spawn(0, false));
        let item = pool.get(0).unwrap();
        assert!(!item.active);
        assert_eq!(item.holder, Some(PeerId(1)));
    }
}
