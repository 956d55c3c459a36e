//! Registry of synchronized objects and the per-tick sync decision

use std::fmt;

use indexmap::IndexMap;

use crate::codec::Transform;
use crate::error::{Error, Result};
use crate::protocol::{Message, PeerId, SyncType};
use crate::protocol::message::{ObjectSync, ObjectSyncRequest, ObjectSyncResponse};

use super::ownership::{OwnershipState, Transition};
use super::policy::{policy_for, ObjectKind, SyncPolicy};
use super::source::EntityStateSource;

/// Pass as the id to have the registry pick one
pub const AUTOMATIC_ID: i32 = -1;

pub const DEFAULT_PERIODIC_SYNC_TICKS: u64 = 500;

/// Ownership changes observed by the local peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipEvent {
    Claimed { object_id: i32, owner: PeerId },
    Released { object_id: i32, previous: PeerId },
    /// The local peer lost an object to a forced take
    TakenByForce { object_id: i32, owner: PeerId },
}

pub struct SyncedObject {
    pub id: i32,
    pub ownership: OwnershipState,
    /// Stream every tick regardless of `can_sync`
    pub constant_sync: bool,
    policy: Box<dyn SyncPolicy>,
    source: Box<dyn EntityStateSource>,
}

impl SyncedObject {
    pub fn kind(&self) -> ObjectKind {
        self.policy.kind()
    }

    pub fn source(&self) -> &dyn EntityStateSource {
        self.source.as_ref()
    }

    fn object_sync(&self, sync_type: SyncType, send_variables: bool) -> ObjectSync {
        let transform = self.source.transform();
        ObjectSync {
            object_id: self.id,
            position: transform.position,
            rotation: transform.rotation,
            sync_type: Some(sync_type),
            synced_variables: if send_variables {
                self.policy.synced_variables(self.source.as_ref())
            } else {
                None
            },
        }
    }
}

impl fmt::Debug for SyncedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedObject")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("ownership", &self.ownership)
            .field("constant_sync", &self.constant_sync)
            .finish()
    }
}

pub struct ObjectSyncManager {
    objects: IndexMap<i32, SyncedObject, ahash::RandomState>,
    next_id: i32,
    periodic_sync_ticks: u64,
    ticks: u64,
    local: PeerId,
    is_host: bool,
    online: bool,
    /// Joiner is still applying the host's world
    loading: bool,
    outgoing: Vec<Message>,
    events: Vec<OwnershipEvent>,
}

impl Default for ObjectSyncManager {
    fn default() -> Self {
        Self::new(DEFAULT_PERIODIC_SYNC_TICKS)
    }
}

impl ObjectSyncManager {
    pub fn new(periodic_sync_ticks: u64) -> Self {
        Self {
            objects: IndexMap::with_hasher(ahash::RandomState::new()),
            next_id: 1,
            periodic_sync_ticks: periodic_sync_ticks.max(1),
            ticks: 0,
            local: PeerId(0),
            is_host: false,
            online: false,
            loading: false,
            outgoing: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Start syncing as `local` in a session
    pub fn attach(&mut self, local: PeerId, is_host: bool) {
        self.local = local;
        self.is_host = is_host;
        self.online = true;
        self.loading = !is_host;
        self.ticks = 0;
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Leave the session; registrations survive, ownership does not
    pub fn detach(&mut self) {
        self.online = false;
        self.loading = false;
        for object in self.objects.values_mut() {
            object.ownership = OwnershipState::default();
        }
        self.outgoing.clear();
    }

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&SyncedObject> {
        self.objects.get(&id)
    }

    pub fn ownership(&self, id: i32) -> Option<OwnershipState> {
        self.objects.get(&id).map(|o| o.ownership)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncedObject> {
        self.objects.values()
    }

    fn object_mut(&mut self, id: i32) -> Result<&mut SyncedObject> {
        self.objects.get_mut(&id).ok_or_else(|| Error::unknown_entity("object", id))
    }

    /// Register an object. `AUTOMATIC_ID` allocates the next id; any other id
    /// replaces whatever is registered there. Returns `None` when an online joiner
    /// tries to allocate an id after loading, since only the host hands those out.
    pub fn register(
        &mut self,
        id: i32,
        kind: ObjectKind,
        source: Box<dyn EntityStateSource>,
    ) -> Result<Option<i32>> {
        let id = if id == AUTOMATIC_ID {
            if self.online && !self.is_host && !self.loading {
                tracing::debug!(%kind, "ignoring automatic object registration on joiner");
                return Ok(None);
            }
            let id = self.next_id;
            self.next_id += 1;
            id
        } else {
            if id < 0 {
                return Err(Error::unknown_entity("object", id));
            }
            if self.objects.contains_key(&id) {
                tracing::warn!(object_id = id, "replacing object registered under forced id");
            }
            self.next_id = self.next_id.max(id.saturating_add(1));
            id
        };

        let object = SyncedObject {
            id,
            ownership: OwnershipState::default(),
            constant_sync: false,
            policy: policy_for(kind),
            source,
        };
        self.objects.insert(id, object);
        tracing::debug!(object_id = id, %kind, "registered synced object");
        Ok(Some(id))
    }

    pub fn remove(&mut self, id: i32) -> Result<()> {
        self.objects
            .shift_remove(&id)
            .map(|_| tracing::debug!(object_id = id, "removed synced object"))
            .ok_or_else(|| Error::unknown_entity("object", id))
    }

    /// Local player came near the object
    pub fn request_ownership(&mut self, id: i32) -> Result<bool> {
        let object = self.objects.get_mut(&id).ok_or_else(|| Error::unknown_entity("object", id))?;
        if !object.policy.should_take_ownership() || !object.ownership.request() {
            return Ok(false);
        }
        let message = object.object_sync(SyncType::SetOwner, true);
        tracing::debug!(object_id = id, "requesting ownership");
        self.outgoing.push(Message::ObjectSync(message));
        Ok(true)
    }

    /// Local player moved away from the object
    pub fn release_ownership(&mut self, id: i32) -> Result<bool> {
        let local = self.local;
        let object = self.object_mut(id)?;
        if !object.ownership.release(local) {
            return Ok(false);
        }
        let message = object.object_sync(SyncType::RemoveOwner, false);
        self.outgoing.push(Message::ObjectSync(message));
        self.events.push(OwnershipEvent::Released { object_id: id, previous: local });
        Ok(true)
    }

    /// Take the object regardless of its current owner
    pub fn take_ownership(&mut self, id: i32) -> Result<bool> {
        let local = self.local;
        let object = self.object_mut(id)?;
        let Some(previous) = object.ownership.take(local) else {
            return Ok(false);
        };
        let message = object.object_sync(SyncType::ForceSetOwner, true);
        tracing::debug!(object_id = id, ?previous, "taking ownership by force");
        self.outgoing.push(Message::ObjectSync(message));
        self.events.push(OwnershipEvent::Claimed { object_id: id, owner: local });
        Ok(true)
    }

    pub fn set_constant_sync(&mut self, id: i32, constant: bool) -> Result<()> {
        let object = self.object_mut(id)?;
        object.constant_sync = constant;
        object.policy.constant_sync_changed(object.source.as_mut(), constant);
        Ok(())
    }

    /// Ask the host for the object's current state
    pub fn request_sync(&mut self, id: i32) -> Result<()> {
        if !self.objects.contains_key(&id) {
            return Err(Error::unknown_entity("object", id));
        }
        self.outgoing.push(Message::ObjectSyncRequest(ObjectSyncRequest { object_id: id }));
        Ok(())
    }

    fn should_periodic_sync(&self, ownership: &OwnershipState) -> bool {
        self.ticks % self.periodic_sync_ticks == 0
            && (ownership.sync_enabled || (ownership.is_unowned() && self.is_host))
    }

    /// Fixed timestep: stream owned objects and run periodic syncs
    pub fn fixed_update(&mut self) {
        if !self.online {
            return;
        }
        self.ticks += 1;

        let ids: Vec<i32> = self.objects.keys().copied().collect();
        for id in ids {
            let Some(object) = self.objects.get(&id) else { continue };
            let periodic = object.policy.periodic_sync_enabled()
                && self.should_periodic_sync(&object.ownership);

            let Some(object) = self.objects.get_mut(&id) else { continue };
            if object.ownership.sync_enabled {
                let stream = object.constant_sync || object.policy.can_sync(object.source.as_ref());
                if stream {
                    let message = object.object_sync(SyncType::GenericSync, true);
                    self.outgoing.push(Message::ObjectSync(message));
                }
            }
            if periodic {
                let message = object.object_sync(SyncType::PeriodicSync, true);
                self.outgoing.push(Message::ObjectSync(message));
            }
        }
    }

    /// Apply an `ObjectSync` received from `sender`
    pub fn handle_object_sync(&mut self, sender: PeerId, message: &ObjectSync) -> Result<()> {
        let (local, is_host) = (self.local, self.is_host);
        let object_id = message.object_id;
        let object = self
            .objects
            .get_mut(&object_id)
            .ok_or_else(|| Error::unknown_entity("object", object_id))?;

        let sync_type = message.sync_type();
        let was_owner = object.ownership.is_owned_by(sender);
        let transition = object.ownership.apply_remote(sync_type, sender, local, is_host);

        match transition {
            Transition::Claimed { yielded } => {
                if yielded {
                    tracing::debug!(object_id, "yielding pending claim to host");
                }
                object.policy.owner_set_to_remote(object.source.as_mut());
                self.outgoing.push(Message::ObjectSyncResponse(ObjectSyncResponse {
                    object_id,
                    accepted: true,
                }));
                self.events.push(OwnershipEvent::Claimed { object_id, owner: sender });
            }
            Transition::ClaimRejected { owner } => {
                tracing::debug!(object_id, peer = %sender, ?owner, "ownership claim rejected");
            }
            Transition::Forced { previous } => {
                if previous == Some(local) {
                    object.policy.sync_taken_by_force(object.source.as_mut());
                }
                object.policy.owner_set_to_remote(object.source.as_mut());
                if transition.taken_by_force(sender) {
                    tracing::info!(object_id, peer = %sender, "object taken by force");
                    self.events.push(OwnershipEvent::TakenByForce { object_id, owner: sender });
                } else {
                    self.events.push(OwnershipEvent::Claimed { object_id, owner: sender });
                }
            }
            Transition::Released => {
                object.policy.owner_removed(object.source.as_mut());
                self.events.push(OwnershipEvent::Released { object_id, previous: sender });
            }
            Transition::ReleaseIgnored { owner } => {
                tracing::debug!(object_id, peer = %sender, ?owner, "release from non-owner ignored");
            }
            Transition::Unchanged => {}
        }

        let apply_state = match sync_type {
            SyncType::RemoveOwner => was_owner,
            _ => object.ownership.accepts_state_from(sync_type, sender, !is_host),
        };
        if !apply_state {
            tracing::trace!(object_id, peer = %sender, ?sync_type, "state from non-owner dropped");
            return Ok(());
        }

        object.source.set_transform(Transform::new(message.position, message.rotation));
        if let Some(variables) = &message.synced_variables {
            object.policy.apply_synced_variables(object.source.as_mut(), variables);
        }
        Ok(())
    }

    /// The remote peer answered our `SetOwner`
    pub fn handle_response(&mut self, sender: PeerId, response: &ObjectSyncResponse) -> Result<()> {
        let local = self.local;
        let object = self.object_mut(response.object_id)?;
        let was_pending = object.ownership.pending_claim;
        if object.ownership.accept_response(local, response.accepted) {
            tracing::debug!(object_id = response.object_id, peer = %sender, "ownership granted");
            self.events.push(OwnershipEvent::Claimed { object_id: response.object_id, owner: local });
        } else if response.accepted && !was_pending && object.ownership.is_unowned() {
            // claim withdrawn before the grant arrived; the sender now thinks we own it
            tracing::debug!(object_id = response.object_id, peer = %sender, "returning withdrawn claim");
            let message = object.object_sync(SyncType::RemoveOwner, false);
            self.outgoing.push(Message::ObjectSync(message));
        }
        Ok(())
    }

    /// Host answers a state request with a periodic sync
    pub fn handle_request(&mut self, sender: PeerId, request: &ObjectSyncRequest) -> Result<()> {
        if !self.is_host {
            tracing::debug!(peer = %sender, object_id = request.object_id, "sync request on joiner, ignored");
            return Ok(());
        }
        let object = self
            .objects
            .get(&request.object_id)
            .ok_or_else(|| Error::unknown_entity("object", request.object_id))?;
        let message = object.object_sync(SyncType::PeriodicSync, true);
        self.outgoing.push(Message::ObjectSync(message));
        Ok(())
    }

    /// Everything `peer` owned becomes unowned. Returns how many objects changed.
    pub fn peer_removed(&mut self, peer: PeerId) -> usize {
        let mut released = 0;
        for object in self.objects.values_mut() {
            if object.ownership.peer_removed(peer) {
                object.policy.owner_removed(object.source.as_mut());
                self.events.push(OwnershipEvent::Released { object_id: object.id, previous: peer });
                released += 1;
            }
        }
        if released > 0 {
            tracing::info!(%peer, released, "released objects owned by departed peer");
        }
        released
    }

    pub fn drain_outgoing(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn drain_events(&mut self) -> Vec<OwnershipEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Transform, Vec3};
    use crate::sync::policy::USE_GRAVITY;
    use crate::sync::source::SimpleEntity;

    const HOST: PeerId = PeerId(1);
    const JOINER: PeerId = PeerId(2);

    fn deliver(from: &mut ObjectSyncManager, sender: PeerId, to: &mut ObjectSyncManager) {
        for message in from.drain_outgoing() {
            match message {
                Message::ObjectSync(m) => to.handle_object_sync(sender, &m).unwrap(),
                Message::ObjectSyncResponse(m) => to.handle_response(sender, &m).unwrap(),
                Message::ObjectSyncRequest(m) => to.handle_request(sender, &m).unwrap(),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    fn pair() -> (ObjectSyncManager, ObjectSyncManager) {
        let mut host = ObjectSyncManager::default();
        let mut joiner = ObjectSyncManager::default();
        host.attach(HOST, true);
        joiner.attach(JOINER, false);
        host.register(AUTOMATIC_ID, ObjectKind::Pickupable, Box::new(SimpleEntity::default()))
            .unwrap();
        joiner
            .register(AUTOMATIC_ID, ObjectKind::Pickupable, Box::new(SimpleEntity::default()))
            .unwrap();
        joiner.finish_loading();
        (host, joiner)
    }

    #[test]
    fn test_automatic_ids_start_at_one() {
        let mut manager = ObjectSyncManager::default();
        let a = manager.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default()));
        let b = manager.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default()));
        assert_eq!(a.unwrap(), Some(1));
        assert_eq!(b.unwrap(), Some(2));

        manager.remove(2).unwrap();
        let c = manager.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default()));
        assert_eq!(c.unwrap(), Some(3));
    }

    #[test]
    fn test_forced_id_replaces_and_bumps() {
        let mut manager = ObjectSyncManager::default();
        manager.register(10, ObjectKind::Boat, Box::new(SimpleEntity::default())).unwrap();
        manager.register(10, ObjectKind::GarageDoor, Box::new(SimpleEntity::default())).unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get(10).unwrap().kind(), ObjectKind::GarageDoor);

        let next = manager.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default()));
        assert_eq!(next.unwrap(), Some(11));
    }

    #[test]
    fn test_joiner_automatic_registration_after_load_ignored() {
        let mut joiner = ObjectSyncManager::default();
        joiner.attach(JOINER, false);
        joiner.finish_loading();
        let id = joiner.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default()));
        assert_eq!(id.unwrap(), None);
        assert!(joiner.is_empty());
    }

    #[test]
    fn test_claim_and_release() {
        let (mut host, mut joiner) = pair();

        assert!(joiner.request_ownership(1).unwrap());
        deliver(&mut joiner, JOINER, &mut host);
        assert_eq!(host.ownership(1).unwrap().owner, Some(JOINER));
        deliver(&mut host, HOST, &mut joiner);
        let state = joiner.ownership(1).unwrap();
        assert_eq!(state.owner, Some(JOINER));
        assert!(state.sync_enabled);

        // host cannot claim an owned object
        assert!(!host.request_ownership(1).unwrap());

        assert!(joiner.release_ownership(1).unwrap());
        deliver(&mut joiner, JOINER, &mut host);
        assert!(host.ownership(1).unwrap().is_unowned());
        assert_eq!(
            host.drain_events(),
            vec![
                OwnershipEvent::Claimed { object_id: 1, owner: JOINER },
                OwnershipEvent::Released { object_id: 1, previous: JOINER },
            ]
        );
    }

    #[test]
    fn test_force_take_notifies_previous_owner() {
        let (mut host, mut joiner) = pair();
        host.take_ownership(1).unwrap();
        deliver(&mut host, HOST, &mut joiner);
        joiner.drain_events();

        joiner.take_ownership(1).unwrap();
        deliver(&mut joiner, JOINER, &mut host);
        assert_eq!(host.drain_events(), vec![
            OwnershipEvent::Claimed { object_id: 1, owner: HOST },
            OwnershipEvent::TakenByForce { object_id: 1, owner: JOINER },
        ]);
        let state = host.ownership(1).unwrap();
        assert_eq!(state.owner, Some(JOINER));
        assert!(!state.sync_enabled);
    }

    #[test]
    fn test_streaming_only_from_owner() {
        let (mut host, mut joiner) = pair();
        let entity = SimpleEntity::shared(Transform::default());
        host.register(5, ObjectKind::Pickupable, Box::new(SimpleEntity::default())).unwrap();
        joiner.register(5, ObjectKind::Pickupable, Box::new(entity.clone())).unwrap();

        host.take_ownership(5).unwrap();
        host.set_constant_sync(5, true).unwrap();
        deliver(&mut host, HOST, &mut joiner);
        host.fixed_update();
        deliver(&mut host, HOST, &mut joiner);
        // held by the host, so gravity is off on the joiner
        assert_eq!(entity.borrow().variables.get(USE_GRAVITY), Some(&0.0));

        let stray = ObjectSync {
            object_id: 5,
            position: Vec3::new(9.0, 9.0, 9.0),
            rotation: Default::default(),
            sync_type: None,
            synced_variables: None,
        };
        host.handle_object_sync(JOINER, &stray).unwrap();
        assert_ne!(host.get(5).unwrap().source().transform().position, stray.position);
    }

    #[test]
    fn test_periodic_sync_from_host_when_unowned() {
        let mut host = ObjectSyncManager::new(3);
        host.attach(HOST, true);
        host.register(AUTOMATIC_ID, ObjectKind::Boat, Box::new(SimpleEntity::default())).unwrap();
        host.register(AUTOMATIC_ID, ObjectKind::Pickupable, Box::new(SimpleEntity::default()))
            .unwrap();

        for _ in 0..3 {
            host.fixed_update();
        }
        let sent = host.drain_outgoing();
        // pickupables have no periodic sync
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            Message::ObjectSync(ObjectSync { object_id: 1, sync_type: Some(SyncType::PeriodicSync), .. })
        ));
    }

    #[test]
    fn test_sync_request_answered_by_host() {
        let (mut host, mut joiner) = pair();
        joiner.request_sync(1).unwrap();
        deliver(&mut joiner, JOINER, &mut host);
        let sent = host.drain_outgoing();
        assert!(matches!(
            &sent[..],
            [Message::ObjectSync(ObjectSync { sync_type: Some(SyncType::PeriodicSync), .. })]
        ));
    }

    #[test]
    fn test_withdrawn_claim_handed_back() {
        let (mut host, mut joiner) = pair();
        assert!(joiner.request_ownership(1).unwrap());
        assert!(!joiner.release_ownership(1).unwrap());
        deliver(&mut joiner, JOINER, &mut host);
        assert_eq!(host.ownership(1).unwrap().owner, Some(JOINER));

        deliver(&mut host, HOST, &mut joiner);
        assert!(joiner.ownership(1).unwrap().is_unowned());
        deliver(&mut joiner, JOINER, &mut host);
        assert!(host.ownership(1).unwrap().is_unowned());
    }

    #[test]
    fn test_claim_granted_after_crossing_release() {
        let (mut host, mut joiner) = pair();
        host.take_ownership(1).unwrap();
        assert!(joiner.request_ownership(1).unwrap());
        host.release_ownership(1).unwrap();

        // the host sees the claim only after its own release
        deliver(&mut joiner, JOINER, &mut host);
        assert_eq!(host.ownership(1).unwrap().owner, Some(JOINER));
        deliver(&mut host, HOST, &mut joiner);
        deliver(&mut joiner, JOINER, &mut host);

        assert!(host.ownership(1).unwrap().is_unowned());
        assert!(joiner.ownership(1).unwrap().is_unowned());
        assert!(joiner.request_ownership(1).unwrap());
    }

    #[test]
    fn test_peer_removed_reverts_ownership() {
        let (mut host, mut joiner) = pair();
        joiner.request_ownership(1).unwrap();
        deliver(&mut joiner, JOINER, &mut host);
        assert_eq!(host.peer_removed(JOINER), 1);
        assert!(host.ownership(1).unwrap().is_unowned());
    }

    #[test]
    fn test_unknown_object() {
        let mut manager = ObjectSyncManager::default();
        assert!(matches!(
            manager.request_ownership(42),
            Err(Error::UnknownEntity { category: "object", id: 42 })
        ));
    }
}
