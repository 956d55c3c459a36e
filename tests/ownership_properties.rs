use proptest::prelude::*;

use mscmp_client::codec::{Quat, Transform, Vec3};
use mscmp_client::protocol::message::ObjectSync;
use mscmp_client::protocol::{Message, PeerId, SyncType, PROTOCOL_ID};
use mscmp_client::sync::{ObjectKind, ObjectSyncManager, SimpleEntity, AUTOMATIC_ID};

const HOST: PeerId = PeerId(1);
const JOINER: PeerId = PeerId(2);
const OBJECT: i32 = 1;

#[derive(Debug, Clone, Copy)]
enum Op {
    Request,
    Release,
    Take,
    /// Deliver everything queued on this side to the other one
    Deliver,
}

fn op() -> impl Strategy<Value = (Op, bool)> {
    let op = prop_oneof![Just(Op::Request), Just(Op::Release), Just(Op::Take), Just(Op::Deliver)];
    (op, any::<bool>())
}

fn manager(local: PeerId, is_host: bool) -> ObjectSyncManager {
    let mut manager = ObjectSyncManager::default();
    let entity = SimpleEntity::new(Transform::default());
    assert_eq!(manager.register(AUTOMATIC_ID, ObjectKind::Pickupable, Box::new(entity)).unwrap(), Some(OBJECT));
    manager.attach(local, is_host);
    manager.finish_loading();
    manager
}

fn deliver(from: &mut ObjectSyncManager, to: &mut ObjectSyncManager) -> usize {
    let sender = from.local_peer();
    let messages = from.drain_outgoing();
    let count = messages.len();
    for message in messages {
        match message {
            Message::ObjectSync(sync) => to.handle_object_sync(sender, &sync).unwrap(),
            Message::ObjectSyncResponse(response) => to.handle_response(sender, &response).unwrap(),
            Message::ObjectSyncRequest(request) => to.handle_request(sender, &request).unwrap(),
            other => panic!("unexpected message {:?}", other.id()),
        }
    }
    count
}

fn settle(host: &mut ObjectSyncManager, joiner: &mut ObjectSyncManager) {
    for _ in 0..16 {
        if deliver(host, joiner) + deliver(joiner, host) == 0 {
            return;
        }
    }
    panic!("ownership messages never settled");
}

proptest! {
    #[test]
    fn prop_peers_agree_on_owner_once_settled(ops in prop::collection::vec(op(), 0..48)) {
        let mut host = manager(HOST, true);
        let mut joiner = manager(JOINER, false);

        for (op, on_host) in ops {
            let (local, remote) = if on_host { (&mut host, &mut joiner) } else { (&mut joiner, &mut host) };
            match op {
                Op::Request => { local.request_ownership(OBJECT).unwrap(); }
                Op::Release => { local.release_ownership(OBJECT).unwrap(); }
                Op::Take => {
                    // forces are never in flight in both directions at once
                    deliver(remote, local);
                    local.take_ownership(OBJECT).unwrap();
                }
                Op::Deliver => { deliver(local, remote); }
            }
        }
        settle(&mut host, &mut joiner);

        let host_view = host.ownership(OBJECT).unwrap();
        let joiner_view = joiner.ownership(OBJECT).unwrap();
        prop_assert_eq!(host_view.owner, joiner_view.owner);
        prop_assert_eq!(host_view.sync_enabled, host_view.owner == Some(HOST));
        prop_assert_eq!(joiner_view.sync_enabled, joiner_view.owner == Some(JOINER));
    }

    #[test]
    fn prop_foreign_protocol_id_never_parses(id in any::<u32>(), tail in prop::collection::vec(any::<u8>(), 1..64)) {
        prop_assume!(id != PROTOCOL_ID);
        let mut packet = id.to_le_bytes().to_vec();
        packet.extend_from_slice(&tail);
        prop_assert!(Message::parse(&packet).is_err());
    }

    #[test]
    fn prop_garbage_payload_does_not_panic(id in 0u8..40, payload in prop::collection::vec(any::<u8>(), 0..128)) {
        let mut packet = PROTOCOL_ID.to_le_bytes().to_vec();
        packet.push(id);
        packet.extend_from_slice(&payload);
        let _ = Message::parse(&packet);
    }

    #[test]
    fn prop_object_sync_survives_the_wire(
        object_id in any::<i32>(),
        x in -1.0e4f32..1.0e4,
        z in -1.0e4f32..1.0e4,
        sync_type in prop::option::of(0i32..5),
        variables in prop::option::of(prop::collection::vec(-100.0f32..100.0, 0..8)),
    ) {
        let message = Message::ObjectSync(ObjectSync {
            object_id,
            position: Vec3::new(x, 0.5, z),
            rotation: Quat::IDENTITY,
            sync_type: sync_type.and_then(SyncType::from_i32),
            synced_variables: variables,
        });
        prop_assert_eq!(Message::parse(&message.encode()).unwrap(), message);
    }
}
