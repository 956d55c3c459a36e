//! Two sessions wired back to back over a loopback link

use std::cell::RefCell;
use std::rc::Rc;

use mscmp_client::codec::{Transform, Vec3};
use mscmp_client::protocol::{
    DisconnectReason, JoinAbortReason, LinkHandle, LoopbackTransport, ManualClock, MessageId,
};
use mscmp_client::state::GameWorld;
use mscmp_client::sync::{
    apply_full_world_sync, write_full_world_sync, FsmEventSink, ObjectKind, OwnershipEvent,
    SimpleEntity, AUTOMATIC_ID,
};
use mscmp_client::{ConnectionState, PeerId, Session, SessionBuilder, SessionConfig, SessionEvent};

const HOST: PeerId = PeerId(1);
const JOINER: PeerId = PeerId(2);
const BOAT: i32 = 1;

struct Peers {
    host: Session,
    joiner: Session,
    clock: ManualClock,
    link: LinkHandle,
    host_boat: Rc<RefCell<SimpleEntity>>,
    joiner_boat: Rc<RefCell<SimpleEntity>>,
}

fn world() -> GameWorld {
    let mut world = GameWorld::new();
    world.add_door("HOUSE", Vec3::new(1.0, 0.0, 1.0), false);
    world.add_light_switch("KITCHEN", Vec3::new(2.0, 1.0, 2.0), false);
    world.vehicles.register("SATSUMA", Transform::default()).unwrap();
    world
}

fn session_with(transport: LoopbackTransport, clock: &ManualClock, config: SessionConfig) -> Session {
    SessionBuilder::new(transport).clock(clock.clone()).config(config).world(world()).build()
}

fn peers_with(host_config: SessionConfig, joiner_config: SessionConfig) -> Peers {
    let (host_t, joiner_t) = LoopbackTransport::pair(HOST, JOINER);
    let link = host_t.link();
    let clock = ManualClock::new(10_000);
    let mut host = session_with(host_t, &clock, host_config);
    let mut joiner = session_with(joiner_t, &clock, joiner_config);

    let start = Transform::at(Vec3::new(30.0, 0.0, 30.0));
    let host_boat = SimpleEntity::shared(start);
    let joiner_boat = SimpleEntity::shared(start);
    // registered before going online, so both peers allocate the same id
    assert_eq!(host.register_object(AUTOMATIC_ID, ObjectKind::Boat, host_boat.clone()).unwrap(), Some(BOAT));
    assert_eq!(joiner.register_object(AUTOMATIC_ID, ObjectKind::Boat, joiner_boat.clone()).unwrap(), Some(BOAT));

    Peers { host, joiner, clock, link, host_boat, joiner_boat }
}

fn pump(peers: &mut Peers) {
    for _ in 0..4 {
        peers.joiner.update();
        peers.host.update();
    }
}

fn connected() -> Peers {
    let mut peers = peers_with(SessionConfig::default(), SessionConfig::default());
    peers.host.create_session().unwrap();
    peers.joiner.join_session("1").unwrap();
    pump(&mut peers);
    assert_eq!(peers.joiner.state(), ConnectionState::Playing);
    peers.host.drain_events();
    peers.joiner.drain_events();
    peers
}

fn owner(session: &Session, id: i32) -> Option<PeerId> {
    session.objects().ownership(id).unwrap().owner
}

fn ownership_events(events: &[SessionEvent]) -> Vec<OwnershipEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Ownership(event) => Some(*event),
            _ => None,
        })
        .collect()
}

#[test]
fn test_claim_stream_release_then_other_peer_claims() {
    let mut peers = connected();

    peers.joiner.trigger_enter(BOAT);
    pump(&mut peers);
    assert_eq!(owner(&peers.host, BOAT), Some(JOINER));
    assert_eq!(owner(&peers.joiner, BOAT), Some(JOINER));
    assert!(peers.joiner.objects().ownership(BOAT).unwrap().sync_enabled);
    assert!(ownership_events(&peers.host.drain_events())
        .contains(&OwnershipEvent::Claimed { object_id: BOAT, owner: JOINER }));
    assert!(ownership_events(&peers.joiner.drain_events())
        .contains(&OwnershipEvent::Claimed { object_id: BOAT, owner: JOINER }));

    // the owner streams while the boat moves
    {
        let mut boat = peers.joiner_boat.borrow_mut();
        boat.velocity = Vec3::new(2.0, 0.0, 0.0);
        boat.transform.position = Vec3::new(35.0, 0.0, 30.0);
    }
    peers.joiner.fixed_update();
    pump(&mut peers);
    assert_eq!(peers.host_boat.borrow().transform.position, Vec3::new(35.0, 0.0, 30.0));

    peers.joiner.trigger_exit(BOAT);
    pump(&mut peers);
    assert_eq!(owner(&peers.host, BOAT), None);
    assert_eq!(owner(&peers.joiner, BOAT), None);
    assert!(ownership_events(&peers.host.drain_events())
        .contains(&OwnershipEvent::Released { object_id: BOAT, previous: JOINER }));

    peers.host.trigger_enter(BOAT);
    pump(&mut peers);
    assert_eq!(owner(&peers.host, BOAT), Some(HOST));
    assert_eq!(owner(&peers.joiner, BOAT), Some(HOST));
}

#[test]
fn test_forced_take_reported_only_to_previous_owner() {
    let mut peers = connected();
    peers.host.trigger_enter(BOAT);
    pump(&mut peers);
    assert_eq!(owner(&peers.joiner, BOAT), Some(HOST));
    peers.host.drain_events();
    peers.joiner.drain_events();

    assert!(peers.joiner.take_ownership(BOAT).unwrap());
    pump(&mut peers);

    assert_eq!(owner(&peers.host, BOAT), Some(JOINER));
    assert_eq!(owner(&peers.joiner, BOAT), Some(JOINER));
    assert!(!peers.host.objects().ownership(BOAT).unwrap().sync_enabled);

    let taken = |events: &[OwnershipEvent]| {
        events.iter().filter(|e| matches!(e, OwnershipEvent::TakenByForce { .. })).count()
    };
    let host_events = ownership_events(&peers.host.drain_events());
    let joiner_events = ownership_events(&peers.joiner.drain_events());
    assert_eq!(taken(&host_events), 1);
    assert_eq!(taken(&joiner_events), 0);
    assert!(host_events.contains(&OwnershipEvent::TakenByForce { object_id: BOAT, owner: JOINER }));
}

#[test]
fn test_joiner_with_older_version_aborts() {
    let host_config = SessionConfig { protocol_version: 3, ..Default::default() };
    let joiner_config = SessionConfig { protocol_version: 2, ..Default::default() };
    let mut peers = peers_with(host_config, joiner_config);
    peers.host.create_session().unwrap();
    peers.joiner.join_session("1").unwrap();
    pump(&mut peers);

    assert_eq!(peers.joiner.state(), ConnectionState::Idle);
    assert_eq!(peers.host.remote_peer(), None);
    // nothing after the handshake went out
    assert_eq!(peers.joiner.stats().last_sent(), Some(MessageId::Handshake));
    assert_eq!(peers.joiner.stats().sent.packets_total, 1);

    let events = peers.joiner.drain_events();
    let aborted = events
        .iter()
        .find(|e| matches!(e, SessionEvent::JoinAborted { .. }))
        .expect("join aborted");
    assert_eq!(
        aborted,
        &SessionEvent::JoinAborted { reason: JoinAbortReason::HostNewer { host: 3, local: 2 } }
    );
    assert!(aborted.user_message().unwrap().contains("host has newer version"));
    assert!(!peers.host.drain_events().iter().any(|e| matches!(e, SessionEvent::PlayerJoined { .. })));
}

#[test]
fn test_lost_world_request_is_asked_again() {
    let mut peers = peers_with(SessionConfig::default(), SessionConfig::default());
    peers.host.create_session().unwrap();
    peers.joiner.join_session("1").unwrap();
    peers.host.update();

    // the handshake reply is already queued; the world request goes nowhere
    peers.link.set_up(false);
    peers.joiner.update();
    peers.link.set_up(true);
    assert_eq!(peers.joiner.remote_peer(), Some(HOST));

    pump(&mut peers);
    assert_eq!(peers.joiner.state(), ConnectionState::LoadingGameWorld);

    let interval = SessionConfig::default().world_request_interval_ms;
    for _ in 0..interval / 500 {
        peers.clock.advance(500);
        pump(&mut peers);
    }
    assert_eq!(peers.joiner.state(), ConnectionState::Playing);
    assert!(peers.joiner.world_synced());
    assert_eq!(peers.host.state(), ConnectionState::Playing);
}

#[test]
fn test_heartbeat_timeout_releases_departed_owner() {
    let mut peers = connected();
    peers.joiner.trigger_enter(BOAT);
    pump(&mut peers);
    assert_eq!(owner(&peers.host, BOAT), Some(JOINER));

    peers.link.set_up(false);
    let timeout = peers.host.config().heartbeat_timeout_ms;
    for _ in 0..4 {
        peers.clock.advance(timeout / 3);
        pump(&mut peers);
    }

    assert_eq!(owner(&peers.host, BOAT), None);
    assert_eq!(peers.host.state(), ConnectionState::Playing);
    assert_eq!(peers.host.remote_peer(), None);
    let host_events = peers.host.drain_events();
    assert!(host_events.contains(&SessionEvent::PlayerLeft { peer: JOINER, reason: DisconnectReason::Timeout }));
    assert!(ownership_events(&host_events)
        .contains(&OwnershipEvent::Released { object_id: BOAT, previous: JOINER }));

    assert_eq!(peers.joiner.state(), ConnectionState::Disconnected);
    assert!(peers
        .joiner
        .drain_events()
        .contains(&SessionEvent::Disconnected { reason: DisconnectReason::Timeout }));
    assert_eq!(owner(&peers.joiner, BOAT), None);
}

#[test]
fn test_world_changes_reach_the_other_peer() {
    let mut peers = connected();
    peers.host.set_door(Vec3::new(1.0, 0.0, 1.0), true).unwrap();
    peers.joiner.set_light_switch(Vec3::new(2.0, 1.0, 2.0), true).unwrap();
    pump(&mut peers);

    assert!(peers.joiner.world().doors[0].open);
    assert!(peers.host.world().light_switches[0].on);
    assert!(peers
        .joiner
        .drain_events()
        .contains(&SessionEvent::DoorChanged { position: Vec3::new(1.0, 0.0, 1.0), open: true }));
}

#[derive(Clone, Default)]
struct SharedFsm {
    fired: Rc<RefCell<Vec<(String, String)>>>,
    active: Option<String>,
}

impl FsmEventSink for SharedFsm {
    fn fire_event(&mut self, fsm: &str, event: &str) {
        self.fired.borrow_mut().push((fsm.to_string(), event.to_string()));
    }

    fn active_state_name(&self, _fsm: &str) -> Option<String> {
        self.active.clone()
    }
}

#[test]
fn test_event_hooks_mirror_states_without_echo() {
    let mut peers = connected();
    let host_fsm = SharedFsm { active: Some("Closed".to_string()), ..Default::default() };
    let joiner_fsm = SharedFsm::default();
    peers.host.set_fsm_sink(host_fsm.clone());
    peers.joiner.set_fsm_sink(joiner_fsm.clone());

    assert_eq!(peers.host.register_event_hook("GarageDoor", "Open").id, 1);
    let registration = peers.joiner.register_event_hook("GarageDoor", "Open");
    assert!(registration.new_fsm);
    pump(&mut peers);
    // joiner asked for the current state when it first hooked the fsm
    assert_eq!(
        joiner_fsm.fired.borrow().as_slice(),
        &[("GarageDoor".to_string(), "MP_Closed".to_string())]
    );

    peers.host.fsm_state_entered(1, Some("CLICK")).unwrap();
    pump(&mut peers);
    assert_eq!(joiner_fsm.fired.borrow().last().unwrap().1, "MP_Open");

    // entered because of the network, not sent back
    peers.joiner.fsm_state_entered(1, Some("MP_Open")).unwrap();
    pump(&mut peers);
    assert!(host_fsm.fired.borrow().is_empty());
}

#[test]
fn test_full_world_sync_twice_equals_once() {
    let mut host_world = world();
    host_world.clock.hour = 21;
    host_world.mailbox_name = "MAILBOX_TEIMO".to_string();
    host_world.set_door_open(Vec3::new(1.0, 0.0, 1.0), true).unwrap();
    let snapshot = write_full_world_sync(&host_world);

    let mut once = world();
    apply_full_world_sync(&mut once, &snapshot);
    let mut twice = world();
    apply_full_world_sync(&mut twice, &snapshot);
    apply_full_world_sync(&mut twice, &snapshot);

    assert_eq!(write_full_world_sync(&once), write_full_world_sync(&twice));
    assert_eq!(write_full_world_sync(&twice), snapshot);
}

#[test]
fn test_automatic_registration_after_join_is_host_only() {
    let mut peers = connected();
    let late = SimpleEntity::shared(Transform::default());
    assert_eq!(peers.joiner.register_object(AUTOMATIC_ID, ObjectKind::Pickupable, late.clone()).unwrap(), None);
    assert_eq!(peers.host.register_object(AUTOMATIC_ID, ObjectKind::Pickupable, late).unwrap(), Some(2));
}
