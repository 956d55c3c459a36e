use crate::client::config::SessionConfig;
use crate::client::events::{EventCollector, EventHandler, SessionEvent};
use crate::client::stats::NetStatistics;
use crate::codec::{Transform, Vec3, Weather};
use crate::error::{Error, Result, Severity};
use crate::protocol::message::{
    AnimSync, FullWorldSync, OpenDoors, PickedUpSync, PickupObject, PickupableActivate,
    PickupableDestroy, PickupableSetPosition, PickupableSpawn, PlayerSync, ReleaseObject,
    RemoveBottle, VehicleEnter, VehicleState, VehicleSwitch, VehicleSync,
};
use crate::protocol::{
    Clock, Connection, ConnectionEvent, ConnectionState, DirectLobby, DisconnectReason, Lobby,
    LobbyId, Message, PeerId, SystemClock, Transport,
};
use crate::state::{
    AnimState, GameWorld, PickupableId, Seat, SwitchValue, VehicleId, VehicleInputs,
};
use crate::sync::{
    apply_full_world_sync, apply_periodic_update, write_full_world_sync, write_periodic_update,
    EntityStateSource, EventHookRegistry, FsmEventSink, HookRegistration, ObjectKind,
    ObjectSyncManager, TriggerKind, TriggerQueue,
};

/// Builder for creating sessions
pub struct SessionBuilder {
    transport: Box<dyn Transport>,
    lobby: Box<dyn Lobby>,
    clock: Box<dyn Clock>,
    config: SessionConfig,
    world: GameWorld,
}

impl SessionBuilder {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            lobby: Box::new(DirectLobby::new()),
            clock: Box::new(SystemClock),
            config: SessionConfig::default(),
            world: GameWorld::new(),
        }
    }

    pub fn lobby(mut self, lobby: impl Lobby + 'static) -> Self {
        self.lobby = Box::new(lobby);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// The local world as loaded by the engine
    pub fn world(mut self, world: GameWorld) -> Self {
        self.world = world;
        self
    }

    pub fn build(self) -> Session {
        let connection = Connection::new(self.transport, self.lobby, self.clock, self.config.connection());
        Session {
            connection,
            world: self.world,
            sync: ObjectSyncManager::new(self.config.periodic_sync_ticks),
            hooks: EventHookRegistry::new(),
            triggers: TriggerQueue::new(),
            fsm_sink: None,
            events: EventCollector::new(),
            config: self.config,
            last_player_sync_ms: 0,
            last_world_update_ms: 0,
            last_world_request_ms: 0,
            world_synced: false,
        }
    }
}

/// Multiplayer session of the local peer
pub struct Session {
    connection: Connection,
    world: GameWorld,
    sync: ObjectSyncManager,
    hooks: EventHookRegistry,
    triggers: TriggerQueue,
    fsm_sink: Option<Box<dyn FsmEventSink>>,
    events: EventCollector,
    config: SessionConfig,
    last_player_sync_ms: u64,
    last_world_update_ms: u64,
    last_world_request_ms: u64,
    /// Joiner applied the host's snapshot
    world_synced: bool,
}

impl Session {
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_host(&self) -> bool {
        self.connection.is_host()
    }

    pub fn is_online(&self) -> bool {
        self.connection.is_online()
    }

    pub fn local_peer(&self) -> PeerId {
        self.connection.local_peer()
    }

    pub fn remote_peer(&self) -> Option<PeerId> {
        self.connection.connected_peer()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    pub fn objects(&self) -> &ObjectSyncManager {
        &self.sync
    }

    pub fn hooks(&self) -> &EventHookRegistry {
        &self.hooks
    }

    pub fn stats(&self) -> &NetStatistics {
        self.connection.stats()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Host always; joiner once the snapshot is applied
    pub fn world_synced(&self) -> bool {
        self.world_synced
    }

    pub fn set_fsm_sink(&mut self, sink: impl FsmEventSink + 'static) {
        self.fsm_sink = Some(Box::new(sink));
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    /// Check the engine reported every object the session depends on
    pub fn verify_world(&self, found: &[&str]) -> Result<()> {
        self.world.verify_loaded(found.iter().copied())
    }

    /// Game messages flow once the handshake is done and, for a joiner, the world is in
    fn is_playing(&self) -> bool {
        self.connection.state() == ConnectionState::Playing && self.connection.connected_peer().is_some()
    }

    // ---- lifecycle ----

    pub fn create_session(&mut self) -> Result<LobbyId> {
        match self.connection.create_lobby() {
            Ok(lobby) => {
                self.sync.attach(self.connection.local_peer(), true);
                self.world.local_player.peer = Some(self.connection.local_peer());
                self.world_synced = true;
                self.events.on_event(SessionEvent::LobbyCreated { lobby });
                Ok(lobby)
            }
            Err(error) => {
                self.events.on_event(SessionEvent::SessionAborted { error: error.to_string() });
                Err(error)
            }
        }
    }

    pub fn join_session(&mut self, invite: &str) -> Result<PeerId> {
        let host = self.connection.join_lobby(invite)?;
        self.sync.attach(self.connection.local_peer(), false);
        self.world.local_player.peer = Some(self.connection.local_peer());
        self.world_synced = false;
        Ok(host)
    }

    pub fn disconnect(&mut self) {
        if let Some(peer) = self.connection.disconnect() {
            self.release_peer(peer);
        }
        self.sync.detach();
        self.world_synced = false;
        self.collect_ownership_events();
        self.events.on_event(SessionEvent::Disconnected { reason: DisconnectReason::Local });
    }

    fn abort(&mut self, error: &Error) {
        if let Some(peer) = self.connection.disconnect() {
            self.release_peer(peer);
        }
        self.connection.reset();
        self.sync.detach();
        self.world_synced = false;
        self.collect_ownership_events();
        self.events.on_event(SessionEvent::SessionAborted { error: error.to_string() });
    }

    fn handle_error(&mut self, error: Error, context: &'static str) {
        match error.severity() {
            Severity::ProtocolFatal | Severity::AssertionFatal => {
                tracing::error!(%error, context, "fatal session error, returning to idle");
                self.abort(&error);
            }
            Severity::EntityMissing => tracing::warn!(%error, context, "entity not found, dropped"),
            Severity::DuplicateRegistration => {
                tracing::warn!(%error, context, "duplicate registration rejected")
            }
            Severity::Transport => tracing::warn!(%error, context, "transport error"),
        }
    }

    fn send(&mut self, message: Message) {
        if self.connection.connected_peer().is_none() {
            tracing::trace!(message = ?message.id(), "no peer connected, not sent");
            return;
        }
        if let Err(error) = self.connection.send(&message) {
            self.handle_error(error, "send");
        }
    }

    /// Send only when the session is in play
    fn broadcast(&mut self, message: Message) {
        if self.is_playing() {
            self.send(message);
        }
    }

    // ---- frame loop ----

    /// Per-frame update: network, triggers and timers
    pub fn update(&mut self) {
        self.connection.stats_mut().new_frame();

        let mut connection_events = self.connection.poll();
        connection_events.extend(self.connection.update());
        for event in connection_events {
            self.handle_connection_event(event);
        }

        self.process_triggers();

        let now = self.connection.now_ms();
        if self.is_playing() && now.saturating_sub(self.last_player_sync_ms) >= self.config.player_sync_interval_ms {
            self.last_player_sync_ms = now;
            let sync = self.player_sync();
            self.send(Message::PlayerSync(sync));
        }
        if self.is_host()
            && self.is_playing()
            && now.saturating_sub(self.last_world_update_ms) >= self.config.world_update_interval_ms
        {
            self.last_world_update_ms = now;
            let update = write_periodic_update(&self.world);
            self.send(Message::WorldPeriodicalUpdate(update));
        }
        if !self.is_host()
            && self.connection.state() == ConnectionState::LoadingGameWorld
            && self.connection.connected_peer().is_some()
            && now.saturating_sub(self.last_world_request_ms) >= self.config.world_request_interval_ms
        {
            // snapshot request or reply was lost
            self.last_world_request_ms = now;
            tracing::debug!("still loading, asking for the world state again");
            self.send(Message::AskForWorldState);
        }

        self.flush_sync();
    }

    /// Fixed-timestep update: object streaming and periodic syncs
    pub fn fixed_update(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.sync.fixed_update();
        self.flush_sync();
    }

    fn player_sync(&self) -> PlayerSync {
        let player = &self.world.local_player;
        PlayerSync {
            position: player.transform.position,
            rotation: player.transform.rotation,
            picked_up: player
                .picked_up
                .map(|t| PickedUpSync { position: t.position, rotation: t.rotation }),
        }
    }

    fn process_triggers(&mut self) {
        let pending: Vec<_> = self.triggers.drain().collect();
        for trigger in pending {
            let result = match trigger.kind {
                TriggerKind::Enter => self.sync.request_ownership(trigger.object_id),
                TriggerKind::Exit => self.sync.release_ownership(trigger.object_id),
            };
            if let Err(error) = result {
                self.handle_error(error, "trigger");
            }
        }
    }

    fn flush_sync(&mut self) {
        for message in self.sync.drain_outgoing() {
            self.send(message);
        }
        self.collect_ownership_events();
    }

    fn collect_ownership_events(&mut self) {
        for event in self.sync.drain_events() {
            self.events.on_event(SessionEvent::Ownership(event));
        }
    }

    /// Forget everything the peer held
    fn release_peer(&mut self, peer: PeerId) {
        self.world.remove_peer(peer);
        self.sync.peer_removed(peer);
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::PeerJoined(peer) => {
                self.world.spawn_remote_player(peer);
                self.last_world_update_ms = self.connection.now_ms();
                self.events.on_event(SessionEvent::PlayerJoined { peer });
            }
            ConnectionEvent::HandshakeCompleted { host } => {
                self.world.spawn_remote_player(host);
                self.last_world_request_ms = self.connection.now_ms();
                self.send(Message::AskForWorldState);
                self.events.on_event(SessionEvent::Connected { host });
            }
            ConnectionEvent::JoinAborted(reason) => {
                self.sync.detach();
                self.events.on_event(SessionEvent::JoinAborted { reason });
            }
            ConnectionEvent::PeerLeft { peer, reason } => {
                self.release_peer(peer);
                self.events.on_event(SessionEvent::PlayerLeft { peer, reason });
                if self.connection.state() == ConnectionState::Disconnected {
                    self.sync.detach();
                    self.world_synced = false;
                    self.events.on_event(SessionEvent::Disconnected { reason });
                }
                self.collect_ownership_events();
            }
            ConnectionEvent::Message { from, message } => {
                let id = message.id();
                if let Err(error) = self.handle_message(from, message) {
                    tracing::debug!(peer = %from, message = ?id, "handler failed");
                    self.handle_error(error, id.name());
                }
                self.collect_ownership_events();
            }
        }
    }

    fn handle_message(&mut self, from: PeerId, message: Message) -> Result<()> {
        match message {
            Message::Handshake(_) | Message::Heartbeat(_) | Message::HeartbeatResponse(_) | Message::Disconnect => {
                tracing::debug!(peer = %from, "connection message reached the session, ignored");
            }
            Message::PlayerSync(sync) => self.world.remote_player.apply_sync(&sync),
            Message::AnimSync(anim) => self.world.remote_player.anim = anim.into(),
            Message::VehicleSync(sync) => {
                let vehicle = self.world.vehicles.get_mut(sync.vehicle_id)?;
                if vehicle.driver != Some(from) {
                    tracing::debug!(vehicle_id = sync.vehicle_id, peer = %from, "vehicle sync from non-driver dropped");
                    return Ok(());
                }
                vehicle.transform = Transform::new(sync.position, sync.rotation);
                vehicle.inputs = VehicleInputs {
                    steering: sync.steering,
                    throttle: sync.throttle,
                    brake: sync.brake,
                    clutch: sync.clutch,
                    fuel: sync.fuel,
                    gear: sync.gear,
                    range: sync.range,
                    hydraulic: sync.hydraulic,
                };
            }
            Message::VehicleEnter(enter) => {
                match self.world.vehicles.enter(enter.vehicle_id, from, enter.passenger)? {
                    Some(seat) => self.events.on_event(SessionEvent::VehicleEntered {
                        peer: from,
                        vehicle_id: enter.vehicle_id,
                        seat,
                    }),
                    None => tracing::debug!(vehicle_id = enter.vehicle_id, peer = %from, "seat taken, enter ignored"),
                }
            }
            Message::VehicleLeave => {
                if let Some(vehicle_id) = self.world.vehicles.leave(from) {
                    self.events.on_event(SessionEvent::VehicleLeft { peer: from, vehicle_id });
                }
            }
            Message::VehicleState(state) => {
                let vehicle = self.world.vehicles.get_mut(state.vehicle_id)?;
                vehicle.engine_state = state.state;
                vehicle.dash_state = state.dash_state;
                if state.start_time.is_some() {
                    vehicle.start_time = state.start_time;
                }
            }
            Message::VehicleSwitch(switch) => {
                let vehicle = self.world.vehicles.get_mut(switch.vehicle_id)?;
                vehicle.switches.insert(
                    switch.switch_id,
                    SwitchValue { on: switch.switch_value, value: switch.switch_value_float },
                );
            }
            Message::OpenDoors(door) => {
                self.world.set_door_open(door.position, door.open)?;
                self.events.on_event(SessionEvent::DoorChanged { position: door.position, open: door.open });
            }
            Message::LightSwitch(light) => {
                self.world.set_light_switch(light.position, light.on)?;
                self.events.on_event(SessionEvent::LightSwitchChanged { position: light.position, on: light.on });
            }
            Message::FullWorldSync(snapshot) => self.handle_full_world_sync(&snapshot)?,
            Message::AskForWorldState => {
                if !self.is_host() {
                    tracing::warn!(peer = %from, "world state requested from a joiner, ignored");
                    return Ok(());
                }
                tracing::info!(peer = %from, "sending full world sync");
                let snapshot = write_full_world_sync(&self.world);
                self.send(Message::FullWorldSync(snapshot));
            }
            Message::WorldPeriodicalUpdate(update) => {
                if !self.is_host() {
                    apply_periodic_update(&mut self.world, &update);
                }
            }
            Message::WeatherSync(weather) => {
                if !self.is_host() {
                    self.world.weather = weather;
                    self.events.on_event(SessionEvent::WeatherChanged { weather });
                }
            }
            Message::PickupObject(pickup) => {
                if !self.world.pickupables.pick_up(pickup.id, from)? {
                    tracing::debug!(id = pickup.id, peer = %from, "object already held");
                }
            }
            Message::ReleaseObject(release) => self.world.pickupables.release(release.id, from)?,
            Message::PickupableSpawn(spawn) => {
                self.world.pickupables.spawn(&spawn)?;
                self.events.on_event(SessionEvent::PickupableSpawned { id: spawn.id });
            }
            Message::PickupableDestroy(destroy) => {
                self.world.pickupables.destroy(destroy.id)?;
                self.events.on_event(SessionEvent::PickupableDestroyed { id: destroy.id });
            }
            Message::PickupableActivate(activate) => {
                self.world.pickupables.set_active(activate.id, activate.activate)?
            }
            Message::PickupableSetPosition(set) => self.world.pickupables.set_position(set.id, set.position)?,
            Message::RemoveBottle(bottle) => {
                let remaining = self.world.pickupables.remove_bottle(bottle.id)?;
                tracing::trace!(id = bottle.id, remaining, "bottle removed");
            }
            Message::ObjectSync(sync) => self.sync.handle_object_sync(from, &sync)?,
            Message::ObjectSyncResponse(response) => self.sync.handle_response(from, &response)?,
            Message::ObjectSyncRequest(request) => self.sync.handle_request(from, &request)?,
            Message::EventHookSync(hook) => {
                let Some(sink) = self.fsm_sink.as_mut() else {
                    tracing::debug!(fsm_id = hook.fsm_id, "no fsm sink installed, event hook dropped");
                    return Ok(());
                };
                if let Some(reply) = self.hooks.handle(&hook, sink.as_mut())? {
                    self.send(Message::EventHookSync(reply));
                }
            }
        }
        Ok(())
    }

    fn handle_full_world_sync(&mut self, snapshot: &FullWorldSync) -> Result<()> {
        if self.is_host() {
            tracing::warn!("host received a world snapshot, ignored");
            return Ok(());
        }
        apply_full_world_sync(&mut self.world, snapshot);
        if self.connection.state() == ConnectionState::LoadingGameWorld {
            self.connection.mark_world_loaded()?;
        }
        self.sync.finish_loading();
        self.world_synced = true;
        self.events.on_event(SessionEvent::WorldSynced);
        Ok(())
    }

    // ---- local actions ----

    pub fn set_local_transform(&mut self, transform: Transform, picked_up: Option<Transform>) {
        self.world.local_player.transform = transform;
        self.world.local_player.picked_up = picked_up;
    }

    pub fn set_local_anim(&mut self, anim: AnimState) {
        self.world.local_player.anim = anim;
        self.broadcast(Message::AnimSync(AnimSync::from(anim)));
    }

    pub fn enter_vehicle(&mut self, vehicle_id: VehicleId, passenger: bool) -> Result<Option<Seat>> {
        let local = self.local_peer();
        let seat = self.world.vehicles.enter(vehicle_id, local, passenger)?;
        if seat.is_some() {
            self.broadcast(Message::VehicleEnter(VehicleEnter { vehicle_id, passenger }));
        }
        Ok(seat)
    }

    pub fn leave_vehicle(&mut self) -> Option<VehicleId> {
        let left = self.world.vehicles.leave(self.local_peer());
        if left.is_some() {
            self.broadcast(Message::VehicleLeave);
        }
        left
    }

    /// Stream the vehicle we are driving
    pub fn drive_vehicle(&mut self, vehicle_id: VehicleId, transform: Transform, inputs: VehicleInputs) -> Result<()> {
        let local = self.local_peer();
        let vehicle = self.world.vehicles.get_mut(vehicle_id)?;
        if vehicle.driver != Some(local) {
            return Err(Error::InvalidState { expected: "driver", actual: format!("{:?}", vehicle.driver) });
        }
        vehicle.transform = transform;
        vehicle.inputs = inputs;
        self.broadcast(Message::VehicleSync(VehicleSync {
            vehicle_id,
            position: transform.position,
            rotation: transform.rotation,
            steering: inputs.steering,
            throttle: inputs.throttle,
            brake: inputs.brake,
            clutch: inputs.clutch,
            fuel: inputs.fuel,
            gear: inputs.gear,
            range: inputs.range,
            hydraulic: inputs.hydraulic,
        }));
        Ok(())
    }

    pub fn set_vehicle_state(&mut self, vehicle_id: VehicleId, state: i32, dash_state: i32, start_time: Option<f32>) -> Result<()> {
        let vehicle = self.world.vehicles.get_mut(vehicle_id)?;
        vehicle.engine_state = state;
        vehicle.dash_state = dash_state;
        vehicle.start_time = start_time.or(vehicle.start_time);
        self.broadcast(Message::VehicleState(VehicleState { vehicle_id, state, dash_state, start_time }));
        Ok(())
    }

    pub fn set_vehicle_switch(&mut self, vehicle_id: VehicleId, switch_id: i32, on: bool, value: Option<f32>) -> Result<()> {
        let vehicle = self.world.vehicles.get_mut(vehicle_id)?;
        vehicle.switches.insert(switch_id, SwitchValue { on, value });
        self.broadcast(Message::VehicleSwitch(VehicleSwitch {
            vehicle_id,
            switch_id,
            switch_value: on,
            switch_value_float: value,
        }));
        Ok(())
    }

    pub fn pick_up(&mut self, id: PickupableId) -> Result<bool> {
        let picked = self.world.pickupables.pick_up(id, self.local_peer())?;
        if picked {
            self.broadcast(Message::PickupObject(PickupObject { id }));
        }
        Ok(picked)
    }

    pub fn release(&mut self, id: PickupableId, drop: bool) -> Result<()> {
        self.world.pickupables.release(id, self.local_peer())?;
        self.broadcast(Message::ReleaseObject(ReleaseObject { id, drop }));
        Ok(())
    }

    pub fn spawn_pickupable(
        &mut self,
        prefab_id: i32,
        transform: Transform,
        active: bool,
        data: Option<Vec<f32>>,
    ) -> Result<PickupableId> {
        let id = self.world.pickupables.allocate_id()?;
        let spawn = PickupableSpawn { id, prefab_id, transform, active, data };
        self.world.pickupables.spawn(&spawn)?;
        self.broadcast(Message::PickupableSpawn(spawn));
        Ok(id)
    }

    pub fn destroy_pickupable(&mut self, id: PickupableId) -> Result<()> {
        self.world.pickupables.destroy(id)?;
        self.broadcast(Message::PickupableDestroy(PickupableDestroy { id }));
        Ok(())
    }

    pub fn activate_pickupable(&mut self, id: PickupableId, activate: bool) -> Result<()> {
        self.world.pickupables.set_active(id, activate)?;
        self.broadcast(Message::PickupableActivate(PickupableActivate { id, activate }));
        Ok(())
    }

    pub fn set_pickupable_position(&mut self, id: PickupableId, position: Vec3) -> Result<()> {
        self.world.pickupables.set_position(id, position)?;
        self.broadcast(Message::PickupableSetPosition(PickupableSetPosition { id, position }));
        Ok(())
    }

    /// Drink from a beer case; returns the bottles left
    pub fn remove_bottle(&mut self, id: PickupableId) -> Result<u32> {
        let remaining = self.world.pickupables.remove_bottle(id)?;
        self.broadcast(Message::RemoveBottle(RemoveBottle { id }));
        Ok(remaining)
    }

    pub fn set_door(&mut self, position: Vec3, open: bool) -> Result<()> {
        self.world.set_door_open(position, open)?;
        self.broadcast(Message::OpenDoors(OpenDoors { position, open }));
        Ok(())
    }

    pub fn set_light_switch(&mut self, position: Vec3, on: bool) -> Result<()> {
        self.world.set_light_switch(position, on)?;
        self.broadcast(Message::LightSwitch(crate::protocol::message::LightSwitch { position, on }));
        Ok(())
    }

    /// Host changes the weather
    pub fn set_weather(&mut self, weather: Weather) {
        self.world.weather = weather;
        if self.is_host() {
            self.broadcast(Message::WeatherSync(weather));
        }
    }

    // ---- object sync ----

    pub fn register_object(&mut self, id: i32, kind: ObjectKind, source: impl EntityStateSource + 'static) -> Result<Option<i32>> {
        self.sync.register(id, kind, Box::new(source))
    }

    pub fn remove_object(&mut self, id: i32) -> Result<()> {
        self.sync.remove(id)
    }

    /// Local player entered an object's trigger volume
    pub fn trigger_enter(&mut self, object_id: i32) {
        self.triggers.push_enter(object_id);
    }

    pub fn trigger_exit(&mut self, object_id: i32) {
        self.triggers.push_exit(object_id);
    }

    pub fn take_ownership(&mut self, id: i32) -> Result<bool> {
        let taken = self.sync.take_ownership(id)?;
        self.flush_sync();
        Ok(taken)
    }

    pub fn set_constant_sync(&mut self, id: i32, constant: bool) -> Result<()> {
        self.sync.set_constant_sync(id, constant)
    }

    pub fn request_object_sync(&mut self, id: i32) -> Result<()> {
        self.sync.request_sync(id)?;
        self.flush_sync();
        Ok(())
    }

    // ---- event hooks ----

    /// Hook a behaviour-tree state; a joiner asks the host for the FSM's state
    pub fn register_event_hook(&mut self, fsm: &str, event: &str) -> HookRegistration {
        let registration = self.hooks.add_with_sync(fsm, event);
        if registration.new_fsm && !self.is_host() && self.connection.connected_peer().is_some() {
            match self.hooks.request_sync(registration.id) {
                Ok(request) => self.send(Message::EventHookSync(request)),
                Err(error) => self.handle_error(error, "event hook"),
            }
        }
        registration
    }

    /// The engine entered a hooked state
    pub fn fsm_state_entered(&mut self, hook_id: i32, last_transition: Option<&str>) -> Result<()> {
        if let Some(message) = self.hooks.on_state_entered(hook_id, last_transition)? {
            self.broadcast(Message::EventHookSync(message));
        }
        Ok(())
    }
}
