use crate::client::stats::NetStatistics;
use crate::error::{Error, Result};
use crate::protocol::clock::Clock;
use crate::protocol::lobby::{Lobby, LobbyId};
use crate::protocol::message::{Handshake, Heartbeat, HeartbeatResponse, Message};
use crate::protocol::packet::{PacketHeader, PROTOCOL_VERSION};
use crate::protocol::transport::Transport;
use crate::protocol::PeerId;
use crate::codec::BinaryReader;

pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 10_000;

/// Session state of the local peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    CreatingLobby,
    LoadingGameWorld,
    Playing,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Joiner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Lobby joined, handshake not yet answered
    Handshaking,
    Connected,
}

/// State for the remote peer
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    pub role: Role,
    pub state: PeerState,
    pub last_heartbeat_ms: u64,
    pub round_trip_ms: Option<u64>,
    /// Estimated remote clock minus local clock
    pub clock_offset_ms: i64,
}

impl Peer {
    fn new(id: PeerId, role: Role, state: PeerState, now: u64) -> Self {
        Self {
            id,
            role,
            state,
            last_heartbeat_ms: now,
            round_trip_ms: None,
            clock_offset_ms: 0,
        }
    }
}

/// Remote clock minus local clock, saturating at the `i64` range
fn clock_offset(remote: u64, local: u64) -> i64 {
    let offset = remote as i128 - local as i128;
    offset.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Why a join attempt was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAbortReason {
    HostNewer { host: i32, local: i32 },
    HostOlder { host: i32, local: i32 },
}

impl JoinAbortReason {
    pub fn from_versions(host: i32, local: i32) -> Option<Self> {
        match host.cmp(&local) {
            std::cmp::Ordering::Greater => Some(Self::HostNewer { host, local }),
            std::cmp::Ordering::Less => Some(Self::HostOlder { host, local }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::HostNewer { .. } => "host has newer version of the mod",
            Self::HostOlder { .. } => "host has older version of the mod",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer sent `Disconnect`
    Requested,
    /// No heartbeat within the timeout
    Timeout,
    /// The local user left
    Local,
}

/// Events produced while servicing the connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Host admitted a joiner
    PeerJoined(PeerId),
    /// Joiner received a compatible handshake from the host
    HandshakeCompleted { host: PeerId },
    JoinAborted(JoinAbortReason),
    PeerLeft { peer: PeerId, reason: DisconnectReason },
    /// A game message from the connected peer
    Message { from: PeerId, message: Message },
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub protocol_version: i32,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            heartbeat_timeout_ms: DEFAULT_HEARTBEAT_TIMEOUT_MS,
        }
    }
}

/// Two-peer connection: lobby lifecycle, handshake and heartbeat
pub struct Connection {
    transport: Box<dyn Transport>,
    lobby: Box<dyn Lobby>,
    clock: Box<dyn Clock>,
    config: ConnectionConfig,
    state: ConnectionState,
    role: Option<Role>,
    lobby_id: Option<LobbyId>,
    remote: Option<Peer>,
    last_heartbeat_sent_ms: u64,
    last_disconnect_reason: Option<DisconnectReason>,
    stats: NetStatistics,
}

impl Connection {
    pub fn new(
        transport: Box<dyn Transport>,
        lobby: Box<dyn Lobby>,
        clock: Box<dyn Clock>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            transport,
            lobby,
            clock,
            config,
            state: ConnectionState::Idle,
            role: None,
            lobby_id: None,
            remote: None,
            last_heartbeat_sent_ms: 0,
            last_disconnect_reason: None,
            stats: NetStatistics::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    /// Online means a lobby is held, whether or not a peer is connected
    pub fn is_online(&self) -> bool {
        matches!(self.state, ConnectionState::LoadingGameWorld | ConnectionState::Playing)
    }

    pub fn local_peer(&self) -> PeerId {
        self.transport.local_peer()
    }

    pub fn remote(&self) -> Option<&Peer> {
        self.remote.as_ref()
    }

    /// Remote peer once the handshake completed
    pub fn connected_peer(&self) -> Option<PeerId> {
        self.remote
            .as_ref()
            .filter(|p| p.state == PeerState::Connected)
            .map(|p| p.id)
    }

    pub fn lobby_id(&self) -> Option<LobbyId> {
        self.lobby_id
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn protocol_version(&self) -> i32 {
        self.config.protocol_version
    }

    pub fn last_disconnect_reason(&self) -> Option<DisconnectReason> {
        self.last_disconnect_reason
    }

    pub fn stats(&self) -> &NetStatistics {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut NetStatistics {
        &mut self.stats
    }

    fn expect_state(&self, expected: ConnectionState, name: &'static str) -> Result<()> {
        // A finished session may start over.
        let offline = expected == ConnectionState::Idle && self.state == ConnectionState::Disconnected;
        if self.state != expected && !offline {
            return Err(Error::InvalidState { expected: name, actual: format!("{:?}", self.state) });
        }
        Ok(())
    }

    /// Create a lobby and start hosting
    pub fn create_lobby(&mut self) -> Result<LobbyId> {
        self.expect_state(ConnectionState::Idle, "Idle")?;
        self.state = ConnectionState::CreatingLobby;
        match self.lobby.create_lobby() {
            Ok(id) => {
                self.role = Some(Role::Host);
                self.lobby_id = Some(id);
                self.state = ConnectionState::Playing;
                self.last_disconnect_reason = None;
                tracing::info!(lobby = %id, peer = %self.local_peer(), "hosting session");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create lobby");
                self.state = ConnectionState::Idle;
                Err(e)
            }
        }
    }

    /// Join the lobby behind `invite` and greet the host
    pub fn join_lobby(&mut self, invite: &str) -> Result<PeerId> {
        self.expect_state(ConnectionState::Idle, "Idle")?;
        let host = match self.lobby.join_lobby(invite) {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(error = %e, "failed to join lobby");
                return Err(e);
            }
        };

        let now = self.now_ms();
        self.role = Some(Role::Joiner);
        self.remote = Some(Peer::new(host, Role::Host, PeerState::Handshaking, now));
        self.state = ConnectionState::LoadingGameWorld;
        self.last_disconnect_reason = None;
        self.last_heartbeat_sent_ms = now;

        let handshake = self.handshake(now);
        if let Err(e) = self.send_to(host, &handshake) {
            self.reset();
            return Err(e);
        }
        tracing::info!(%host, "joined lobby, handshake sent");
        Ok(host)
    }

    fn handshake(&self, now: u64) -> Message {
        Message::Handshake(Handshake {
            protocol_version: self.config.protocol_version,
            clock: now,
        })
    }

    /// Joiner finished applying the world snapshot
    pub fn mark_world_loaded(&mut self) -> Result<()> {
        self.expect_state(ConnectionState::LoadingGameWorld, "LoadingGameWorld")?;
        self.state = ConnectionState::Playing;
        Ok(())
    }

    /// Send a message to the remote peer
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let peer = self.remote.as_ref().map(|p| p.id).ok_or(Error::NotConnected)?;
        self.send_to(peer, message)
    }

    fn send_to(&mut self, peer: PeerId, message: &Message) -> Result<()> {
        let packet = message.encode();
        self.transport
            .send(peer, &packet, message.send_mode())
            .map_err(|e| Error::WriteFailed { message: message.id().name(), reason: e.to_string() })?;
        self.stats.record_sent(message.id(), packet.len());
        tracing::trace!(peer = %peer, message = ?message.id(), bytes = packet.len(), "sent");
        Ok(())
    }

    /// Leave the session, notifying the remote peer
    pub fn disconnect(&mut self) -> Option<PeerId> {
        let departed = self.remote.as_ref().map(|p| p.id);
        if departed.is_some() {
            if let Err(e) = self.send(&Message::Disconnect) {
                tracing::warn!(error = %e, "failed to notify peer of disconnect");
            }
        }
        self.lobby.leave_lobby();
        self.mark_disconnected(DisconnectReason::Local);
        departed
    }

    /// Abandon the session without notifying anyone and return to `Idle`
    pub fn reset(&mut self) {
        self.lobby.leave_lobby();
        self.state = ConnectionState::Idle;
        self.role = None;
        self.lobby_id = None;
        self.remote = None;
    }

    fn mark_disconnected(&mut self, reason: DisconnectReason) {
        if self.state != ConnectionState::Disconnected {
            tracing::info!(?reason, "disconnected");
        }
        self.state = ConnectionState::Disconnected;
        self.last_disconnect_reason = Some(reason);
        self.role = None;
        self.lobby_id = None;
        self.remote = None;
    }

    /// The remote peer is gone
    fn handle_peer_departure(&mut self, reason: DisconnectReason) -> Option<ConnectionEvent> {
        let peer = self.remote.take()?;
        tracing::info!(peer = %peer.id, ?reason, "peer left");
        match self.role {
            Some(Role::Joiner) => {
                self.lobby.leave_lobby();
                self.mark_disconnected(reason);
            }
            // Host keeps the lobby open for the next joiner.
            _ => self.last_disconnect_reason = Some(reason),
        }
        Some(ConnectionEvent::PeerLeft { peer: peer.id, reason })
    }

    /// Drain the transport and handle connection-level messages
    pub fn poll(&mut self) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        loop {
            let (from, data) = match self.transport.recv() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "transport receive failed");
                    break;
                }
            };

            let (header, payload_start) = match PacketHeader::parse(&data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(peer = %from, error = %e, "dropping packet");
                    self.stats.record_dropped();
                    continue;
                }
            };
            self.stats.record_received(header.message_id, data.len());

            let mut reader = BinaryReader::new(&data[payload_start..]);
            let message = match Message::decode(header.message_id, &mut reader) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(peer = %from, message = ?header.message_id, error = %e, "failed to decode message");
                    self.stats.record_dropped();
                    continue;
                }
            };
            tracing::trace!(peer = %from, message = ?header.message_id, "received");

            self.handle_message(from, message, &mut events);
        }
        events
    }

    fn handle_message(&mut self, from: PeerId, message: Message, events: &mut Vec<ConnectionEvent>) {
        if let Message::Handshake(handshake) = message {
            match self.role {
                Some(Role::Host) => self.handle_host_handshake(from, handshake, events),
                Some(Role::Joiner) => self.handle_joiner_handshake(from, handshake, events),
                None => tracing::debug!(peer = %from, "handshake while offline, ignored"),
            }
            return;
        }

        let connected = self.connected_peer() == Some(from);
        if !connected {
            tracing::warn!(peer = %from, message = ?message.id(), "message from unknown peer, ignored");
            return;
        }

        match message {
            Message::Heartbeat(heartbeat) => {
                self.touch_remote();
                let response = Message::HeartbeatResponse(HeartbeatResponse {
                    client_clock: heartbeat.client_clock,
                    clock: self.now_ms(),
                });
                if let Err(e) = self.send_to(from, &response) {
                    tracing::warn!(error = %e, "failed to answer heartbeat");
                }
            }
            Message::HeartbeatResponse(response) => {
                let now = self.now_ms();
                if let Some(peer) = self.remote.as_mut() {
                    let rtt = now.saturating_sub(response.client_clock);
                    peer.round_trip_ms = Some(rtt);
                    peer.clock_offset_ms =
                        clock_offset(response.clock, response.client_clock.saturating_add(rtt / 2));
                    peer.last_heartbeat_ms = now;
                    tracing::trace!(peer = %from, rtt_ms = rtt, "heartbeat response");
                }
            }
            Message::Disconnect => {
                events.extend(self.handle_peer_departure(DisconnectReason::Requested));
            }
            message => events.push(ConnectionEvent::Message { from, message }),
        }
    }

    fn handle_host_handshake(&mut self, from: PeerId, handshake: Handshake, events: &mut Vec<ConnectionEvent>) {
        if let Some(remote) = &self.remote {
            if remote.id != from {
                tracing::warn!(peer = %from, "received handshake but a player is already here, ignored");
                return;
            }
        }

        let reply = self.handshake(self.now_ms());

        if handshake.protocol_version != self.config.protocol_version {
            tracing::warn!(
                peer = %from,
                remote_version = handshake.protocol_version,
                local_version = self.config.protocol_version,
                "protocol version mismatch, joiner not admitted"
            );
            // The joiner aborts on its side once it sees our version.
            if let Err(e) = self.transport.send(from, &reply.encode(), reply.send_mode()) {
                tracing::warn!(error = %e, "failed to answer handshake");
            }
            return;
        }

        let now = self.now_ms();
        let is_new = self.remote.is_none();
        let mut peer = Peer::new(from, Role::Joiner, PeerState::Connected, now);
        peer.clock_offset_ms = clock_offset(handshake.clock, now);
        self.remote = Some(peer);
        self.last_heartbeat_sent_ms = now;

        if let Err(e) = self.send_to(from, &reply) {
            tracing::warn!(error = %e, "failed to answer handshake");
        }
        if is_new {
            tracing::info!(peer = %from, "player joined");
            events.push(ConnectionEvent::PeerJoined(from));
        }
    }

    fn handle_joiner_handshake(&mut self, from: PeerId, handshake: Handshake, events: &mut Vec<ConnectionEvent>) {
        let Some(remote) = self.remote.as_mut() else {
            tracing::warn!(peer = %from, "received handshake from host but host is not here");
            return;
        };
        if remote.id != from || remote.state != PeerState::Handshaking {
            tracing::debug!(peer = %from, "unexpected handshake, ignored");
            return;
        }

        let local = self.config.protocol_version;
        if let Some(reason) = JoinAbortReason::from_versions(handshake.protocol_version, local) {
            tracing::error!(host_version = handshake.protocol_version, local_version = local, "{}", reason.description());
            self.reset();
            events.push(ConnectionEvent::JoinAborted(reason));
            return;
        }

        let now = self.clock.now_ms();
        remote.state = PeerState::Connected;
        remote.last_heartbeat_ms = now;
        remote.clock_offset_ms = clock_offset(handshake.clock, now);
        self.last_heartbeat_sent_ms = now;
        tracing::info!(host = %from, "connection established");
        events.push(ConnectionEvent::HandshakeCompleted { host: from });
    }

    fn touch_remote(&mut self) {
        let now = self.now_ms();
        if let Some(peer) = self.remote.as_mut() {
            peer.last_heartbeat_ms = now;
        }
    }

    /// Send heartbeats, repeat an unanswered handshake and detect a dead peer; call once per frame
    pub fn update(&mut self) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        let Some(remote) = self.remote.as_ref() else {
            return events;
        };
        let (remote_id, remote_state) = (remote.id, remote.state);

        let now = self.now_ms();
        if now.saturating_sub(self.last_heartbeat_sent_ms) >= self.config.heartbeat_interval_ms {
            match remote_state {
                PeerState::Connected => {
                    self.last_heartbeat_sent_ms = now;
                    if let Err(e) = self.send(&Message::Heartbeat(Heartbeat { client_clock: now })) {
                        tracing::warn!(error = %e, "failed to send heartbeat");
                    }
                }
                PeerState::Handshaking if self.role == Some(Role::Joiner) => {
                    self.last_heartbeat_sent_ms = now;
                    tracing::debug!(host = %remote_id, "no handshake reply yet, sending again");
                    let handshake = self.handshake(now);
                    if let Err(e) = self.send_to(remote_id, &handshake) {
                        tracing::warn!(error = %e, "failed to resend handshake");
                    }
                }
                PeerState::Handshaking => {}
            }
        }

        events.extend(self.check_heartbeat_timeout());
        events
    }

    fn check_heartbeat_timeout(&mut self) -> Option<ConnectionEvent> {
        let peer = self.remote.as_ref()?;
        let elapsed = self.now_ms().saturating_sub(peer.last_heartbeat_ms);
        if elapsed < self.config.heartbeat_timeout_ms {
            return None;
        }
        let error = Error::HeartbeatTimeout { peer: peer.id, elapsed_ms: elapsed };
        tracing::warn!(%error, "peer timed out");
        self.handle_peer_departure(DisconnectReason::Timeout)
    }
}
