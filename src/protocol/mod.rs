pub mod packet;
pub mod message;
pub mod transport;
pub mod lobby;
pub mod clock;
pub mod connection;

use std::fmt;

/// Identity of a peer on the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

pub use packet::{
    MessageId, PacketBuilder, PacketHeader, SendMode,
    MAX_PACKET_SIZE, PROTOCOL_ID, PROTOCOL_VERSION,
};
pub use message::{Message, SyncType};
pub use transport::{LinkHandle, LoopbackTransport, Transport, UdpTransport};
pub use lobby::{DirectLobby, Lobby, LobbyId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{
    Connection, ConnectionConfig, ConnectionEvent, ConnectionState,
    DisconnectReason, JoinAbortReason, Peer, PeerState, Role,
};
