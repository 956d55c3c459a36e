use crate::protocol::PeerId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lobby creation failed: {reason}")]
    LobbyCreateFailed { reason: String },

    #[error("lobby join failed: {reason}")]
    LobbyJoinFailed { reason: String },

    #[error("heartbeat timeout for peer {peer} ({elapsed_ms}ms)")]
    HeartbeatTimeout { peer: PeerId, elapsed_ms: u64 },

    #[error("protocol version mismatch: host {host}, local {local}")]
    VersionMismatch { host: i32, local: i32 },

    #[error("foreign packet: protocol id {found:#010x}")]
    ForeignProtocol { found: u32 },

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("failed to write message {message}: {reason}")]
    WriteFailed { message: &'static str, reason: String },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("string too long: {len} bytes (max {max})")]
    StringTooLong { len: usize, max: usize },

    #[error("array length {len} out of range (max {max})")]
    ArrayTooLong { len: i64, max: usize },

    #[error("unknown {category} id {id}")]
    UnknownEntity { category: &'static str, id: i64 },

    #[error("{category} id {id} already registered")]
    DuplicateEntity { category: &'static str, id: i64 },

    #[error("{category} id {id} {reason}")]
    EntityState { category: &'static str, id: i64, reason: &'static str },

    #[error("{category} pool exhausted")]
    PoolExhausted { category: &'static str },

    #[error("missing mandatory world object: {name}")]
    MissingWorldObject { name: String },

    #[error("peer {0} is not connected")]
    UnknownPeer(PeerId),

    #[error("not connected")]
    NotConnected,

    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidState { expected: &'static str, actual: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

/// How far an error is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Ends the session and returns the user to `Idle`.
    ProtocolFatal,
    /// Logged and dropped, the session continues.
    EntityMissing,
    /// Logged, the second registration is rejected.
    DuplicateRegistration,
    /// Logged; only the heartbeat timeout can end the session.
    Transport,
    /// The process cannot continue.
    AssertionFatal,
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::VersionMismatch { .. }
            | Error::WriteFailed { .. }
            | Error::LobbyCreateFailed { .. }
            | Error::LobbyJoinFailed { .. }
            | Error::InvalidState { .. } => Severity::ProtocolFatal,
            Error::UnknownEntity { .. } | Error::EntityState { .. } | Error::UnknownPeer(_) => {
                Severity::EntityMissing
            }
            Error::DuplicateEntity { .. } | Error::PoolExhausted { .. } => {
                Severity::DuplicateRegistration
            }
            Error::MissingWorldObject { .. } => Severity::AssertionFatal,
            Error::HeartbeatTimeout { .. }
            | Error::ForeignProtocol { .. }
            | Error::InvalidPacket(_)
            | Error::InvalidMessageType(_)
            | Error::UnexpectedEof
            | Error::StringTooLong { .. }
            | Error::ArrayTooLong { .. }
            | Error::NotConnected
            | Error::Config(_)
            | Error::Io(_) => Severity::Transport,
        }
    }

    pub fn unknown_entity(category: &'static str, id: impl Into<i64>) -> Self {
        Error::UnknownEntity { category, id: id.into() }
    }

    pub fn duplicate_entity(category: &'static str, id: impl Into<i64>) -> Self {
        Error::DuplicateEntity { category, id: id.into() }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminates the process after an integrity failure the mod cannot recover from.
pub fn fatal(error: &Error) -> ! {
    tracing::error!(%error, "unrecoverable environment integrity failure, terminating");
    std::process::exit(1)
}
