use std::fmt;

use crate::error::{Error, Result};
use super::PeerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Matchmaking service creating and joining two-player lobbies
pub trait Lobby {
    fn create_lobby(&mut self) -> Result<LobbyId>;

    /// Join the lobby behind `invite`, returning the host peer
    fn join_lobby(&mut self, invite: &str) -> Result<PeerId>;

    fn leave_lobby(&mut self);
}

/// Lobby without a matchmaking server: the invite is the host peer id
#[derive(Debug, Default)]
pub struct DirectLobby {
    current: Option<LobbyId>,
    available: bool,
    next_lobby: u64,
}

impl DirectLobby {
    pub fn new() -> Self {
        Self { current: None, available: true, next_lobby: 1 }
    }

    /// A lobby service that refuses every request
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    pub fn current(&self) -> Option<LobbyId> {
        self.current
    }
}

impl Lobby for DirectLobby {
    fn create_lobby(&mut self) -> Result<LobbyId> {
        if !self.available {
            return Err(Error::LobbyCreateFailed { reason: "lobby service unavailable".into() });
        }
        let id = LobbyId(self.next_lobby);
        self.next_lobby += 1;
        self.current = Some(id);
        tracing::info!(lobby = %id, "lobby created");
        Ok(id)
    }

    fn join_lobby(&mut self, invite: &str) -> Result<PeerId> {
        if !self.available {
            return Err(Error::LobbyJoinFailed { reason: "lobby service unavailable".into() });
        }
        let host = invite.trim().parse::<u64>().map(PeerId).map_err(|_| Error::LobbyJoinFailed {
            reason: format!("malformed invite: {invite:?}"),
        })?;
        self.current = Some(LobbyId(host.0));
        tracing::info!(%host, "joined lobby");
        Ok(host)
    }

    fn leave_lobby(&mut self) {
        if let Some(id) = self.current.take() {
            tracing::info!(lobby = %id, "left lobby");
        }
    }
}
