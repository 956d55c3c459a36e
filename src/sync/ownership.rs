//! Two-peer ownership arbitration for a single synchronized object

use crate::protocol::{PeerId, SyncType};

/// Who may stream an object's state, and whether we are streaming it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnershipState {
    pub owner: Option<PeerId>,
    /// Local peer is streaming this object
    pub sync_enabled: bool,
    /// `SetOwner` sent, waiting for the response
    pub pending_claim: bool,
}

/// Outcome of an ownership message from a remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Remote claim accepted; `yielded` when our own pending claim was dropped
    Claimed { yielded: bool },
    ClaimRejected { owner: Option<PeerId> },
    Forced { previous: Option<PeerId> },
    Released,
    ReleaseIgnored { owner: Option<PeerId> },
    /// State streaming, ownership untouched
    Unchanged,
}

impl Transition {
    /// Whether a forced transition must be reported as taken by force
    pub fn taken_by_force(&self, sender: PeerId) -> bool {
        matches!(self, Transition::Forced { previous: Some(prev) } if *prev != sender)
    }
}

impl OwnershipState {
    pub fn is_owned_by(&self, peer: PeerId) -> bool {
        self.owner == Some(peer)
    }

    pub fn is_unowned(&self) -> bool {
        self.owner.is_none()
    }

    /// Arbitrate an ownership-carrying `ObjectSync` from `sender`
    pub fn apply_remote(
        &mut self,
        sync_type: SyncType,
        sender: PeerId,
        local: PeerId,
        local_is_host: bool,
    ) -> Transition {
        match sync_type {
            SyncType::SetOwner => {
                if self.owner.is_some() {
                    return Transition::ClaimRejected { owner: self.owner };
                }
                if self.pending_claim && local_is_host {
                    // the host's claim wins a simultaneous request
                    return Transition::ClaimRejected { owner: None };
                }
                let yielded = std::mem::take(&mut self.pending_claim);
                self.owner = Some(sender);
                self.sync_enabled = false;
                Transition::Claimed { yielded }
            }
            SyncType::ForceSetOwner => {
                let previous = self.owner.replace(sender);
                if previous == Some(local) {
                    self.sync_enabled = false;
                }
                self.pending_claim = false;
                Transition::Forced { previous }
            }
            SyncType::RemoveOwner => {
                if self.owner != Some(sender) {
                    return Transition::ReleaseIgnored { owner: self.owner };
                }
                self.owner = None;
                // a claim made while it was owned was silently rejected
                self.pending_claim = false;
                Transition::Released
            }
            SyncType::GenericSync | SyncType::PeriodicSync => Transition::Unchanged,
        }
    }

    /// May a state-carrying message from `sender` touch transform and variables?
    pub fn accepts_state_from(&self, sync_type: SyncType, sender: PeerId, sender_is_host: bool) -> bool {
        match self.owner {
            Some(owner) => owner == sender,
            None => sync_type == SyncType::PeriodicSync && sender_is_host,
        }
    }

    /// Start claiming an unowned object. Returns true when `SetOwner` should be sent.
    pub fn request(&mut self) -> bool {
        if self.owner.is_some() || self.pending_claim {
            return false;
        }
        self.pending_claim = true;
        true
    }

    /// Give up local ownership. Returns true when `RemoveOwner` should be sent.
    pub fn release(&mut self, local: PeerId) -> bool {
        self.pending_claim = false;
        if self.owner != Some(local) {
            return false;
        }
        self.owner = None;
        self.sync_enabled = false;
        true
    }

    /// Force local ownership. Returns the previous owner when `ForceSetOwner` should be sent.
    pub fn take(&mut self, local: PeerId) -> Option<Option<PeerId>> {
        if self.owner == Some(local) {
            return None;
        }
        let previous = self.owner.replace(local);
        self.sync_enabled = true;
        self.pending_claim = false;
        Some(previous)
    }

    /// Settle a pending claim. Returns true when we became the owner.
    pub fn accept_response(&mut self, local: PeerId, accepted: bool) -> bool {
        if !std::mem::take(&mut self.pending_claim) {
            return false;
        }
        if accepted && self.owner.is_none() {
            self.owner = Some(local);
            self.sync_enabled = true;
            return true;
        }
        false
    }

    /// Revert to unowned if `peer` held the object
    pub fn peer_removed(&mut self, peer: PeerId) -> bool {
        if self.owner != Some(peer) {
            return false;
        }
        self.owner = None;
        true
    }
}
