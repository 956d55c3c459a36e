use crate::codec::Transform;
use crate::protocol::PeerId;
use crate::protocol::message::{AnimSync, PlayerSync};

/// Animation state mirrored from `AnimSync`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimState {
    pub is_leaning: bool,
    pub is_grounded: bool,
    pub active_hand_state: u8,
    pub aim_rotation: f32,
    pub is_drunk: bool,
}

impl From<AnimSync> for AnimState {
    fn from(m: AnimSync) -> Self {
        Self {
            is_leaning: m.is_leaning,
            is_grounded: m.is_grounded,
            active_hand_state: m.active_hand_state,
            aim_rotation: m.aim_rotation,
            is_drunk: m.is_drunk,
        }
    }
}

impl From<AnimState> for AnimSync {
    fn from(s: AnimState) -> Self {
        Self {
            is_leaning: s.is_leaning,
            is_grounded: s.is_grounded,
            active_hand_state: s.active_hand_state,
            aim_rotation: s.aim_rotation,
            is_drunk: s.is_drunk,
        }
    }
}

/// Avatar of a player
#[derive(Debug, Clone, Default)]
pub struct Player {
    pub peer: Option<PeerId>,
    pub transform: Transform,
    /// Transform of the carried object, if any
    pub picked_up: Option<Transform>,
    pub anim: AnimState,
    /// Updates received since spawn
    pub sync_count: u64,
}

impl Player {
    pub fn spawned(peer: PeerId) -> Self {
        Self { peer: Some(peer), ..Self::default() }
    }

    pub fn is_spawned(&self) -> bool {
        self.peer.is_some()
    }

    pub fn apply_sync(&mut self, sync: &PlayerSync) {
        self.transform = Transform::new(sync.position, sync.rotation);
        self.picked_up = sync.picked_up.map(|p| Transform::new(p.position, p.rotation));
        self.sync_count += 1;
    }
}
