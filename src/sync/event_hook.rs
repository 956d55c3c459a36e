//! Behaviour-tree state hooks mirrored between peers
//!
//! Every hooked (fsm, state) pair gets an id. Entering the state locally sends
//! the id to the remote peer, which fires `MP_<state>` on its copy of the FSM.
//! The `MP_` transition is how the receiving side recognises a state it
//! entered because of the network, so it is never echoed back.

use crate::error::{Error, Result};
use crate::protocol::message::EventHookSync;

pub const REMOTE_EVENT_PREFIX: &str = "MP_";

/// Event id used when the event travels by name
pub const NAMED_EVENT_ID: i32 = -1;

/// The engine's behaviour-tree runtime
pub trait FsmEventSink {
    fn fire_event(&mut self, fsm: &str, event: &str);

    fn active_state_name(&self, fsm: &str) -> Option<String>;
}

pub fn remote_event_name(event: &str) -> String {
    format!("{REMOTE_EVENT_PREFIX}{event}")
}

#[derive(Debug, Clone)]
struct Hook {
    fsm: String,
    event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRegistration {
    pub id: i32,
    /// First hook on this FSM; a joiner asks the host for its state
    pub new_fsm: bool,
}

#[derive(Debug, Default)]
pub struct EventHookRegistry {
    hooks: Vec<Hook>,
}

impl EventHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn hook(&self, id: i32) -> Result<&Hook> {
        usize::try_from(id)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.hooks.get(i))
            .ok_or_else(|| Error::unknown_entity("fsm", id))
    }

    /// Hook `event` on `fsm`. Ids are sequential from 1 in registration order,
    /// so both peers must hook the same states in the same order.
    pub fn add_with_sync(&mut self, fsm: impl Into<String>, event: impl Into<String>) -> HookRegistration {
        let fsm = fsm.into();
        let new_fsm = !self.hooks.iter().any(|h| h.fsm == fsm);
        let event = event.into();
        tracing::trace!(%fsm, %event, id = self.hooks.len() + 1, "hooked fsm event");
        self.hooks.push(Hook { fsm, event });
        HookRegistration { id: self.hooks.len() as i32, new_fsm }
    }

    /// Hook every state of `fsm`
    pub fn sync_all_events<I, S>(&mut self, fsm: &str, states: I) -> Vec<HookRegistration>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        states.into_iter().map(|state| self.add_with_sync(fsm, state)).collect()
    }

    /// The hooked state was entered locally. `last_transition` is the event that led there.
    pub fn on_state_entered(&self, id: i32, last_transition: Option<&str>) -> Result<Option<EventHookSync>> {
        let hook = self.hook(id)?;
        if last_transition.is_some_and(|t| t == remote_event_name(&hook.event)) {
            return Ok(None);
        }
        Ok(Some(EventHookSync { fsm_id: id, fsm_event_id: id, request: false, fsm_event_name: None }))
    }

    pub fn request_sync(&self, id: i32) -> Result<EventHookSync> {
        self.hook(id)?;
        Ok(EventHookSync { fsm_id: id, fsm_event_id: NAMED_EVENT_ID, request: true, fsm_event_name: None })
    }

    /// Apply a remote hook message. Returns the answer to a state request.
    pub fn handle(&self, message: &EventHookSync, sink: &mut dyn FsmEventSink) -> Result<Option<EventHookSync>> {
        let fsm = &self.hook(message.fsm_id)?.fsm;

        if message.request {
            let state = sink.active_state_name(fsm).filter(|s| !s.is_empty());
            let Some(state) = state else {
                tracing::debug!(fsm_id = message.fsm_id, "state requested but fsm has no active state");
                return Ok(None);
            };
            return Ok(Some(EventHookSync {
                fsm_id: message.fsm_id,
                fsm_event_id: NAMED_EVENT_ID,
                request: false,
                fsm_event_name: Some(state),
            }));
        }

        let event = if message.fsm_event_id == NAMED_EVENT_ID {
            message
                .fsm_event_name
                .as_deref()
                .ok_or_else(|| Error::InvalidPacket("event hook sync without event".into()))?
        } else {
            self.hook(message.fsm_event_id)?.event.as_str()
        };
        sink.fire_event(fsm, &remote_event_name(event));
        Ok(None)
    }
}
