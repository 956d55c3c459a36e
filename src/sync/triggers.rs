use std::collections::VecDeque;

/// Which side of a trigger volume the local player crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub object_id: i32,
    pub kind: TriggerKind,
}

/// Trigger notifications raised by the engine, drained once per frame
#[derive(Debug, Default)]
pub struct TriggerQueue {
    queue: VecDeque<TriggerEvent>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_enter(&mut self, object_id: i32) {
        self.queue.push_back(TriggerEvent { object_id, kind: TriggerKind::Enter });
    }

    pub fn push_exit(&mut self, object_id: i32) {
        self.queue.push_back(TriggerEvent { object_id, kind: TriggerKind::Exit });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Everything queued so far, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = TriggerEvent> + '_ {
        self.queue.drain(..)
    }
}
