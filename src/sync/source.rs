use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::codec::{Transform, Vec3};

/// Live engine object behind a synchronized record
///
/// The engine owns the object; the sync engine reaches it through this
/// handle every time it needs state.
pub trait EntityStateSource {
    fn transform(&self) -> Transform;

    fn set_transform(&mut self, transform: Transform);

    fn velocity(&self) -> Vec3;

    /// Named float state (engine variables, inputs, flags)
    fn variable(&self, name: &str) -> Option<f32>;

    fn set_variable(&mut self, name: &str, value: f32);

    /// Notify the engine object of a named event
    fn send_event(&mut self, event: &str);
}

impl<T: EntityStateSource> EntityStateSource for Rc<RefCell<T>> {
    fn transform(&self) -> Transform {
        self.borrow().transform()
    }

    fn set_transform(&mut self, transform: Transform) {
        self.borrow_mut().set_transform(transform)
    }

    fn velocity(&self) -> Vec3 {
        self.borrow().velocity()
    }

    fn variable(&self, name: &str) -> Option<f32> {
        self.borrow().variable(name)
    }

    fn set_variable(&mut self, name: &str, value: f32) {
        self.borrow_mut().set_variable(name, value)
    }

    fn send_event(&mut self, event: &str) {
        self.borrow_mut().send_event(event)
    }
}

/// Plain in-memory object, used by the CLI peer and tests
#[derive(Debug, Clone, Default)]
pub struct SimpleEntity {
    pub transform: Transform,
    pub velocity: Vec3,
    pub variables: AHashMap<String, f32>,
    /// Events received, oldest first
    pub events: Vec<String>,
}

impl SimpleEntity {
    pub fn new(transform: Transform) -> Self {
        Self { transform, ..Self::default() }
    }

    /// Wrap in a shared handle so the caller keeps access after registration
    pub fn shared(transform: Transform) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(transform)))
    }
}

impl EntityStateSource for SimpleEntity {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn variable(&self, name: &str) -> Option<f32> {
        self.variables.get(name).copied()
    }

    fn set_variable(&mut self, name: &str, value: f32) {
        self.variables.insert(name.to_string(), value);
    }

    fn send_event(&mut self, event: &str) {
        self.events.push(event.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handle() {
        let entity = SimpleEntity::shared(Transform::default());
        let mut handle = entity.clone();
        handle.set_variable("throttle", 0.5);
        handle.send_event("activate");
        assert_eq!(entity.borrow().variable("throttle"), Some(0.5));
        assert_eq!(entity.borrow().events, vec!["activate".to_string()]);
    }
}
