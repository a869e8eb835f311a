//! Event bus - per-module named events and their subscribers.
//!
//! # API
//!
//! - `on(event, handler)` - Subscribe; returns a cleanup that unsubscribes
//! - `fire(event, data)` - Call every subscriber of `event`, in subscription order
//!
//! Subscribing the same handler (same `Rc`) twice is a no-op; the second cleanup
//! does nothing. `fire` calls the subscribers present when it started, so handlers
//! may subscribe or unsubscribe while being called.
//!
//! ```ignore
//! let handler: EventHandler = Rc::new(|data| println!("saved {data}"));
//! let cleanup = module.on("saved", handler);
//! module.fire("saved", &json!({"id": 1}));
//! cleanup();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::trace;

use crate::primitives::Cleanup;

/// Subscriber of a named event.
pub type EventHandler = Rc<dyn Fn(&Value)>;

type HandlerMap = HashMap<String, Vec<EventHandler>>;

// =============================================================================
// EVENT BUS
// =============================================================================

#[derive(Default)]
pub struct EventBus {
    handlers: Rc<RefCell<HandlerMap>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `event`.
    pub fn on(&self, event: &str, handler: EventHandler) -> Cleanup {
        {
            let mut handlers = self.handlers.borrow_mut();
            let list = handlers.entry(event.to_string()).or_default();
            if list.iter().any(|it| Rc::ptr_eq(it, &handler)) {
                return Box::new(|| {});
            }
            list.push(handler.clone());
        }

        let registry: Weak<RefCell<HandlerMap>> = Rc::downgrade(&self.handlers);
        let event = event.to_string();
        Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                if let Some(list) = registry.borrow_mut().get_mut(&event) {
                    list.retain(|it| !Rc::ptr_eq(it, &handler));
                }
            }
        })
    }

    /// Call every subscriber of `event` with `data`.
    pub fn fire(&self, event: &str, data: &Value) {
        let snapshot: Vec<EventHandler> = match self.handlers.borrow().get(event) {
            Some(list) => list.clone(),
            None => return,
        };
        trace!(event, subscribers = snapshot.len(), "firing");
        for handler in snapshot {
            handler(data);
        }
    }

    /// Number of subscribers of `event`.
    pub fn count(&self, event: &str) -> usize {
        self.handlers.borrow().get(event).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_on_and_fire() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cleanup = bus.on("saved", Rc::new(move |data: &Value| sink.borrow_mut().push(data.clone())));

        bus.fire("saved", &json!(1));
        bus.fire("other", &json!(2));
        cleanup();
        bus.fire("saved", &json!(3));

        assert_eq!(*seen.borrow(), vec![json!(1)]);
    }

    #[test]
    fn test_same_handler_subscribes_once() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let handler: EventHandler = Rc::new(move |_: &Value| counter.set(counter.get() + 1));

        let first = bus.on("tick", handler.clone());
        let second = bus.on("tick", handler);
        assert_eq!(bus.count("tick"), 1);

        bus.fire("tick", &Value::Null);
        assert_eq!(count.get(), 1);

        // The duplicate's cleanup leaves the original in place.
        second();
        assert_eq!(bus.count("tick"), 1);
        first();
        assert_eq!(bus.count("tick"), 0);
    }

    #[test]
    fn test_fire_uses_snapshot() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));

        let late_calls = calls.clone();
        let late: EventHandler = Rc::new(move |_: &Value| late_calls.set(late_calls.get() + 10));

        let inner_bus = bus.clone();
        let first_calls = calls.clone();
        let _keep = bus.on(
            "go",
            Rc::new(move |_: &Value| {
                first_calls.set(first_calls.get() + 1);
                // Subscribed mid-fire: not called this round.
                let _ = inner_bus.on("go", late.clone());
            }),
        );

        bus.fire("go", &Value::Null);
        assert_eq!(calls.get(), 1);
        bus.fire("go", &Value::Null);
        assert_eq!(calls.get(), 12);
    }
}
