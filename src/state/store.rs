//! Store - reducer-style state holder of a module.
//!
//! State is a JSON object held in a spark-signals `Signal`, so anything reading it
//! through [`Store::signal`] can react to changes. Named actions mutate a working
//! copy of the state; the copy is written back only when the action succeeds.
//!
//! Each store also answers to one reserved update action (its name is chosen by the
//! owning module) that merges a partial object into the state key by key.
//!
//! ```ignore
//! let options = StoreOptions::default()
//!     .model("count", json!(0))
//!     .action("add", |state, payload| {
//!         let by = payload.as_i64().unwrap_or(1);
//!         state["count"] = json!(state["count"].as_i64().unwrap_or(0) + by);
//!         Ok(())
//!     });
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use spark_signals::{signal, Signal};

use crate::error::{Result, WeaveError};
use crate::types::{empty_object, merge_object};

/// Reducer: mutate `state` according to `payload`.
pub type Action = Rc<dyn Fn(&mut Value, Value) -> Result<()>>;

/// Initial models and actions of a store.
#[derive(Clone)]
pub struct StoreOptions {
    pub models: Value,
    pub actions: HashMap<String, Action>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            models: empty_object(),
            actions: HashMap::new(),
        }
    }
}

impl StoreOptions {
    pub fn model(mut self, name: impl Into<String>, value: Value) -> Self {
        if let Value::Object(models) = &mut self.models {
            models.insert(name.into(), value);
        }
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Value, Value) -> Result<()> + 'static,
    {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct Store {
    state: Signal<Value>,
    actions: HashMap<String, Action>,
    update_action: String,
}

impl Store {
    pub fn new(options: StoreOptions, update_action: impl Into<String>) -> Self {
        let models = match options.models {
            Value::Object(_) => options.models,
            _ => empty_object(),
        };
        Self {
            state: signal(models),
            actions: options.actions,
            update_action: update_action.into(),
        }
    }

    /// Name of the reserved merge action.
    pub fn update_action(&self) -> &str {
        &self.update_action
    }

    pub fn has_action(&self, name: &str) -> bool {
        name == self.update_action || self.actions.contains_key(name)
    }

    /// Apply action `name` to the state.
    pub fn dispatch(&self, name: &str, payload: Value) -> Result<()> {
        let mut state = self.state.get();
        if name == self.update_action {
            merge_object(&mut state, payload);
        } else {
            let action = self
                .actions
                .get(name)
                .ok_or_else(|| WeaveError::UnknownAction(name.to_string()))?;
            action(&mut state, payload)?;
        }
        self.state.set(state);
        Ok(())
    }

    /// Owned copy of the whole state.
    pub fn get(&self) -> Value {
        self.state.get()
    }

    /// Owned copy of one model, `null` if absent.
    pub fn get_model(&self, name: &str) -> Value {
        self.state.get().get(name).cloned().unwrap_or(Value::Null)
    }

    /// The underlying signal.
    pub fn signal(&self) -> Signal<Value> {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> Store {
        let options = StoreOptions::default()
            .model("count", json!(0))
            .model("name", json!("c"))
            .action("add", |state, payload| {
                let by = payload.as_i64().unwrap_or(1);
                state["count"] = json!(state["count"].as_i64().unwrap_or(0) + by);
                Ok(())
            })
            .action("fail", |state, _| {
                state["count"] = json!(-1);
                Err(WeaveError::action("fail", "nope"))
            });
        Store::new(options, "__update")
    }

    #[test]
    fn test_dispatch_runs_action() {
        let store = counter();
        store.dispatch("add", json!(2)).unwrap();
        store.dispatch("add", Value::Null).unwrap();
        assert_eq!(store.get_model("count"), json!(3));
    }

    #[test]
    fn test_failed_action_leaves_state() {
        let store = counter();
        assert!(store.dispatch("fail", Value::Null).is_err());
        assert_eq!(store.get_model("count"), json!(0));
    }

    #[test]
    fn test_unknown_action() {
        let store = counter();
        assert_eq!(
            store.dispatch("nope", Value::Null),
            Err(WeaveError::UnknownAction("nope".into()))
        );
    }

    #[test]
    fn test_update_action_merges() {
        let store = counter();
        assert!(store.has_action("__update"));
        store.dispatch("__update", json!({"name": "d", "extra": true})).unwrap();
        assert_eq!(store.get(), json!({"count": 0, "name": "d", "extra": true}));
    }

    #[test]
    fn test_get_is_a_copy() {
        let store = counter();
        let mut copy = store.get();
        copy["count"] = json!(99);
        assert_eq!(store.get_model("count"), json!(0));
        assert_eq!(store.get_model("missing"), Value::Null);
    }
}
