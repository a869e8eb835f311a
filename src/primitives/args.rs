//! Argument descriptors for routed events and actions.
//!
//! A route names a method on the owning component and the arguments to call it
//! with. Each argument is described up front and resolved when the event fires.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::lookup;

/// How to produce one argument of a routed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgDescriptor {
    /// A literal value.
    Static(Value),
    /// A dotted path read from the route's context.
    Context(String),
    /// The event payload itself.
    Event,
    /// A dotted path read from the event payload.
    EventField(String),
}

impl ArgDescriptor {
    pub fn resolve(&self, context: &Value, event: &Value) -> Value {
        match self {
            ArgDescriptor::Static(value) => value.clone(),
            ArgDescriptor::Context(path) => lookup(context, path),
            ArgDescriptor::Event => event.clone(),
            ArgDescriptor::EventField(path) => lookup(event, path),
        }
    }
}

/// Resolve every descriptor in order.
pub fn resolve_arguments(context: &Value, descriptors: &[ArgDescriptor], event: &Value) -> Vec<Value> {
    descriptors
        .iter()
        .map(|descriptor| descriptor.resolve(context, event))
        .collect()
}

/// Target of a routed event or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgDescriptor>,
}

impl Route {
    pub fn new(method: impl Into<String>, args: Vec<ArgDescriptor>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_mixed_descriptors() {
        let context = json!({"user": {"id": 7}});
        let event = json!({"x": 3});
        let args = resolve_arguments(
            &context,
            &[
                ArgDescriptor::Static(json!("save")),
                ArgDescriptor::Context("user.id".into()),
                ArgDescriptor::Event,
                ArgDescriptor::EventField("x".into()),
                ArgDescriptor::EventField("y".into()),
            ],
            &event,
        );
        assert_eq!(args, vec![json!("save"), json!(7), json!({"x": 3}), json!(3), Value::Null]);
    }

    #[test]
    fn test_route_deserializes() {
        let route: Route = serde_json::from_value(json!({
            "method": "select",
            "args": [{"kind": "context", "value": "id"}, {"kind": "event"}]
        }))
        .unwrap();
        assert_eq!(
            route,
            Route::new("select", vec![ArgDescriptor::Context("id".into()), ArgDescriptor::Event])
        );
    }
}
