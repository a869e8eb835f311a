//! Core types for spark-weave.
//!
//! These types define the foundation that everything builds on.
//! Component state and render contexts are plain [`serde_json::Value`] objects,
//! read through dotted key paths.

use serde_json::{Map, Value};

// =============================================================================
// Component Status
// =============================================================================

/// Lifecycle status of a component (Module or View).
///
/// Linear: `Created → Rendering → Rendered → Destroying → Destroyed`.
/// A destroyed component may be rendered again; a rendered one may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentStatus {
    #[default]
    Created,
    Rendering,
    Rendered,
    Destroying,
    Destroyed,
}

impl ComponentStatus {
    /// Whether a render request should start a new render pass.
    pub fn can_render(self) -> bool {
        matches!(self, Self::Created | Self::Destroyed)
    }

    /// Whether the component currently has a live template.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Rendered)
    }
}

// =============================================================================
// Node Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-node lifecycle flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// `init` has run (ids claimed, surface attached).
        const INITIALIZED = 1 << 0;
        /// The node is rendered; its element (if any) is attached.
        const RENDERED = 1 << 1;
        /// A region is showing its declared children.
        const SHOW_DECLARED = 1 << 2;
    }
}

// =============================================================================
// Context Lookups
// =============================================================================

/// An empty JSON object.
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Resolve a dotted key path (`user.name`, `items.0`) against a context.
///
/// Missing keys resolve to `Value::Null`.
pub fn lookup(context: &Value, path: &str) -> Value {
    if path.is_empty() {
        return context.clone();
    }
    let mut current = context;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Template truthiness: null, false, 0, "" and empty arrays are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Render a value as text content.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shallow merge: every top-level key of `patch` replaces the key in `target`.
///
/// A non-object target is replaced by an empty object first.
pub fn merge_object(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else { return };
    if !target.is_object() {
        *target = empty_object();
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            map.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_paths() {
        let ctx = json!({"user": {"name": "ada", "tags": ["a", "b"]}, "count": 3});
        assert_eq!(lookup(&ctx, "count"), json!(3));
        assert_eq!(lookup(&ctx, "user.name"), json!("ada"));
        assert_eq!(lookup(&ctx, "user.tags.1"), json!("b"));
        assert_eq!(lookup(&ctx, "user.missing"), Value::Null);
        assert_eq!(lookup(&ctx, ""), ctx);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_merge_object() {
        let mut target = json!({"a": 1, "b": {"x": 1}});
        merge_object(&mut target, json!({"b": {"y": 2}, "c": 3}));
        assert_eq!(target, json!({"a": 1, "b": {"y": 2}, "c": 3}));

        let mut scalar = json!(5);
        merge_object(&mut scalar, json!({"a": 1}));
        assert_eq!(scalar, json!({"a": 1}));
    }

    #[test]
    fn test_status_transitions() {
        assert!(ComponentStatus::Created.can_render());
        assert!(ComponentStatus::Destroyed.can_render());
        assert!(!ComponentStatus::Rendered.can_render());
        assert!(ComponentStatus::Rendered.is_live());
    }
}
