//! Core types for spark-scene.
//!
//! - [`ObjectId`] - process-unique identifier of every built instance
//! - [`ObjectKind`] - runtime kind tag used to dispatch destruction
//! - [`Value`] - dynamic attribute value flowing through templates and view-models
//! - [`Method`] - callable attribute value with a bound receiver

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::app::Application;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a built instance.
///
/// Allocated from a monotonically increasing counter and never reused within
/// a process, so a callback that closed over an id can never resolve to a
/// different instance after the original was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a registered instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Scene,
    Component,
    Display,
    Support,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Scene => "scene",
            ObjectKind::Component => "component",
            ObjectKind::Display => "display object",
            ObjectKind::Support => "support object",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Method - callable attribute values
// =============================================================================

/// Body of a [`Method`]: receives the application, the bound receiver and
/// call arguments.
pub type MethodBody = Rc<dyn Fn(&Application, Option<ObjectId>, &[Value]) -> Value>;

/// A function-valued attribute.
///
/// Templates may hand functions (event handlers, formatters) to instances.
/// Before such a value reaches an instance it is bound to the owner that
/// evaluated it, so a later call sees the owner as its receiver.
#[derive(Clone)]
pub struct Method {
    receiver: Option<ObjectId>,
    body: MethodBody,
}

impl Method {
    pub fn new(body: impl Fn(&Application, Option<ObjectId>, &[Value]) -> Value + 'static) -> Self {
        Self {
            receiver: None,
            body: Rc::new(body),
        }
    }

    /// Return a copy bound to `receiver`.
    pub fn bound_to(&self, receiver: ObjectId) -> Self {
        Self {
            receiver: Some(receiver),
            body: Rc::clone(&self.body),
        }
    }

    pub fn receiver(&self) -> Option<ObjectId> {
        self.receiver
    }

    pub fn call(&self, app: &Application, args: &[Value]) -> Value {
        (self.body)(app, self.receiver, args)
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.receiver == other.receiver && Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Value
// =============================================================================

/// Dynamic value of an attribute or reactive property.
///
/// Equality is deep: lists and maps compare structurally, methods compare by
/// body identity and receiver. The view-model relies on this to skip
/// propagation of no-op writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Expression produced nothing (unknown name, missing store path).
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Reference to another built instance.
    Object(ObjectId),
    Func(Method),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Value::Func(m) => Some(m),
            _ => None,
        }
    }

    /// Loose truthiness, used by guard helpers.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Object(_) | Value::Func(_) => true,
        }
    }

    /// Follow a dotted path (`"player.stats.hp"`) through nested maps.
    ///
    /// List segments are addressed by decimal index. Any missing segment
    /// yields `Undefined`.
    pub fn at_path(&self, path: &str) -> Value {
        let mut cursor = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            cursor = match cursor {
                Value::Map(map) => match map.get(segment) {
                    Some(v) => v,
                    None => return Value::Undefined,
                },
                Value::List(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(v) => v,
                    None => return Value::Undefined,
                },
                _ => return Value::Undefined,
            };
        }
        cursor.clone()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::Object(v)
    }
}

impl From<Method> for Value {
    fn from(v: Method) -> Self {
        Value::Func(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Normalize a template attribute name: `anchor-x` becomes `anchor_x`.
pub fn normalize_attr_name(name: &str) -> String {
    name.replace('-', "_")
}
