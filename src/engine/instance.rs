//! Instance - the capability set every built node exposes to the engine.
//!
//! Scenes, components, display objects and support objects are all stored as
//! [`ObjectHandle`]s. The engine only needs a handful of capabilities from
//! them, so every method has a default and implementors override what their
//! kind supports.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::{ObjectId, Value};

/// Shared handle on a built instance.
pub type ObjectHandle = Rc<RefCell<dyn Instance>>;

/// Repeat declaration of a node that expands its children N times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeat {
    pub count: usize,
    /// Name under which the owner exposes the current index. `None` repeats
    /// without exposing an index.
    pub name: Option<String>,
}

pub trait Instance {
    /// Plain post-construction field write (setter attributes, directive pushes).
    fn set_attr(&mut self, name: &str, value: Value) {
        tracing::trace!(attr = name, ?value, "attribute ignored by instance");
    }

    /// Plain field read.
    fn attr(&self, _name: &str) -> Value {
        Value::Undefined
    }

    /// Backend add-call: attach `child` to this container.
    ///
    /// Returns false when this instance cannot hold children.
    fn add_child(&mut self, _id: ObjectId, _child: &ObjectHandle) -> bool {
        false
    }

    /// Undo an add-call. Unknown ids are ignored.
    fn remove_child(&mut self, _id: ObjectId) {}

    /// World container of a scene.
    fn world(&self) -> Option<ObjectHandle> {
        None
    }

    /// Repeat declaration, read after setters are applied.
    fn repeat(&self) -> Option<Repeat> {
        None
    }

    /// Release backend resources. Called once, before the instance leaves the registry.
    fn destroy(&mut self) {}
}

/// Wrap a concrete instance into a handle.
pub fn handle<T: Instance + 'static>(instance: T) -> ObjectHandle {
    Rc::new(RefCell::new(instance))
}
