//! Object Registry - identifier → live-instance lookup.
//!
//! Manages identity of built instances:
//! - Monotonic id allocation (ids are never recycled)
//! - Id → instance lookup through weak handles
//! - Runtime kind and blueprint name per id
//!
//! The registry owns nothing. Ownership lives in the [`ObjectTree`]
//! (components own their children) and in the scene bookkeeping of the
//! application. Directive callbacks close over ids and look their targets up
//! here at fire time, so a destroyed target is simply absent.
//!
//! [`ObjectTree`]: super::ObjectTree

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::instance::{Instance, ObjectHandle};
use crate::types::{ObjectId, ObjectKind};

struct Registered {
    kind: ObjectKind,
    blueprint: String,
    handle: Weak<RefCell<dyn Instance>>,
}

pub struct ObjectRegistry {
    objects: RefCell<HashMap<ObjectId, Registered>>,
    next_id: Cell<u64>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    // =========================================================================
    // Id Allocation
    // =========================================================================

    /// Allocate a fresh identifier.
    pub fn allocate(&self) -> ObjectId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ObjectId(id)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn register(&self, id: ObjectId, kind: ObjectKind, blueprint: &str, instance: &ObjectHandle) {
        let previous = self.objects.borrow_mut().insert(
            id,
            Registered {
                kind,
                blueprint: blueprint.to_string(),
                handle: Rc::downgrade(instance),
            },
        );
        if previous.is_some() {
            tracing::warn!(%id, blueprint, "id registered twice, previous entry replaced");
        }
    }

    pub fn unregister(&self, id: ObjectId) -> bool {
        self.objects.borrow_mut().remove(&id).is_some()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Live instance for `id`, or `None` when unregistered or already dropped.
    pub fn lookup(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.objects.borrow().get(&id).and_then(|r| r.handle.upgrade())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    pub fn kind_of(&self, id: ObjectId) -> Option<ObjectKind> {
        self.objects.borrow().get(&id).map(|r| r.kind)
    }

    pub fn blueprint_of(&self, id: ObjectId) -> Option<String> {
        self.objects.borrow().get(&id).map(|r| r.blueprint.clone())
    }

    /// Ids of every registered instance built from `blueprint`, in id order.
    pub fn ids_of(&self, blueprint: &str) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .objects
            .borrow()
            .iter()
            .filter(|(_, r)| r.blueprint == blueprint)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    /// Drop every entry. The id counter keeps running.
    pub fn clear(&self) {
        self.objects.borrow_mut().clear();
    }
}
