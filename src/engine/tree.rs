//! Object Tree - ownership of built instances.
//!
//! Every built instance has exactly one owner: the container it was attached
//! to, the component whose root it is, or the scene it was built into. The
//! owner holds the strong handle; releasing an owner's children drops them.
//! Recursive destruction walks this tree.
//!
//! Ownership and placement can differ: a component's root is owned by the
//! component but added to the container the component sits in. The tree
//! also remembers which instance received each add-call, so teardown can
//! take the child back out of it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::instance::{Instance, ObjectHandle};
use crate::types::ObjectId;

#[derive(Default)]
pub struct ObjectTree {
    children: RefCell<HashMap<ObjectId, Vec<(ObjectId, ObjectHandle)>>>,
    parents: RefCell<HashMap<ObjectId, ObjectId>>,
    /// Instance each child was added to.
    mounts: RefCell<HashMap<ObjectId, Weak<RefCell<dyn Instance>>>>,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `parent` the owner of `child`. An existing owner is replaced.
    pub fn adopt(&self, parent: ObjectId, child: ObjectId, handle: ObjectHandle) {
        self.detach(child);
        self.children
            .borrow_mut()
            .entry(parent)
            .or_default()
            .push((child, handle));
        self.parents.borrow_mut().insert(child, parent);
    }

    /// Move `child` under `new_parent`, keeping its handle.
    pub fn reparent(&self, child: ObjectId, new_parent: ObjectId) -> bool {
        match self.detach(child) {
            Some(handle) => {
                self.adopt(new_parent, child, handle);
                true
            }
            None => false,
        }
    }

    /// Remove `child` from its owner, returning the owning handle.
    pub fn detach(&self, child: ObjectId) -> Option<ObjectHandle> {
        let parent = self.parents.borrow_mut().remove(&child)?;
        let mut children = self.children.borrow_mut();
        let list = children.get_mut(&parent)?;
        let pos = list.iter().position(|(id, _)| *id == child)?;
        let (_, handle) = list.remove(pos);
        if list.is_empty() {
            children.remove(&parent);
        }
        Some(handle)
    }

    /// Owned children of `parent`, in attach order.
    pub fn children_of(&self, parent: ObjectId) -> Vec<ObjectId> {
        self.children
            .borrow()
            .get(&parent)
            .map(|list| list.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, child: ObjectId) -> Option<ObjectId> {
        self.parents.borrow().get(&child).copied()
    }

    /// Record that `child` was added to `container`.
    pub fn mount(&self, child: ObjectId, container: &ObjectHandle) {
        self.mounts.borrow_mut().insert(child, Rc::downgrade(container));
    }

    /// Forget where `child` was added, returning that instance if it is alive.
    pub fn unmount(&self, child: ObjectId) -> Option<ObjectHandle> {
        self.mounts.borrow_mut().remove(&child)?.upgrade()
    }

    pub fn clear(&self) {
        self.parents.borrow_mut().clear();
        self.mounts.borrow_mut().clear();
        // Take the map out first so instance drops never run under the borrow.
        let dropped = std::mem::take(&mut *self.children.borrow_mut());
        drop(dropped);
    }
}
