//! Directive Engine - named cross-node binding behaviors.
//!
//! A directive attribute (`l-bind-label="count"`) connects a reactive property
//! of the owner (the source) to an attribute of the node carrying the
//! directive (the target). Directives are looked up by name at build time.
//!
//! Built-in directives:
//! - [`Bind`] (`bind`) - one-way property-to-property propagation
//!
//! The namespace is open: anything implementing [`Directive`] can be
//! registered under a new name.
//!
//! # Safety across destruction
//!
//! Callbacks registered by a directive close over ids, never handles. At fire
//! time both ends are looked up again; if either is gone the callback does
//! nothing.

mod bind;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::app::Application;
use crate::template::ValueFn;
use crate::types::ObjectId;

pub use bind::Bind;

/// Bind-time behavior of a named directive.
pub trait Directive {
    /// Wire `target.argument` to the value of `value` evaluated in `source`,
    /// re-evaluated whenever one of `triggers` changes on `source`.
    fn bind(
        &self,
        app: &Application,
        source: ObjectId,
        target: ObjectId,
        argument: &str,
        value: &ValueFn,
        triggers: &[String],
    );
}

#[derive(Default)]
pub struct DirectiveRegistry {
    directives: RefCell<HashMap<String, Rc<dyn Directive>>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in directives installed.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("bind", Rc::new(Bind));
        registry
    }

    /// Register `directive` under `name`. Returns false, leaving the existing
    /// directive in place, when the name is taken.
    pub fn register(&self, name: &str, directive: Rc<dyn Directive>) -> bool {
        let mut directives = self.directives.borrow_mut();
        if directives.contains_key(name) {
            return false;
        }
        directives.insert(name.to_string(), directive);
        true
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Directive>> {
        self.directives.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.borrow().contains_key(name)
    }
}
