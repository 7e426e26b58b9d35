//! Template descriptors - the parsed shape of a scene or component template.
//!
//! The markup parser is an external collaborator; it hands the engine a tree
//! of [`NodeDescriptor`]s. A descriptor is immutable once built and shared by
//! every instance created from its blueprint.
//!
//! Attribute and directive values are pre-compiled into [`ValueFn`]s that are
//! evaluated against a [`Scope`] (the owner the template belongs to).
//!
//! # Example
//!
//! ```ignore
//! use spark_scene::template::NodeDescriptor;
//!
//! let node = NodeDescriptor::new("Container")
//!     .child(
//!         NodeDescriptor::new("Image")
//!             .literal("x", 10)
//!             .literal("y", 20)
//!             .literal("key", "logo")
//!             .bind("visible", "show_logo"),
//!     );
//! ```

use std::fmt;
use std::rc::Rc;

use crate::app::Application;
use crate::types::{ObjectId, Value};

// =============================================================================
// Scope
// =============================================================================

/// Evaluation context of a template expression: the owning scene or component.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    app: &'a Application,
    owner: ObjectId,
}

impl<'a> Scope<'a> {
    pub fn new(app: &'a Application, owner: ObjectId) -> Self {
        Self { app, owner }
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn app(&self) -> &'a Application {
        self.app
    }

    /// Read a property of the owner: reactive property first, plain attribute otherwise.
    pub fn get(&self, name: &str) -> Value {
        self.app.get(self.owner, name)
    }

    /// Current repeat index the owner exposes under `name`.
    pub fn repeat_index(&self, name: &str) -> Option<usize> {
        self.app.repeat_index(self.owner, name)
    }
}

/// Pre-compiled attribute expression.
pub type ValueFn = Rc<dyn Fn(&Scope<'_>) -> Value>;

/// Guard predicate for conditional inclusion.
pub type Guard = Rc<dyn Fn(&Scope<'_>) -> bool>;

// =============================================================================
// Descriptor parts
// =============================================================================

/// A plain attribute: `x="10"` or `x="{offset + 2}"`.
#[derive(Clone)]
pub struct Normal {
    pub name: String,
    pub value: ValueFn,
}

/// A directive attribute: `l-bind-label="count"`.
#[derive(Clone)]
pub struct DirectiveAttr {
    /// Directive name (`bind`).
    pub name: String,
    /// Target attribute on the node (`label`).
    pub argument: String,
    pub value: ValueFn,
    /// Owner properties the expression reads; a change to any of them re-runs it.
    pub triggers: Vec<String>,
}

/// One parsed template element.
#[derive(Clone)]
pub struct NodeDescriptor {
    pub name: String,
    pub normals: Vec<Normal>,
    pub directives: Vec<DirectiveAttr>,
    pub children: Vec<NodeDescriptor>,
    pub check: Vec<Guard>,
}

impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("name", &self.name)
            .field("normals", &self.normals.iter().map(|n| n.name.as_str()).collect::<Vec<_>>())
            .field(
                "directives",
                &self
                    .directives
                    .iter()
                    .map(|d| format!("{}:{}", d.name, d.argument))
                    .collect::<Vec<_>>(),
            )
            .field("children", &self.children)
            .field("check", &self.check.len())
            .finish()
    }
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normals: Vec::new(),
            directives: Vec::new(),
            children: Vec::new(),
            check: Vec::new(),
        }
    }

    /// Attribute computed from the owner scope.
    pub fn attr(mut self, name: impl Into<String>, value: impl Fn(&Scope<'_>) -> Value + 'static) -> Self {
        self.normals.push(Normal {
            name: name.into(),
            value: Rc::new(value),
        });
        self
    }

    /// Attribute with a constant value.
    pub fn literal(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.attr(name, move |_| value.clone())
    }

    /// Directive attribute with an explicit trigger list.
    pub fn directive<I, S>(
        mut self,
        name: impl Into<String>,
        argument: impl Into<String>,
        value: impl Fn(&Scope<'_>) -> Value + 'static,
        triggers: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives.push(DirectiveAttr {
            name: name.into(),
            argument: argument.into(),
            value: Rc::new(value),
            triggers: triggers.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// `bind` directive copying one owner property onto `argument`.
    pub fn bind(self, argument: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        let read = property.clone();
        self.directive("bind", argument, move |scope| scope.get(&read), [property])
    }

    pub fn guard(mut self, check: impl Fn(&Scope<'_>) -> bool + 'static) -> Self {
        self.check.push(Rc::new(check));
        self
    }

    pub fn child(mut self, child: NodeDescriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeDescriptor>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of attributes the node supplies (plain + directive).
    pub fn attribute_count(&self) -> usize {
        self.normals.len() + self.directives.len()
    }

    /// True when every guard passes for `scope`.
    pub fn passes(&self, scope: &Scope<'_>) -> bool {
        self.check.iter().all(|guard| guard(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shapes_descriptor() {
        let node = NodeDescriptor::new("Container")
            .literal("x", 1)
            .bind("visible", "shown")
            .child(NodeDescriptor::new("Image"));

        assert_eq!(node.name, "Container");
        assert_eq!(node.attribute_count(), 2);
        assert_eq!(node.directives[0].name, "bind");
        assert_eq!(node.directives[0].argument, "visible");
        assert_eq!(node.directives[0].triggers, vec!["shown".to_string()]);
        assert_eq!(node.children.len(), 1);
    }
}
