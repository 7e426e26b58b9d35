//! Error and diagnostic types.
//!
//! Construction errors ([`BuildError`]) unwind the subtree being built and
//! surface to the caller of the builder entry point. Mutation-contract
//! violations ([`Violation`]) are returned to the writer and leave the stored
//! value untouched. Everything that is reported but not raised is recorded
//! as a [`Diagnostic`].

use std::fmt;

use crate::types::{ObjectId, ObjectKind};

/// Errors raised while registering blueprints or building a tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("{kind} `{name}` is not registered")]
    Unregistered { kind: ObjectKind, name: String },

    #[error("`{0}` is already registered")]
    DuplicateRegistration(String),

    #[error("`{owner}` template must have a single <{expected}> root, found <{found}>")]
    WrongRoot {
        owner: String,
        expected: String,
        found: String,
    },

    #[error("<{parent}> cannot contain <{child}>: only container and shadow objects hold components or display objects")]
    IllegalNesting { parent: String, child: String },

    #[error("<{tag}> is missing required attributes: {}", .missing.join(", "))]
    MissingRequired { tag: String, missing: Vec<String> },

    #[error("scene `{0}` has no world container")]
    MissingWorld(String),

    #[error("<{0}> cannot hold children")]
    NotAContainer(String),
}

/// A rejected write to a reactive property.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("prop `{property}` of {id} is supplied by its parent and cannot be assigned")]
    ReadOnlyProp { id: ObjectId, property: String },

    #[error("getter `{property}` of {id} reads the state store and cannot be assigned")]
    ReadOnlyGetter { id: ObjectId, property: String },

    #[error("{id} has no reactive property `{property}`")]
    UnknownProperty { id: ObjectId, property: String },

    #[error("{0} is not a live instance")]
    UnknownInstance(ObjectId),

    #[error("dependency dispatch deeper than {0} levels")]
    DispatchTooDeep(usize),
}

/// Category of a reported, non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Unregistered blueprint or directive, duplicate registration.
    Configuration,
    /// Wrong root element, illegal nesting.
    Structure,
    /// Prop-count mismatch, undefined attribute value.
    Attribute,
    /// Write to a prop or getter property.
    Mutation,
    /// Hot-reconstruction data missing or mismatched.
    ViewModel,
}

/// A reported problem that did not abort the build.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: Option<ObjectId>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject {
            Some(id) => write!(f, "[{:?}] {}: {}", self.kind, id, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}
