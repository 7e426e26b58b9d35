//! # spark-scene
//!
//! Declarative scene/component graph builder for Rust.
//!
//! Scenes and components are described as templates (trees of
//! [`NodeDescriptor`]s). Building a scene instantiates that tree against a
//! rendering [`Backend`], gives every instance an [`ObjectId`], wires reactive
//! data flow between instances through directives, and keeps everything
//! destroyable by id.
//!
//! ## Architecture
//!
//! ```text
//! Application ─┬─ Blueprints       name → constructor + template
//!              ├─ ObjectRegistry   id → instance (weak)
//!              ├─ ObjectTree       owner → owned instances (strong)
//!              ├─ ViewModels       (id, property) → value + dependencies
//!              ├─ Directives       name → bind-time behavior
//!              ├─ Store            global reducer state, read by getters
//!              └─ Backend          world container, scene transitions
//! ```
//!
//! Reactive writes are synchronous: a changed value runs its dependency
//! callbacks before the write returns.
//!
//! ## Modules
//!
//! - [`types`] - Identifiers and the dynamic [`Value`] model
//! - [`template`] - Node descriptors and their fluent constructors
//! - [`engine`] - Registry, ownership tree, active properties, view-models
//! - [`directive`] - Directive registry and the built-in `bind`
//! - [`builder`] - Scene, component, display and support builders
//! - [`backend`] - Backend seam and the headless backend
//! - [`store`] - Global state store
//! - [`app`] - The [`Application`] tying it all together

pub mod app;
pub mod backend;
pub mod blueprint;
pub mod builder;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod store;
pub mod template;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use app::Application;

pub use backend::{Backend, JumpFlags, NodeCaps};

pub use blueprint::{
    Attributes, ComponentBlueprint, DisplayBlueprint, SceneBlueprint, SupportBlueprint,
};

pub use builder::{AttachPoint, BuildContext, InheritedViewModel};

pub use config::AppConfig;

pub use directive::{Bind, Directive};

pub use engine::{
    handle, ActiveProperties, Category, Instance, ObjectHandle, PropertyBag, Repeat, WriteOrigin,
    WriteOutcome,
};

pub use error::{BuildError, Diagnostic, DiagnosticKind, Violation};

pub use store::{Action, Store};

pub use template::{NodeDescriptor, Scope};
