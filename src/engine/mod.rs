//! Scene Engine - identity, ownership and reactive state of built instances.
//!
//! The engine manages the core data structures:
//! - Registry: id allocation, id → instance lookup (weak, non-owning)
//! - Tree: ownership of instances, walked by recursive destruction
//! - Active: per-blueprint declaration of reactive properties
//! - ViewModel: per-instance reactive values and dependency callbacks
//!
//! # Architecture
//!
//! Instances never hold references to each other. Everything that links two
//! instances (ownership, bindings, dependencies) goes through an [`ObjectId`]:
//!
//! ```text
//! ObjectTree:   #1 Scene ─owns─> #2 Counter ─owns─> #3 Container ─owns─> #4 Image
//! ViewModels:   #2.count = 3 ── dependency ──> lookup(#4) → set x
//! Registry:     #4 → Weak<Image>
//! ```
//!
//! Destroying #2 drops its subtree; the dependency on #2.count goes with its
//! view-model, and any callback still holding #4 finds nothing at lookup.
//!
//! [`ObjectId`]: crate::types::ObjectId

mod active;
mod instance;
mod registry;
mod tree;
mod view_model;

pub use active::*;
pub use instance::*;
pub use registry::*;
pub use tree::*;
pub use view_model::*;
