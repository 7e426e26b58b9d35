//! Builders - turn template descriptors into live instances.
//!
//! One builder per node kind:
//! - [`scene`]: the `<Scene>` root, world container, top-level nodes
//! - [`component`]: prop wiring, view-model, display subtree, slot content
//! - [`display`]: guards, attributes, directives, repeat, children
//! - [`support`]: attributes and directives on the enclosing display object
//!
//! Every builder registers what it constructs in the object registry and
//! hands ownership to the object tree under the node it attaches to.
//! Destruction walks the same tree bottom-up ([`destroy`]).

pub mod component;
pub mod display;
pub mod scene;
pub mod support;

use std::collections::{HashMap, VecDeque};

use crate::app::Application;
use crate::backend::NodeCaps;
use crate::blueprint::{Attributes, TagKind};
use crate::engine::{ObjectHandle, PropertyBag};
use crate::error::{BuildError, DiagnosticKind};
use crate::template::{NodeDescriptor, Scope};
use crate::types::{normalize_attr_name, ObjectId, ObjectKind, Value};

/// Exported view-model values, per blueprint name, in instance build order.
pub type InheritedViewModel = HashMap<String, VecDeque<PropertyBag>>;

// =============================================================================
// Build context
// =============================================================================

/// Where a node attaches: the owning link in the object tree plus the
/// instance that receives the add-call.
#[derive(Clone)]
pub struct AttachPoint {
    /// Tree parent of the attached node.
    pub link: ObjectId,
    /// Tag of the receiving instance, for diagnostics.
    pub tag: String,
    pub handle: ObjectHandle,
}

/// State threaded through one build pass.
#[derive(Default)]
pub struct BuildContext {
    /// Values to rehydrate view-models from, consumed in build order.
    pub inherited: Option<InheritedViewModel>,
    /// Blueprints that start from their defaults even when rehydrating.
    pub ignore: Vec<String>,
}

impl BuildContext {
    pub fn rehydrating(inherited: InheritedViewModel, ignore: Vec<String>) -> Self {
        Self {
            inherited: Some(inherited),
            ignore,
        }
    }

    /// Next exported bag for an instance of `blueprint`.
    ///
    /// `None` outside a rehydrating pass, for ignored blueprints, and when the
    /// export ran out of bags (reported; the instance falls back to defaults).
    pub fn take_bag(&mut self, app: &Application, blueprint: &str) -> Option<PropertyBag> {
        let inherited = self.inherited.as_mut()?;
        if self.ignore.iter().any(|name| name == blueprint) {
            return None;
        }
        let bag = inherited.get_mut(blueprint).and_then(VecDeque::pop_front);
        if bag.is_none() {
            app.report(
                DiagnosticKind::ViewModel,
                None,
                format!("no exported view-model left for `{blueprint}`, using defaults"),
            );
        }
        bag
    }
}

/// What a child node sits in.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Parent {
    /// Directly under a scene's world.
    Scene,
    /// Under a display object with these capabilities.
    Display(NodeCaps),
}

// =============================================================================
// Attributes
// =============================================================================

/// Evaluated attributes of one node, split by the blueprint's lists.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub require: Attributes,
    pub optional: Attributes,
    /// Everything that ends up assigned after construction.
    pub setters: Vec<(String, Value)>,
}

/// Post-process an evaluated attribute value: warn on undefined, bind
/// functions to `owner`.
pub(crate) fn pre_hook(app: &Application, owner: ObjectId, tag: &str, name: &str, value: Value) -> Value {
    match value {
        Value::Undefined => {
            if app.config().warn_undefined_attributes {
                app.report(
                    DiagnosticKind::Attribute,
                    Some(owner),
                    format!("<{tag}> attribute `{name}` evaluated to undefined"),
                );
            }
            Value::Undefined
        }
        Value::Func(method) => Value::Func(method.bound_to(owner)),
        other => other,
    }
}

/// Evaluate every attribute of `node` against `owner` and bucket it.
///
/// Names are normalized (`-` → `_`). Directive attributes with an empty
/// argument only count towards the required/optional lists.
pub(crate) fn collect_attributes(
    app: &Application,
    owner: ObjectId,
    node: &NodeDescriptor,
    require: &[String],
    optional: &[String],
) -> Result<Collected, BuildError> {
    let scope = Scope::new(app, owner);
    let mut collected = Collected::default();

    let place = |name: String, value: Value, setter: bool, collected: &mut Collected| {
        if require.contains(&name) {
            collected.require.insert(name.clone(), value.clone());
        } else if optional.contains(&name) {
            collected.optional.insert(name.clone(), value.clone());
        }
        if setter {
            collected.setters.push((name, value));
        }
    };

    for normal in &node.normals {
        let name = normalize_attr_name(&normal.name);
        let value = pre_hook(app, owner, &node.name, &name, (normal.value)(&scope));
        place(name, value, true, &mut collected);
    }
    for directive in &node.directives {
        let name = normalize_attr_name(&directive.argument);
        let value = pre_hook(app, owner, &node.name, &name, (directive.value)(&scope));
        let setter = !name.is_empty();
        place(name, value, setter, &mut collected);
    }

    let missing: Vec<String> = require
        .iter()
        .filter(|name| !collected.require.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(BuildError::MissingRequired {
            tag: node.name.clone(),
            missing,
        });
    }
    Ok(collected)
}

/// Wire every directive attribute of `node`: `source` owns the expression,
/// `target` receives the value.
pub(crate) fn apply_directives(app: &Application, source: ObjectId, target: ObjectId, node: &NodeDescriptor) {
    for attr in &node.directives {
        let Some(directive) = app.directives().get(&attr.name) else {
            app.report(
                DiagnosticKind::Configuration,
                Some(target),
                format!("<{}> uses unregistered directive `{}`", node.name, attr.name),
            );
            continue;
        };
        directive.bind(
            app,
            source,
            target,
            &normalize_attr_name(&attr.argument),
            &attr.value,
            &attr.triggers,
        );
    }
}

// =============================================================================
// Children
// =============================================================================

/// Build one child node of `parent` in the scope of `owner`.
///
/// Unregistered tags and illegal nesting are reported and the child skipped.
pub(crate) fn build_child(
    app: &Application,
    owner: ObjectId,
    child: &NodeDescriptor,
    at: &AttachPoint,
    parent: Parent,
    ctx: &mut BuildContext,
) -> Result<(), BuildError> {
    let Some(kind) = app.blueprints().tag_kind(&child.name) else {
        let error = BuildError::Unregistered {
            kind: ObjectKind::Display,
            name: child.name.clone(),
        };
        app.report(DiagnosticKind::Configuration, Some(owner), error.to_string());
        return Ok(());
    };

    match (kind, parent) {
        (TagKind::Support, Parent::Scene) => {
            app.report(
                DiagnosticKind::Structure,
                Some(owner),
                format!("<{}> support object needs a display object to act on", child.name),
            );
            Ok(())
        }
        (TagKind::Support, Parent::Display(_)) => support::build(app, owner, child, at).map(drop),
        (TagKind::Component | TagKind::Display(_), Parent::Display(caps)) if !caps.holds_nodes() => {
            let error = BuildError::IllegalNesting {
                parent: at.tag.clone(),
                child: child.name.clone(),
            };
            app.report(DiagnosticKind::Structure, Some(at.link), error.to_string());
            Ok(())
        }
        (TagKind::Component, _) => component::build(app, owner, child, at, ctx).map(drop),
        (TagKind::Display(_), _) => display::build(app, owner, child, at, None, ctx).map(drop),
    }
}

/// Hand `instance` to the add-call of the attach point.
pub(crate) fn attach(app: &Application, at: &AttachPoint, id: ObjectId, instance: &ObjectHandle) {
    let accepted = match at.handle.try_borrow_mut() {
        Ok(mut parent) => parent.add_child(id, instance),
        Err(_) => false,
    };
    if accepted {
        app.tree().mount(id, &at.handle);
    } else {
        let error = BuildError::NotAContainer(at.tag.clone());
        app.report(DiagnosticKind::Structure, Some(id), error.to_string());
    }
}

// =============================================================================
// Destruction
// =============================================================================

/// Destroy `id` and everything it owns. Returns false for unknown ids.
pub fn destroy(app: &Application, id: ObjectId) -> bool {
    match app.objects().kind_of(id) {
        Some(ObjectKind::Scene) => scene::destroy(app, id),
        Some(ObjectKind::Component) => component::destroy(app, id),
        Some(ObjectKind::Display) => display::destroy(app, id),
        Some(ObjectKind::Support) => support::destroy(app, id),
        None => return false,
    }
    true
}

/// Destroy every tree child of `id`, last attached first.
pub(crate) fn destroy_children(app: &Application, id: ObjectId) {
    for child in app.tree().children_of(id).into_iter().rev() {
        destroy(app, child);
    }
}

/// Run the destroy hook of `id`, if it is still live.
pub(crate) fn run_hook(app: &Application, id: ObjectId) {
    if let Some(instance) = app.objects().lookup(id) {
        if let Ok(mut instance) = instance.try_borrow_mut() {
            instance.destroy();
        }
    }
}

/// Take `id` out of the container it was added to, then drop it from the
/// registry and the tree. Dropping the tree link frees it.
pub(crate) fn release(app: &Application, id: ObjectId) {
    if let Some(container) = app.tree().unmount(id) {
        if let Ok(mut container) = container.try_borrow_mut() {
            container.remove_child(id);
        }
    }
    app.objects().unregister(id);
    app.clear_repeat_indices(id);
    drop(app.tree().detach(id));
}
