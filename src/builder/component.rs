//! Component builder.
//!
//! A component is a stateful node with its own template. Its tag in the
//! parent template supplies prop values (evaluated in the parent's scope) and
//! optional slot content; its own template supplies a single container root
//! that becomes the component's display subtree.
//!
//! # Ownership
//!
//! ```text
//! container ─owns─> component ─owns─> root container ─owns─> template nodes
//!                                                     └─owns─> slot content
//! ```

use super::{apply_directives, build_child, display, pre_hook, AttachPoint, BuildContext, Parent};
use crate::app::Application;
use crate::blueprint::TagKind;
use crate::error::{BuildError, DiagnosticKind};
use crate::template::{NodeDescriptor, Scope};
use crate::types::{normalize_attr_name, ObjectId, ObjectKind};

/// Build the component tagged by `node` in the scope of `owner`.
pub fn build(
    app: &Application,
    owner: ObjectId,
    node: &NodeDescriptor,
    container: &AttachPoint,
    ctx: &mut BuildContext,
) -> Result<Option<ObjectId>, BuildError> {
    let scope = Scope::new(app, owner);
    if !node.passes(&scope) {
        return Ok(None);
    }
    let Some(blueprint) = app.blueprints().component(&node.name) else {
        let error = BuildError::Unregistered {
            kind: ObjectKind::Component,
            name: node.name.clone(),
        };
        app.report(DiagnosticKind::Configuration, Some(owner), error.to_string());
        return Ok(None);
    };

    // 1. PROP COUNT - mismatch is only a warning
    if let Some((supplied, declared)) = app.active().check_prop_count(&blueprint.name, node.attribute_count()) {
        app.report(
            DiagnosticKind::Attribute,
            Some(owner),
            format!(
                "<{}> supplies {supplied} attribute(s) but declares {declared} prop(s)",
                blueprint.name
            ),
        );
    }

    // 2. ROOT TEMPLATE - a single container
    let root = &blueprint.template;
    let root_caps = match app.blueprints().tag_kind(&root.name) {
        Some(TagKind::Display(caps)) if caps.holds_nodes() => caps,
        _ => {
            let error = BuildError::WrongRoot {
                owner: blueprint.name.clone(),
                expected: "Container".into(),
                found: root.name.clone(),
            };
            app.report(DiagnosticKind::Structure, Some(owner), error.to_string());
            return Err(error);
        }
    };

    // 3. CONSTRUCT + REGISTER
    let instance = (blueprint.ctor)();
    let id = app.objects().allocate();
    app.objects().register(id, ObjectKind::Component, &blueprint.name, &instance);
    app.tree().adopt(container.link, id, instance.clone());
    app.blueprints().track_instance(&blueprint.name, id);
    tracing::debug!(%id, tag = blueprint.name.as_str(), %owner, "component created");

    // 4. VIEW-MODEL - one empty dependency list per reactive property,
    //    values rehydrated from an export when one is supplied
    let bag = ctx.take_bag(app, &blueprint.name);
    app.init_view_model(id, &blueprint.name, &instance, bag);

    // 5. PROP VALUES - evaluated in the owner's scope
    let supplied = node
        .normals
        .iter()
        .map(|n| (normalize_attr_name(&n.name), &n.value))
        .chain(
            node.directives
                .iter()
                .filter(|d| !d.argument.is_empty())
                .map(|d| (normalize_attr_name(&d.argument), &d.value)),
        );
    for (name, value_fn) in supplied {
        let value = pre_hook(app, owner, &node.name, &name, value_fn(&scope));
        if !app.view_models().seed(id, &name, value.clone()) {
            instance.borrow_mut().set_attr(&name, value);
        }
    }

    // 6. DISPLAY SUBTREE
    let root_id = display::build(app, id, root, container, None, ctx)?;
    if let Some(root_id) = root_id {
        app.tree().reparent(root_id, id);
        app.blueprints().set_root(&blueprint.name, id, root_id);
    }

    // 7. TAG DIRECTIVES - the component is the target
    apply_directives(app, owner, id, node);

    // 8. SLOT CONTENT - built into the root container, owned by the component
    if !node.children.is_empty() {
        match root_id.and_then(|r| app.attach_point(r)) {
            Some(at) => {
                for child in &node.children {
                    build_child(app, id, child, &at, Parent::Display(root_caps), ctx)?;
                }
            }
            None => app.report(
                DiagnosticKind::Structure,
                Some(id),
                format!("<{}> has no root container for its child nodes", blueprint.name),
            ),
        }
    }

    Ok(Some(id))
}

/// Destroy the owned subtree, then the component's view-model and record.
pub fn destroy(app: &Application, id: ObjectId) {
    tracing::debug!(%id, "destroying component");
    super::destroy_children(app, id);
    if let Some(name) = app.objects().blueprint_of(id) {
        app.blueprints().untrack_instance(&name, id);
    }
    app.view_models().destroy(id);
    super::run_hook(app, id);
    super::release(app, id);
}
