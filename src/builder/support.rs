//! Support-object builder.
//!
//! Support objects (masks, slots, behaviors) act on the display object that
//! encloses them. They are owned by that display object, never added to it,
//! and hold no children of their own.

use super::{apply_directives, collect_attributes, AttachPoint};
use crate::app::Application;
use crate::error::{BuildError, DiagnosticKind};
use crate::template::{NodeDescriptor, Scope};
use crate::types::{ObjectId, ObjectKind};

/// Build `node` in the scope of `owner`, acting on `target`.
pub fn build(
    app: &Application,
    owner: ObjectId,
    node: &NodeDescriptor,
    target: &AttachPoint,
) -> Result<Option<ObjectId>, BuildError> {
    if !node.passes(&Scope::new(app, owner)) {
        return Ok(None);
    }
    let Some(blueprint) = app.blueprints().support(&node.name) else {
        let error = BuildError::Unregistered {
            kind: ObjectKind::Support,
            name: node.name.clone(),
        };
        app.report(DiagnosticKind::Configuration, Some(owner), error.to_string());
        return Ok(None);
    };

    let attrs = collect_attributes(app, owner, node, &blueprint.require, &blueprint.optional)?;

    let id = app.objects().allocate();
    let instance = (blueprint.ctor)(
        &mut *app.backend(),
        &target.handle,
        &attrs.require,
        &attrs.optional,
        id,
    );
    app.objects().register(id, ObjectKind::Support, &blueprint.name, &instance);
    app.tree().adopt(target.link, id, instance.clone());
    tracing::debug!(%id, tag = blueprint.name.as_str(), target = %target.link, "support object created");

    apply_directives(app, owner, id, node);
    for (name, value) in attrs.setters {
        instance.borrow_mut().set_attr(&name, value);
    }

    if !node.children.is_empty() {
        app.report(
            DiagnosticKind::Structure,
            Some(id),
            format!(
                "<{}> is a support object; its {} child node(s) were ignored",
                node.name,
                node.children.len()
            ),
        );
    }
    Ok(Some(id))
}

pub fn destroy(app: &Application, id: ObjectId) {
    tracing::debug!(%id, "destroying support object");
    super::run_hook(app, id);
    super::release(app, id);
}
