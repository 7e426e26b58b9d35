//! Display-object builder.
//!
//! A display object is constructed from its evaluated required/optional
//! attributes, receives every attribute as a setter afterwards, and then
//! builds its children (once per repeat iteration when it repeats).

use super::{apply_directives, attach, build_child, collect_attributes, AttachPoint, BuildContext, Parent};
use crate::app::Application;
use crate::engine::Repeat;
use crate::error::{BuildError, DiagnosticKind};
use crate::template::{NodeDescriptor, Scope};
use crate::types::{ObjectId, ObjectKind};

/// Build `node` in the scope of `owner` and attach it to `container`.
///
/// `id` reuses a pre-allocated id (a component's root). Returns `Ok(None)`
/// when a guard excludes the node or its tag is not a display object.
pub fn build(
    app: &Application,
    owner: ObjectId,
    node: &NodeDescriptor,
    container: &AttachPoint,
    id: Option<ObjectId>,
    ctx: &mut BuildContext,
) -> Result<Option<ObjectId>, BuildError> {
    // 1. GUARDS
    if !node.passes(&Scope::new(app, owner)) {
        tracing::trace!(tag = node.name.as_str(), %owner, "guard excluded node");
        return Ok(None);
    }

    // 2. RESOLVE BLUEPRINT
    let Some(blueprint) = app.blueprints().display(&node.name) else {
        let error = BuildError::Unregistered {
            kind: ObjectKind::Display,
            name: node.name.clone(),
        };
        app.report(DiagnosticKind::Configuration, Some(owner), error.to_string());
        return Ok(None);
    };

    // 3. COLLECT ATTRIBUTES - fails before anything is constructed
    let attrs = collect_attributes(app, owner, node, &blueprint.require, &blueprint.optional)?;

    // 4. CONSTRUCT + REGISTER
    let id = id.unwrap_or_else(|| app.objects().allocate());
    let instance = (blueprint.ctor)(&mut *app.backend(), &attrs.require, &attrs.optional, id);
    app.objects().register(id, ObjectKind::Display, &blueprint.name, &instance);
    app.tree().adopt(container.link, id, instance.clone());
    tracing::debug!(%id, tag = blueprint.name.as_str(), %owner, "display object created");

    // 5. DIRECTIVES - owner is the source, this object the target
    apply_directives(app, owner, id, node);

    // 6. SETTERS
    for (name, value) in attrs.setters {
        instance.borrow_mut().set_attr(&name, value);
    }

    // 7. CHILDREN - repeated when the object asks for it
    let repeat = instance.borrow().repeat();
    let count = repeat.as_ref().map_or(1, |r| r.count);
    let here = AttachPoint {
        link: id,
        tag: blueprint.name.clone(),
        handle: instance.clone(),
    };
    for index in 0..count {
        if let Some(Repeat { name: Some(name), .. }) = &repeat {
            app.set_repeat_index(owner, name, index);
        }
        for child in &node.children {
            build_child(app, owner, child, &here, Parent::Display(blueprint.caps), ctx)?;
        }
    }

    // 8. ATTACH
    attach(app, container, id, &instance);

    Ok(Some(id))
}

/// Destroy hook first, then the owned subtree, then the object itself.
pub fn destroy(app: &Application, id: ObjectId) {
    tracing::debug!(%id, "destroying display object");
    super::run_hook(app, id);
    super::destroy_children(app, id);
    super::release(app, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless;
    use crate::engine::ActiveProperties;
    use crate::types::Value;

    fn world(app: &Application) -> (ObjectId, AttachPoint) {
        let scene = headless::bare_scene(app, ActiveProperties::new());
        let world = app.attach_point(scene).expect("scene world");
        (scene, world)
    }

    #[test]
    fn test_required_and_optional_reach_constructor() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let node = NodeDescriptor::new("Image")
            .literal("x", 1)
            .literal("y", 2)
            .literal("key", "hero")
            .literal("frame", 4)
            .literal("alpha", 0.5);

        let id = build(&app, scene, &node, &world, None, &mut BuildContext::default())
            .expect("build")
            .expect("built");

        assert_eq!(app.get(id, "key"), Value::from("hero"));
        assert_eq!(app.get(id, "frame"), Value::Int(4));
        // Not in either list, still assigned as a setter.
        assert_eq!(app.get(id, "alpha"), Value::Float(0.5));
        assert_eq!(app.children_of(scene), vec![id]);
    }

    #[test]
    fn test_missing_required_fails_before_construction() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let before = app.live_count();
        let node = NodeDescriptor::new("Image").literal("x", 1).literal("y", 2);

        let err = build(&app, scene, &node, &world, None, &mut BuildContext::default()).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingRequired {
                tag: "Image".into(),
                missing: vec!["key".into()],
            }
        );
        assert_eq!(app.live_count(), before);
    }

    #[test]
    fn test_guard_excludes_node() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let node = NodeDescriptor::new("Container").guard(|_| false);
        let built = build(&app, scene, &node, &world, None, &mut BuildContext::default()).expect("build");
        assert_eq!(built, None);
    }

    #[test]
    fn test_repeat_builds_children_per_index() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let node = NodeDescriptor::new("Container")
            .literal("repeat_count", 3)
            .literal("repeat_name", "row")
            .child(
                NodeDescriptor::new("Image")
                    .attr("x", |s| Value::from(s.repeat_index("row").unwrap_or(99)))
                    .literal("y", 0)
                    .literal("key", "cell"),
            );

        let id = build(&app, scene, &node, &world, None, &mut BuildContext::default())
            .expect("build")
            .expect("built");

        let xs: Vec<Value> = app.children_of(id).into_iter().map(|c| app.get(c, "x")).collect();
        assert_eq!(xs, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert_eq!(app.get(id, "child_count"), Value::Int(3));
    }

    #[test]
    fn test_leaf_cannot_hold_display_children() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let node = NodeDescriptor::new("Image")
            .literal("x", 0)
            .literal("y", 0)
            .literal("key", "k")
            .child(NodeDescriptor::new("Container"));

        let id = build(&app, scene, &node, &world, None, &mut BuildContext::default())
            .expect("build")
            .expect("built");
        assert!(app.children_of(id).is_empty());
        assert!(app
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Structure));
    }

    #[test]
    fn test_destroy_runs_hook_and_releases_subtree() {
        let app = headless::application();
        let (scene, world) = world(&app);
        let node = NodeDescriptor::new("Container").child(NodeDescriptor::new("Container"));
        let id = build(&app, scene, &node, &world, None, &mut BuildContext::default())
            .expect("build")
            .expect("built");
        let inner = app.children_of(id)[0];
        let handle = app.objects().lookup(id).expect("live");

        assert!(app.destroy(id));
        assert!(!app.is_live(id));
        assert!(!app.is_live(inner));
        assert_eq!(handle.borrow().attr("child_count"), Value::Int(0));
    }
}
