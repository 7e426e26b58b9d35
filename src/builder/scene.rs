//! Scene builder - the top-level entry point of a build.
//!
//! A scene template is a single `<Scene>` element whose children are placed
//! in the scene's world container. Only components and display objects may
//! sit directly in the world.

use super::{build_child, AttachPoint, BuildContext, Parent};
use crate::app::Application;
use crate::blueprint::{SceneBlueprint, SCENE_TAG};
use crate::engine::ObjectHandle;
use crate::error::{BuildError, DiagnosticKind};
use crate::types::{ObjectId, ObjectKind};

/// Tag used for the world container in diagnostics.
pub const WORLD_TAG: &str = "World";

/// Fail with [`BuildError::WrongRoot`] unless the template root is `<Scene>`.
pub(crate) fn check_root(app: &Application, blueprint: &SceneBlueprint) -> Result<(), BuildError> {
    let root = &blueprint.template;
    if root.name == SCENE_TAG {
        return Ok(());
    }
    let error = BuildError::WrongRoot {
        owner: blueprint.name.clone(),
        expected: SCENE_TAG.into(),
        found: root.name.clone(),
    };
    app.report(DiagnosticKind::Structure, None, error.to_string());
    Err(error)
}

/// Build scene `name` around an already constructed `scene` instance.
///
/// The application takes ownership of `scene` once the template root is
/// validated. Nothing is registered when validation fails. Once registered
/// the scene is current, so a later failure leaves it reachable for teardown.
pub fn build(
    app: &Application,
    name: &str,
    scene: ObjectHandle,
    mut ctx: BuildContext,
) -> Result<ObjectId, BuildError> {
    let Some(blueprint) = app.blueprints().scene(name) else {
        let error = BuildError::Unregistered {
            kind: ObjectKind::Scene,
            name: name.to_string(),
        };
        app.report(DiagnosticKind::Configuration, None, error.to_string());
        return Err(error);
    };

    // 1. VALIDATE ROOT
    check_root(app, &blueprint)?;
    let root = &blueprint.template;
    let world = scene.borrow().world();
    let Some(world) = world else {
        let error = BuildError::MissingWorld(blueprint.name.clone());
        app.report(DiagnosticKind::Configuration, None, error.to_string());
        return Err(error);
    };

    // 2. REGISTER + BIND WORLD
    let id = app.objects().allocate();
    app.objects().register(id, ObjectKind::Scene, &blueprint.name, &scene);
    app.adopt_scene(id, scene.clone());
    app.set_current(&blueprint.name, id);
    app.blueprints().track_instance(&blueprint.name, id);
    app.backend().set_world(world.clone());
    tracing::debug!(%id, scene = blueprint.name.as_str(), "scene created");

    // 3. VIEW-MODEL
    let bag = ctx.take_bag(app, &blueprint.name);
    app.init_view_model(id, &blueprint.name, &scene, bag);

    // 4. TOP-LEVEL NODES
    let at = AttachPoint {
        link: id,
        tag: WORLD_TAG.to_string(),
        handle: world,
    };
    for child in &root.children {
        build_child(app, id, child, &at, Parent::Scene, &mut ctx)?;
    }

    Ok(id)
}

/// Destroy every top-level node, then the scene itself.
pub fn destroy(app: &Application, id: ObjectId) {
    tracing::debug!(%id, "destroying scene");
    super::destroy_children(app, id);
    if let Some(name) = app.objects().blueprint_of(id) {
        app.blueprints().untrack_instance(&name, id);
    }
    app.view_models().destroy(id);
    super::run_hook(app, id);
    super::release(app, id);
    app.release_scene(id);
}
