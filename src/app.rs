//! Application - the process-scoped state every builder works against.
//!
//! Holds the registries, the view-models, the state store, the backend and
//! the diagnostics of one running application. Builders and directive
//! callbacks receive it by reference; nothing in the crate is global.
//!
//! # Example
//!
//! ```ignore
//! use spark_scene::backend::headless::{self, HeadlessScene, PlainComponent};
//! use spark_scene::{handle, ActiveProperties, ComponentBlueprint, NodeDescriptor, SceneBlueprint, Value};
//!
//! let app = headless::application();
//! app.register_component(
//!     ComponentBlueprint::new("Badge", || handle(PlainComponent::default()), NodeDescriptor::new("Container"))
//!         .props(ActiveProperties::new().data("count")),
//! )?;
//! app.register_scene(SceneBlueprint::new(
//!     "Main",
//!     |_| handle(HeadlessScene::new()),
//!     NodeDescriptor::new("Scene").child(NodeDescriptor::new("Badge")),
//! ))?;
//!
//! app.boot("Main")?;
//! let badge = app.instances_of("Badge")[0];
//! app.set(badge, "count", Value::Int(3))?;
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::backend::{Backend, JumpFlags};
use crate::blueprint::{
    Blueprints, ComponentBlueprint, DisplayBlueprint, SceneBlueprint, SupportBlueprint, TagKind,
};
use crate::builder::{self, scene::WORLD_TAG, AttachPoint, BuildContext, InheritedViewModel};
use crate::config::AppConfig;
use crate::directive::{Directive, DirectiveRegistry};
use crate::engine::{
    ActiveProperties, ActivePropertyRegistry, ObjectHandle, ObjectRegistry, ObjectTree, PropertyBag,
    ViewModels, WriteOrigin, WriteOutcome,
};
use crate::error::{BuildError, Diagnostic, DiagnosticKind, Violation};
use crate::store::{Action, Store};
use crate::types::{ObjectId, ObjectKind, Value};

pub struct Application {
    config: AppConfig,
    objects: ObjectRegistry,
    tree: ObjectTree,
    active: ActivePropertyRegistry,
    view_models: ViewModels,
    directives: DirectiveRegistry,
    blueprints: Blueprints,
    store: Store,
    backend: RefCell<Box<dyn Backend>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    /// Repeat indices each owner currently exposes, by index name.
    repeat: RefCell<HashMap<ObjectId, HashMap<String, usize>>>,
    /// Strong handles of live scenes; scenes have no tree owner.
    scenes: RefCell<HashMap<ObjectId, ObjectHandle>>,
    current: RefCell<Option<(String, ObjectId)>>,
}

impl Application {
    pub fn new(config: AppConfig, backend: impl Backend + 'static) -> Self {
        Self {
            view_models: ViewModels::new(config.max_dispatch_depth),
            config,
            objects: ObjectRegistry::new(),
            tree: ObjectTree::new(),
            active: ActivePropertyRegistry::new(),
            directives: DirectiveRegistry::with_builtins(),
            blueprints: Blueprints::new(),
            store: Store::new(),
            backend: RefCell::new(Box::new(backend)),
            diagnostics: RefCell::new(Vec::new()),
            repeat: RefCell::new(HashMap::new()),
            scenes: RefCell::new(HashMap::new()),
            current: RefCell::new(None),
        }
    }

    // =========================================================================
    // Parts
    // =========================================================================

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    pub fn active(&self) -> &ActivePropertyRegistry {
        &self.active
    }

    pub fn view_models(&self) -> &ViewModels {
        &self.view_models
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    pub fn blueprints(&self) -> &Blueprints {
        &self.blueprints
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Exclusive access to the backend. Do not hold across a build call.
    pub fn backend(&self) -> RefMut<'_, dyn Backend> {
        RefMut::map(self.backend.borrow_mut(), |backend| &mut **backend)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Log a non-fatal problem and record it.
    pub fn report(&self, kind: DiagnosticKind, subject: Option<ObjectId>, message: impl Into<String>) {
        let message = message.into();
        let id = subject.map(|id| id.to_string()).unwrap_or_default();
        match kind {
            DiagnosticKind::Configuration | DiagnosticKind::Structure => {
                tracing::error!(?kind, id = id.as_str(), "{message}");
            }
            DiagnosticKind::Attribute | DiagnosticKind::Mutation | DiagnosticKind::ViewModel => {
                tracing::warn!(?kind, id = id.as_str(), "{message}");
            }
        }
        self.diagnostics.borrow_mut().push(Diagnostic {
            kind,
            subject,
            message,
        });
    }

    pub fn diagnostics(&self) -> Ref<'_, [Diagnostic]> {
        Ref::map(self.diagnostics.borrow(), Vec::as_slice)
    }

    /// Drain every recorded diagnostic.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    fn claim(&self, name: &str) -> Result<(), BuildError> {
        if self.blueprints.is_registered(name) {
            let error = BuildError::DuplicateRegistration(name.to_string());
            self.report(DiagnosticKind::Configuration, None, error.to_string());
            return Err(error);
        }
        Ok(())
    }

    fn declare(&self, name: &str, props: &ActiveProperties) {
        for conflict in self.active.declare(name, props) {
            self.report(
                DiagnosticKind::Configuration,
                None,
                format!("`{name}` declares `{conflict}` in more than one property category"),
            );
        }
    }

    pub fn register_scene(&self, blueprint: SceneBlueprint) -> Result<(), BuildError> {
        self.claim(&blueprint.name)?;
        self.declare(&blueprint.name, &blueprint.props);
        tracing::debug!(scene = blueprint.name.as_str(), "scene registered");
        self.blueprints.insert_scene(blueprint);
        Ok(())
    }

    pub fn register_component(&self, blueprint: ComponentBlueprint) -> Result<(), BuildError> {
        self.claim(&blueprint.name)?;
        self.declare(&blueprint.name, &blueprint.props);
        tracing::debug!(component = blueprint.name.as_str(), "component registered");
        self.blueprints.insert_component(blueprint);
        Ok(())
    }

    pub fn register_display_object(&self, blueprint: DisplayBlueprint) -> Result<(), BuildError> {
        self.claim(&blueprint.name)?;
        self.blueprints.insert_display(blueprint);
        Ok(())
    }

    pub fn register_support_object(&self, blueprint: SupportBlueprint) -> Result<(), BuildError> {
        self.claim(&blueprint.name)?;
        self.blueprints.insert_support(blueprint);
        Ok(())
    }

    pub fn register_directive(&self, name: &str, directive: impl Directive + 'static) -> Result<(), BuildError> {
        if !self.directives.register(name, Rc::new(directive)) {
            let error = BuildError::DuplicateRegistration(name.to_string());
            self.report(DiagnosticKind::Configuration, None, error.to_string());
            return Err(error);
        }
        Ok(())
    }

    /// Destroy every live instance of component `name`, then forget the
    /// blueprint. Returns the number of instances destroyed.
    pub fn unregister_component(&self, name: &str) -> usize {
        if self.blueprints.component(name).is_none() {
            let error = BuildError::Unregistered {
                kind: ObjectKind::Component,
                name: name.to_string(),
            };
            self.report(DiagnosticKind::Configuration, None, error.to_string());
            return 0;
        }
        let destroyed = self
            .blueprints
            .instances_of(name)
            .into_iter()
            .filter(|id| builder::destroy(self, *id))
            .count();
        self.blueprints.remove_component(name);
        self.active.remove(name);
        tracing::debug!(component = name, destroyed, "component unregistered");
        destroyed
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Read a property: reactive value first, plain attribute otherwise.
    pub fn get(&self, id: ObjectId, name: &str) -> Value {
        if let Some(value) = self.view_models.read(&self.store, id, name) {
            return value;
        }
        let Some(instance) = self.objects.lookup(id) else {
            return Value::Undefined;
        };
        let value = match instance.try_borrow() {
            Ok(instance) => instance.attr(name),
            Err(_) => Value::Undefined,
        };
        value
    }

    /// Write a reactive property from inside its instance.
    pub fn set(&self, id: ObjectId, name: &str, value: impl Into<Value>) -> Result<WriteOutcome, Violation> {
        self.view_models
            .write(self, id, name, value.into(), WriteOrigin::Internal)
            .inspect_err(|violation| self.report(DiagnosticKind::Mutation, Some(id), violation.to_string()))
    }

    /// Write from outside the instance (directives, parents).
    ///
    /// Reactive properties go through the view-model; anything else is a
    /// plain attribute set. Violations are reported, never raised.
    pub fn assign(&self, id: ObjectId, name: &str, value: Value) {
        if self.view_models.category(id, name).is_some() {
            if let Err(violation) = self.view_models.write(self, id, name, value, WriteOrigin::External) {
                self.report(DiagnosticKind::Mutation, Some(id), violation.to_string());
            }
            return;
        }
        let Some(instance) = self.objects.lookup(id) else {
            return;
        };
        match instance.try_borrow_mut() {
            Ok(mut instance) => instance.set_attr(name, value),
            Err(_) => tracing::trace!(%id, attr = name, "instance busy, assignment dropped"),
        }
    }

    /// Dispatch to the store and refresh the getters that changed.
    /// Returns the number of getter properties that changed.
    pub fn dispatch(&self, action: &Action) -> usize {
        if !self.store.dispatch(action) {
            return 0;
        }
        self.view_models.refresh_getters(self, &self.store)
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.objects.contains(id)
    }

    pub fn repeat_index(&self, owner: ObjectId, name: &str) -> Option<usize> {
        self.repeat.borrow().get(&owner)?.get(name).copied()
    }

    pub fn set_repeat_index(&self, owner: ObjectId, name: &str, index: usize) {
        self.repeat
            .borrow_mut()
            .entry(owner)
            .or_default()
            .insert(name.to_string(), index);
    }

    pub(crate) fn clear_repeat_indices(&self, owner: ObjectId) {
        self.repeat.borrow_mut().remove(&owner);
    }

    /// Create the view-model of a scene or component instance.
    ///
    /// Values come from `bag` when rehydrating, else from the instance's fields.
    pub(crate) fn init_view_model(
        &self,
        id: ObjectId,
        blueprint: &str,
        instance: &ObjectHandle,
        bag: Option<PropertyBag>,
    ) {
        let table = self.active.table(blueprint);
        let fields = instance.borrow();
        self.view_models.init(id, &table, &self.store, |name| {
            bag.as_ref()
                .and_then(|bag| bag.get(name).cloned())
                .unwrap_or_else(|| fields.attr(name))
        });
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Announce every scene to the backend and enter `scene`.
    pub fn boot(&self, scene: &str) -> Result<ObjectId, BuildError> {
        for name in self.blueprints.scene_names() {
            self.backend().register_scene(&name);
        }
        self.jump(scene, self.config.jump_flags())
    }

    /// Switch to scene `name`, building it from its template.
    pub fn jump(&self, name: &str, flags: JumpFlags) -> Result<ObjectId, BuildError> {
        self.enter(name, flags, BuildContext::default())
    }

    fn enter(&self, name: &str, flags: JumpFlags, ctx: BuildContext) -> Result<ObjectId, BuildError> {
        let Some(blueprint) = self.blueprints.scene(name) else {
            let error = BuildError::Unregistered {
                kind: ObjectKind::Scene,
                name: name.to_string(),
            };
            self.report(DiagnosticKind::Configuration, None, error.to_string());
            return Err(error);
        };
        // Validate before the previous world is cleared.
        builder::scene::check_root(self, &blueprint)?;
        if flags.contains(JumpFlags::CLEAR_WORLD) {
            let previous = self.current.borrow().as_ref().map(|(_, id)| *id);
            if let Some(previous) = previous {
                builder::destroy(self, previous);
            }
        }
        self.backend().jump(name, flags);
        let scene = (blueprint.ctor)(&mut *self.backend());
        let id = builder::scene::build(self, name, scene, ctx)?;
        tracing::info!(scene = name, %id, "entered scene");
        Ok(id)
    }

    pub fn current_scene(&self) -> Option<(String, ObjectId)> {
        self.current.borrow().clone()
    }

    pub(crate) fn set_current(&self, name: &str, id: ObjectId) {
        *self.current.borrow_mut() = Some((name.to_string(), id));
    }

    pub(crate) fn adopt_scene(&self, id: ObjectId, scene: ObjectHandle) {
        self.scenes.borrow_mut().insert(id, scene);
    }

    pub(crate) fn release_scene(&self, id: ObjectId) {
        let released = self.scenes.borrow_mut().remove(&id);
        drop(released);
        let mut current = self.current.borrow_mut();
        if current.as_ref().is_some_and(|(_, current)| *current == id) {
            *current = None;
        }
    }

    /// Destroy `id` and everything it owns.
    pub fn destroy(&self, id: ObjectId) -> bool {
        builder::destroy(self, id)
    }

    // =========================================================================
    // Hot reconstruction
    // =========================================================================

    /// Data/prop values of every live scene and component, per blueprint name
    /// in build order.
    pub fn export_view_models(&self) -> InheritedViewModel {
        let mut names = self.blueprints.scene_names();
        names.extend(self.blueprints.component_names());
        let mut exported = InheritedViewModel::new();
        for name in names {
            let bags: std::collections::VecDeque<PropertyBag> = self
                .blueprints
                .instances_of(&name)
                .into_iter()
                .filter_map(|id| self.view_models.snapshot(id))
                .collect();
            if !bags.is_empty() {
                exported.insert(name, bags);
            }
        }
        exported
    }

    /// Replace component blueprint `blueprint.name` and rebuild the current
    /// scene, keeping the view-model values of everything else.
    ///
    /// Returns the id of the rebuilt scene, or `None` when no scene is active.
    pub fn reload_component(&self, blueprint: ComponentBlueprint) -> Result<Option<ObjectId>, BuildError> {
        let name = blueprint.name.clone();
        let exported = self.export_view_models();
        if self.blueprints.component(&name).is_some() {
            self.unregister_component(&name);
        }
        self.register_component(blueprint)?;

        let Some((scene, _)) = self.current_scene() else {
            return Ok(None);
        };
        tracing::info!(component = name.as_str(), scene = scene.as_str(), "reloading");
        let ctx = BuildContext::rehydrating(exported, vec![name]);
        self.enter(&scene, JumpFlags::CLEAR_WORLD, ctx).map(Some)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Live instances of a scene or component blueprint, in build order.
    pub fn instances_of(&self, name: &str) -> Vec<ObjectId> {
        self.blueprints.instances_of(name)
    }

    /// Root container of component `id`.
    pub fn root_container(&self, id: ObjectId) -> Option<ObjectId> {
        let name = self.objects.blueprint_of(id)?;
        self.blueprints.record(&name, id)?.root
    }

    /// Owned children of `id`, in attach order.
    pub fn children_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.tree.children_of(id)
    }

    pub fn live_count(&self) -> usize {
        self.objects.len()
    }

    /// Where children of `id` attach: a scene's world, a component's root
    /// container, or a container/shadow itself.
    pub fn attach_point(&self, id: ObjectId) -> Option<AttachPoint> {
        match self.objects.kind_of(id)? {
            ObjectKind::Scene => {
                let scene = self.objects.lookup(id)?;
                let world = scene.borrow().world()?;
                Some(AttachPoint {
                    link: id,
                    tag: WORLD_TAG.to_string(),
                    handle: world,
                })
            }
            ObjectKind::Component => self.attach_point(self.root_container(id)?),
            ObjectKind::Display => {
                let name = self.objects.blueprint_of(id)?;
                match self.blueprints.tag_kind(&name)? {
                    TagKind::Display(caps) if caps.holds_nodes() => Some(AttachPoint {
                        link: id,
                        tag: name,
                        handle: self.objects.lookup(id)?,
                    }),
                    _ => None,
                }
            }
            ObjectKind::Support => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{self, HeadlessScene, PlainComponent};
    use crate::engine::handle;
    use crate::store::Action;
    use crate::template::NodeDescriptor;

    #[test]
    fn test_duplicate_registration_is_rejected_across_kinds() {
        let app = headless::application();
        let err = app
            .register_component(ComponentBlueprint::new(
                "Image",
                || handle(PlainComponent::default()),
                NodeDescriptor::new("Container"),
            ))
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateRegistration("Image".into()));
        assert!(app.blueprints().component("Image").is_none());
        assert_eq!(app.take_diagnostics().len(), 1);
        assert!(app.diagnostics().is_empty());
    }

    #[test]
    fn test_getter_refresh_after_dispatch() {
        let app = headless::application();
        app.store().add_slice("score", 0, |state, action| match action.kind.as_str() {
            "add" => Value::Int(state.as_int().unwrap_or(0) + action.payload.as_int().unwrap_or(0)),
            _ => state.clone(),
        });
        let scene = headless::bare_scene(&app, ActiveProperties::new().getter("score", "score"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        app.view_models().add_dependency(
            scene,
            "score",
            Rc::new(move |_: &Application, value: &Value| sink.borrow_mut().push(value.clone())),
        );

        assert_eq!(app.dispatch(&Action::new("add", 4)), 1);
        assert_eq!(app.dispatch(&Action::new("noop", 0)), 0);
        assert_eq!(app.get(scene, "score"), Value::Int(4));
        assert_eq!(*seen.borrow(), vec![Value::Int(4)]);
        assert!(app.set(scene, "score", Value::Int(1)).is_err());
    }

    #[test]
    fn test_boot_registers_scenes_and_jump_clears_previous() {
        let app = headless::application();
        for name in ["Intro", "Menu"] {
            app.register_scene(SceneBlueprint::new(
                name,
                |_| handle(HeadlessScene::new()),
                NodeDescriptor::new("Scene").child(NodeDescriptor::new("Container")),
            ))
            .expect("register");
        }

        let intro = app.boot("Intro").expect("boot");
        let menu = app.jump("Menu", JumpFlags::CLEAR_WORLD).expect("jump");

        assert!(!app.is_live(intro));
        assert_eq!(app.current_scene(), Some(("Menu".to_string(), menu)));
        assert_eq!(app.live_count(), 2);
        assert!(app.backend().world().is_some());
    }

    #[test]
    fn test_unknown_scene_keeps_current() {
        let app = headless::application();
        let scene = headless::bare_scene(&app, ActiveProperties::new());
        assert!(app.jump("Nowhere", JumpFlags::CLEAR_WORLD).is_err());
        assert!(app.is_live(scene));
    }

    #[test]
    fn test_assign_prefers_view_model() {
        let app = headless::application();
        let scene = headless::bare_scene(&app, ActiveProperties::new().prop("title"));
        app.assign(scene, "title", Value::from("Hi"));
        app.assign(scene, "subtitle", Value::from("plain"));
        assert_eq!(app.get(scene, "title"), Value::from("Hi"));
        assert_eq!(app.get(scene, "subtitle"), Value::from("plain"));
        assert!(app.view_models().category(scene, "subtitle").is_none());
    }

    #[test]
    fn test_broken_scene_keeps_current() {
        let app = headless::application();
        let main = headless::bare_scene(&app, ActiveProperties::new());
        app.register_scene(SceneBlueprint::new(
            "Broken",
            |_| handle(HeadlessScene::new()),
            NodeDescriptor::new("Container"),
        ))
        .expect("register");

        let err = app.jump("Broken", JumpFlags::CLEAR_WORLD).unwrap_err();
        assert!(matches!(err, BuildError::WrongRoot { .. }));
        assert!(app.is_live(main));
        assert_eq!(app.current_scene().map(|(_, id)| id), Some(main));
    }

    #[test]
    fn test_partially_built_scene_is_cleared_by_next_jump() {
        let app = headless::application();
        app.register_scene(SceneBlueprint::new(
            "Bad",
            |_| handle(HeadlessScene::new()),
            NodeDescriptor::new("Scene")
                .child(NodeDescriptor::new("Container"))
                .child(NodeDescriptor::new("Image").literal("x", 0).literal("y", 0)),
        ))
        .expect("register");
        app.register_scene(SceneBlueprint::new(
            "Good",
            |_| handle(HeadlessScene::new()),
            NodeDescriptor::new("Scene"),
        ))
        .expect("register");

        assert!(app.jump("Bad", JumpFlags::CLEAR_WORLD).is_err());
        let bad = app.instances_of("Bad");
        assert_eq!(bad.len(), 1);
        assert_eq!(app.current_scene(), Some(("Bad".to_string(), bad[0])));
        assert_eq!(app.live_count(), 2);

        let good = app.jump("Good", JumpFlags::CLEAR_WORLD).expect("jump");
        assert!(app.instances_of("Bad").is_empty());
        assert_eq!(app.live_count(), 1);
        assert_eq!(app.current_scene(), Some(("Good".to_string(), good)));
    }
}
