//! Headless backend - an in-memory rendering backend.
//!
//! Nothing is drawn; every object just records its attributes and children.
//! Useful for tests, tooling and server-side construction of scene graphs.
//!
//! Registered kinds (see [`install`]):
//!
//! | tag       | kind    | required        | optional |
//! |-----------|---------|-----------------|----------|
//! | Container | display (container) | - | - |
//! | Shadow    | display (shadow)    | - | - |
//! | Image     | display | x, y, key       | frame |
//! | Mask      | support | x, y            | - |
//! | Slot      | support | name            | - |
//!
//! Containers and shadows honour `repeat_count` / `repeat_name` setters.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{Backend, JumpFlags, NodeCaps};
use crate::app::Application;
use crate::blueprint::{Attributes, DisplayBlueprint, SupportBlueprint};
use crate::engine::{handle, Instance, ObjectHandle, Repeat};
use crate::types::{ObjectId, Value};

// =============================================================================
// Backend
// =============================================================================

/// What the headless backend was asked to do.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub registered: Vec<String>,
    pub jumps: Vec<(String, JumpFlags)>,
    pub worlds_set: usize,
}

#[derive(Default)]
pub struct HeadlessBackend {
    world: Option<ObjectHandle>,
    log: Rc<RefCell<BackendLog>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the call log.
    pub fn log(&self) -> Rc<RefCell<BackendLog>> {
        Rc::clone(&self.log)
    }
}

impl Backend for HeadlessBackend {
    fn register_scene(&mut self, name: &str) {
        self.log.borrow_mut().registered.push(name.to_string());
    }

    fn set_world(&mut self, world: ObjectHandle) {
        self.world = Some(world);
        self.log.borrow_mut().worlds_set += 1;
    }

    fn world(&self) -> Option<ObjectHandle> {
        self.world.clone()
    }

    fn jump(&mut self, name: &str, flags: JumpFlags) {
        if flags.contains(JumpFlags::CLEAR_WORLD) {
            self.world = None;
        }
        self.log.borrow_mut().jumps.push((name.to_string(), flags));
    }
}

// =============================================================================
// Objects
// =============================================================================

/// Container or shadow: holds children in attach order.
#[derive(Debug, Default)]
pub struct HeadlessContainer {
    attrs: Attributes,
    children: Vec<ObjectId>,
    destroyed: bool,
}

impl HeadlessContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Instance for HeadlessContainer {
    fn set_attr(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }

    fn attr(&self, name: &str) -> Value {
        match name {
            "child_count" => Value::from(self.children.len()),
            _ => self.attrs.get(name).cloned().unwrap_or_default(),
        }
    }

    fn add_child(&mut self, id: ObjectId, _child: &ObjectHandle) -> bool {
        self.children.push(id);
        true
    }

    fn remove_child(&mut self, id: ObjectId) {
        self.children.retain(|child| *child != id);
    }

    fn repeat(&self) -> Option<Repeat> {
        let count = self.attrs.get("repeat_count")?.as_int()?;
        Some(Repeat {
            count: usize::try_from(count).unwrap_or(0),
            name: self
                .attrs
                .get("repeat_name")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.children.clear();
    }
}

/// Leaf display object or support object: a bag of attributes.
#[derive(Debug, Default)]
pub struct HeadlessObject {
    attrs: Attributes,
}

impl HeadlessObject {
    pub fn from_attrs(require: &Attributes, optional: &Attributes) -> Self {
        let mut attrs = require.clone();
        attrs.extend(optional.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { attrs }
    }
}

impl Instance for HeadlessObject {
    fn set_attr(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }

    fn attr(&self, name: &str) -> Value {
        self.attrs.get(name).cloned().unwrap_or_default()
    }

    fn destroy(&mut self) {
        self.attrs.insert("destroyed".to_string(), Value::Bool(true));
    }
}

/// Scene with its own world container.
pub struct HeadlessScene {
    world: ObjectHandle,
    attrs: Attributes,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            world: handle(HeadlessContainer::new()),
            attrs: BTreeMap::new(),
        }
    }

    /// Scene seeded with initial field values.
    pub fn with_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut scene = Self::new();
        scene.attrs = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        scene
    }
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Instance for HeadlessScene {
    fn set_attr(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }

    fn attr(&self, name: &str) -> Value {
        self.attrs.get(name).cloned().unwrap_or_default()
    }

    fn world(&self) -> Option<ObjectHandle> {
        Some(Rc::clone(&self.world))
    }
}

/// Component with plain fields and no behavior of its own.
#[derive(Debug, Default)]
pub struct PlainComponent {
    fields: Attributes,
}

impl PlainComponent {
    pub fn with_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl Instance for PlainComponent {
    fn set_attr(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    fn attr(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Installation
// =============================================================================

/// Register the headless display and support kinds on `app`.
pub fn install(app: &Application) {
    let results = [
        app.register_display_object(
            DisplayBlueprint::new("Container", |_, _, _, _| handle(HeadlessContainer::new()))
                .caps(NodeCaps::CONTAINER),
        ),
        app.register_display_object(
            DisplayBlueprint::new("Shadow", |_, _, _, _| handle(HeadlessContainer::new()))
                .caps(NodeCaps::SHADOW),
        ),
        app.register_display_object(
            DisplayBlueprint::new("Image", |_, require, optional, _| {
                handle(HeadlessObject::from_attrs(require, optional))
            })
            .require(["x", "y", "key"])
            .optional(["frame"]),
        ),
        app.register_support_object(
            SupportBlueprint::new("Mask", |_, _, require, optional, _| {
                handle(HeadlessObject::from_attrs(require, optional))
            })
            .require(["x", "y"]),
        ),
        app.register_support_object(
            SupportBlueprint::new("Slot", |_, _, require, optional, _| {
                handle(HeadlessObject::from_attrs(require, optional))
            })
            .require(["name"]),
        ),
    ];
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::debug!(failed, "headless kinds already registered");
    }
}

/// Application on a fresh headless backend with the headless kinds installed.
pub fn application() -> Application {
    let app = Application::new(crate::AppConfig::default(), HeadlessBackend::new());
    install(&app);
    app
}

/// Build a template-less scene declaring `props` and return its id.
#[cfg(test)]
pub(crate) fn bare_scene(app: &Application, props: crate::ActiveProperties) -> ObjectId {
    use crate::blueprint::SceneBlueprint;
    use crate::template::NodeDescriptor;

    let name = format!("Bare{}", app.blueprints().scene_names().len());
    app.register_scene(
        SceneBlueprint::new(&name, |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene")).props(props),
    )
    .expect("fresh scene name");
    app.jump(&name, JumpFlags::empty()).expect("bare scene builds")
}
