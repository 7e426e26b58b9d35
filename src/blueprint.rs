//! Blueprints - registered pairing of a kind name with its constructor.
//!
//! | kind      | constructor input                               | template |
//! |-----------|-------------------------------------------------|----------|
//! | scene     | backend                                         | `<Scene>` root |
//! | component | nothing                                         | single container root |
//! | display   | backend, required attrs, optional attrs, id     | - |
//! | support   | backend, target, required attrs, optional attrs, id | - |
//!
//! Names are unique across node kinds: a template tag resolves to exactly one
//! blueprint.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::backend::{Backend, NodeCaps};
use crate::engine::{ActiveProperties, ObjectHandle};
use crate::template::NodeDescriptor;
use crate::types::{ObjectId, Value};

/// Evaluated attributes handed to a constructor.
pub type Attributes = BTreeMap<String, Value>;

pub type SceneCtor = Rc<dyn Fn(&mut dyn Backend) -> ObjectHandle>;
pub type ComponentCtor = Rc<dyn Fn() -> ObjectHandle>;
pub type DisplayCtor = Rc<dyn Fn(&mut dyn Backend, &Attributes, &Attributes, ObjectId) -> ObjectHandle>;
pub type SupportCtor =
    Rc<dyn Fn(&mut dyn Backend, &ObjectHandle, &Attributes, &Attributes, ObjectId) -> ObjectHandle>;

/// Tag of the single root element of a scene template.
pub const SCENE_TAG: &str = "Scene";

// =============================================================================
// Blueprint kinds
// =============================================================================

pub struct SceneBlueprint {
    pub name: String,
    pub ctor: SceneCtor,
    pub template: Rc<NodeDescriptor>,
    pub props: ActiveProperties,
}

impl SceneBlueprint {
    pub fn new(
        name: impl Into<String>,
        ctor: impl Fn(&mut dyn Backend) -> ObjectHandle + 'static,
        template: NodeDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            ctor: Rc::new(ctor),
            template: Rc::new(template),
            props: ActiveProperties::new(),
        }
    }

    pub fn props(mut self, props: ActiveProperties) -> Self {
        self.props = props;
        self
    }
}

pub struct ComponentBlueprint {
    pub name: String,
    pub ctor: ComponentCtor,
    pub template: Rc<NodeDescriptor>,
    pub props: ActiveProperties,
}

impl ComponentBlueprint {
    pub fn new(
        name: impl Into<String>,
        ctor: impl Fn() -> ObjectHandle + 'static,
        template: NodeDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            ctor: Rc::new(ctor),
            template: Rc::new(template),
            props: ActiveProperties::new(),
        }
    }

    pub fn props(mut self, props: ActiveProperties) -> Self {
        self.props = props;
        self
    }
}

pub struct DisplayBlueprint {
    pub name: String,
    pub ctor: DisplayCtor,
    pub require: Vec<String>,
    pub optional: Vec<String>,
    pub caps: NodeCaps,
}

impl DisplayBlueprint {
    pub fn new(
        name: impl Into<String>,
        ctor: impl Fn(&mut dyn Backend, &Attributes, &Attributes, ObjectId) -> ObjectHandle + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ctor: Rc::new(ctor),
            require: Vec::new(),
            optional: Vec::new(),
            caps: NodeCaps::empty(),
        }
    }

    pub fn require<I: IntoIterator<Item = S>, S: Into<String>>(mut self, attrs: I) -> Self {
        self.require.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn optional<I: IntoIterator<Item = S>, S: Into<String>>(mut self, attrs: I) -> Self {
        self.optional.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn caps(mut self, caps: NodeCaps) -> Self {
        self.caps = caps;
        self
    }
}

pub struct SupportBlueprint {
    pub name: String,
    pub ctor: SupportCtor,
    pub require: Vec<String>,
    pub optional: Vec<String>,
}

impl SupportBlueprint {
    pub fn new(
        name: impl Into<String>,
        ctor: impl Fn(&mut dyn Backend, &ObjectHandle, &Attributes, &Attributes, ObjectId) -> ObjectHandle + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ctor: Rc::new(ctor),
            require: Vec::new(),
            optional: Vec::new(),
        }
    }

    pub fn require<I: IntoIterator<Item = S>, S: Into<String>>(mut self, attrs: I) -> Self {
        self.require.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn optional<I: IntoIterator<Item = S>, S: Into<String>>(mut self, attrs: I) -> Self {
        self.optional.extend(attrs.into_iter().map(Into::into));
        self
    }
}

/// What a template tag resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Component,
    Display(NodeCaps),
    Support,
}

/// Live state of one component instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentRecord {
    /// Root container of the component's display subtree.
    pub root: Option<ObjectId>,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct Blueprints {
    scenes: RefCell<HashMap<String, Rc<SceneBlueprint>>>,
    components: RefCell<HashMap<String, Rc<ComponentBlueprint>>>,
    displays: RefCell<HashMap<String, Rc<DisplayBlueprint>>>,
    supports: RefCell<HashMap<String, Rc<SupportBlueprint>>>,
    /// Live instances per component/scene blueprint.
    instances: RefCell<HashMap<String, BTreeMap<ObjectId, ComponentRecord>>>,
}

impl Blueprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `name` is taken by any kind.
    pub fn is_registered(&self, name: &str) -> bool {
        self.scenes.borrow().contains_key(name)
            || self.components.borrow().contains_key(name)
            || self.displays.borrow().contains_key(name)
            || self.supports.borrow().contains_key(name)
    }

    pub fn insert_scene(&self, blueprint: SceneBlueprint) {
        self.instances.borrow_mut().entry(blueprint.name.clone()).or_default();
        self.scenes
            .borrow_mut()
            .insert(blueprint.name.clone(), Rc::new(blueprint));
    }

    pub fn insert_component(&self, blueprint: ComponentBlueprint) {
        self.instances.borrow_mut().entry(blueprint.name.clone()).or_default();
        self.components
            .borrow_mut()
            .insert(blueprint.name.clone(), Rc::new(blueprint));
    }

    pub fn insert_display(&self, blueprint: DisplayBlueprint) {
        self.displays
            .borrow_mut()
            .insert(blueprint.name.clone(), Rc::new(blueprint));
    }

    pub fn insert_support(&self, blueprint: SupportBlueprint) {
        self.supports
            .borrow_mut()
            .insert(blueprint.name.clone(), Rc::new(blueprint));
    }

    pub fn scene(&self, name: &str) -> Option<Rc<SceneBlueprint>> {
        self.scenes.borrow().get(name).cloned()
    }

    pub fn component(&self, name: &str) -> Option<Rc<ComponentBlueprint>> {
        self.components.borrow().get(name).cloned()
    }

    pub fn display(&self, name: &str) -> Option<Rc<DisplayBlueprint>> {
        self.displays.borrow().get(name).cloned()
    }

    pub fn support(&self, name: &str) -> Option<Rc<SupportBlueprint>> {
        self.supports.borrow().get(name).cloned()
    }

    pub fn scene_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scenes.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn remove_component(&self, name: &str) -> Option<Rc<ComponentBlueprint>> {
        self.instances.borrow_mut().remove(name);
        self.components.borrow_mut().remove(name)
    }

    /// Resolve a template tag.
    pub fn tag_kind(&self, name: &str) -> Option<TagKind> {
        if self.components.borrow().contains_key(name) {
            return Some(TagKind::Component);
        }
        if let Some(display) = self.displays.borrow().get(name) {
            return Some(TagKind::Display(display.caps));
        }
        if self.supports.borrow().contains_key(name) {
            return Some(TagKind::Support);
        }
        None
    }

    // =========================================================================
    // Instance maps
    // =========================================================================

    pub fn track_instance(&self, blueprint: &str, id: ObjectId) {
        self.instances
            .borrow_mut()
            .entry(blueprint.to_string())
            .or_default()
            .insert(id, ComponentRecord::default());
    }

    pub fn untrack_instance(&self, blueprint: &str, id: ObjectId) -> Option<ComponentRecord> {
        self.instances.borrow_mut().get_mut(blueprint)?.remove(&id)
    }

    pub fn set_root(&self, blueprint: &str, id: ObjectId, root: ObjectId) {
        if let Some(record) = self
            .instances
            .borrow_mut()
            .get_mut(blueprint)
            .and_then(|m| m.get_mut(&id))
        {
            record.root = Some(root);
        }
    }

    pub fn record(&self, blueprint: &str, id: ObjectId) -> Option<ComponentRecord> {
        self.instances.borrow().get(blueprint)?.get(&id).cloned()
    }

    /// Live instance ids of a blueprint, in build order.
    pub fn instances_of(&self, blueprint: &str) -> Vec<ObjectId> {
        self.instances
            .borrow()
            .get(blueprint)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every registered component blueprint name.
    pub fn component_names(&self) -> Vec<String> {
        let components = self.components.borrow();
        let mut names: Vec<String> = components.keys().cloned().collect();
        names.sort();
        names
    }
}
