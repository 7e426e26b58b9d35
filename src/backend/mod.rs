//! Rendering backend seam.
//!
//! The engine does not draw anything. It needs three things from a backend:
//! - a world container per active scene (`set_world` / `world`)
//! - scene transitions (`register_scene` / `jump`)
//! - an add-call on container-capable instances ([`Instance::add_child`])
//!
//! [`headless`] is a complete in-memory backend used by tests and demos.
//!
//! [`Instance::add_child`]: crate::engine::Instance::add_child

pub mod headless;

use crate::engine::ObjectHandle;

bitflags::bitflags! {
    /// What a scene transition clears.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JumpFlags: u8 {
        const CLEAR_WORLD = 1 << 0;
        const CLEAR_CACHE = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Capabilities of a display-object blueprint.
    ///
    /// Only containers and shadows may hold components or other display
    /// objects; every display object may hold support objects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeCaps: u8 {
        const CONTAINER = 1 << 0;
        const SHADOW = 1 << 1;
    }
}

impl NodeCaps {
    /// True when component and display children are allowed.
    pub fn holds_nodes(self) -> bool {
        self.intersects(NodeCaps::CONTAINER | NodeCaps::SHADOW)
    }
}

pub trait Backend {
    /// Called once per registered scene when the application boots.
    fn register_scene(&mut self, _name: &str) {}

    /// Make `world` the active world container.
    fn set_world(&mut self, world: ObjectHandle);

    fn world(&self) -> Option<ObjectHandle>;

    /// Switch to scene `name`.
    fn jump(&mut self, name: &str, flags: JumpFlags);
}
