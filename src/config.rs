//! Application configuration.
//!
//! Defaults suit interactive use; hosts that ship a config file load it as
//! JSON with [`AppConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::backend::JumpFlags;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum nesting of dependency dispatch. A write at this depth is
    /// rejected, which breaks cross-property cycles deep equality cannot.
    pub max_dispatch_depth: usize,
    /// Report attribute expressions that evaluate to `Undefined`.
    pub warn_undefined_attributes: bool,
    /// Default for [`Application::jump`](crate::Application::jump): clear the previous world.
    pub clear_world_on_jump: bool,
    /// Default for [`Application::jump`](crate::Application::jump): clear the backend cache.
    pub clear_cache_on_jump: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 64,
            warn_undefined_attributes: true,
            clear_world_on_jump: true,
            clear_cache_on_jump: false,
        }
    }
}

impl AppConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Jump flags implied by the `clear_*_on_jump` fields.
    pub fn jump_flags(&self) -> JumpFlags {
        let mut flags = JumpFlags::empty();
        if self.clear_world_on_jump {
            flags |= JumpFlags::CLEAR_WORLD;
        }
        if self.clear_cache_on_jump {
            flags |= JumpFlags::CLEAR_CACHE;
        }
        flags
    }
}
