//! # Process Registry
//!
//! Process-wide name -> [`Group`] table, so independently constructed
//! components (a server dispatch loop, a CLI) can reach a group by name
//! without threading an explicit handle through every call site.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::group::Group;

fn registry() -> &'static RwLock<HashMap<String, Arc<Group>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Group>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `group` under its own name, replacing any prior group with
/// that name. Re-registration silently replaces rather than erroring.
pub fn register(group: Arc<Group>) {
    registry().write().insert(group.name().to_string(), group);
}

/// Looks up a previously registered group by name.
pub fn get(name: &str) -> Option<Arc<Group>> {
    registry().read().get(name).cloned()
}

/// Removes a group from the registry, returning it if present.
pub fn unregister(name: &str) -> Option<Arc<Group>> {
    registry().write().remove(name)
}
