//! The process-wide profile registry
//!
//! The registry is the only global state of the stack. It must be
//! initialized through [init] before the first protect or validate call so
//! the standard profile is available; further profiles can be registered at
//! any time.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::e2e::standard::StandardProfile;
use crate::e2e::{E2eConfig, E2eProfile};
use crate::error::StackError;

#[derive(Default)]
struct Registry {
    by_id: HashMap<u32, Arc<dyn E2eProfile>>,
    ids_by_name: HashMap<String, u32>,
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(RwLock::default)
}

/// Register the built-in standard profile as profile 0
///
/// Safe to call more than once; later calls keep the existing registration.
#[allow(clippy::unwrap_used)]
pub fn init() {
    let mut registry = registry().write().unwrap();
    if !registry.by_id.contains_key(&0) {
        let profile: Arc<dyn E2eProfile> = Arc::new(StandardProfile::new());
        registry.ids_by_name.insert(profile.name().to_string(), 0);
        registry.by_id.insert(0, profile);
    }
}

/// Register a profile under its id and name
///
/// Fails with [StackError::InvalidArgument] when either key is already
/// taken.
#[allow(clippy::unwrap_used)]
pub fn register(profile: Arc<dyn E2eProfile>) -> Result<(), StackError> {
    let mut registry = registry().write().unwrap();
    if registry.by_id.contains_key(&profile.id())
        || registry.ids_by_name.contains_key(profile.name())
    {
        return Err(StackError::InvalidArgument);
    }
    registry
        .ids_by_name
        .insert(profile.name().to_string(), profile.id());
    registry.by_id.insert(profile.id(), profile);
    Ok(())
}

/// Remove a profile by id, dropping its name entry as well
#[allow(clippy::unwrap_used)]
pub fn unregister(id: u32) -> Result<(), StackError> {
    let mut registry = registry().write().unwrap();
    let profile = registry
        .by_id
        .remove(&id)
        .ok_or(StackError::InvalidArgument)?;
    registry.ids_by_name.remove(profile.name());
    Ok(())
}

/// Look up the profile a configuration selects
///
/// Resolution is by id first, falling back to the name. An empty registry
/// reports [StackError::NotInitialized] since not even the standard profile
/// was set up yet.
#[allow(clippy::unwrap_used)]
pub fn lookup(config: &E2eConfig) -> Result<Arc<dyn E2eProfile>, StackError> {
    let registry = registry().read().unwrap();
    if registry.by_id.is_empty() {
        return Err(StackError::NotInitialized);
    }
    if let Some(profile) = registry.by_id.get(&config.profile_id) {
        return Ok(Arc::clone(profile));
    }
    registry
        .ids_by_name
        .get(&config.profile_name)
        .and_then(|id| registry.by_id.get(id))
        .map(Arc::clone)
        .ok_or(StackError::InvalidArgument)
}
