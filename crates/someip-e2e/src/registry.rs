//! Process-wide registry of E2E profiles, keyed by id and by name (§4.4).
//!
//! Mirrors the bidirectional-lookup shape used elsewhere in this codebase
//! for per-key state tracking: register once at startup, then treat the
//! registry as read-only for lookups from any thread.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{E2eError, Result};
use crate::profile::Profile;
use crate::reference::ReferenceProfile;

/// Owns all registered [`Profile`] implementations for the process.
pub struct ProfileRegistry {
    by_id: HashMap<u32, Arc<dyn Profile>>,
    name_to_id: HashMap<String, u32>,
}

impl ProfileRegistry {
    /// An empty registry with no profiles registered.
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// A registry preloaded with the shipped reference profile.
    // INVARIANT: a freshly constructed registry has no entries, so the
    // reference profile's id/name cannot already be taken.
    #[allow(clippy::expect_used, reason = "a fresh registry cannot have a duplicate")]
    pub fn with_reference_profile() -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(ReferenceProfile::new()))
            .expect("reference profile id/name are unique in a fresh registry");
        registry
    }

    /// Registers `profile`. Fails if its id or name is already taken.
    pub fn register(&mut self, profile: Arc<dyn Profile>) -> Result<()> {
        if self.by_id.contains_key(&profile.id()) {
            return Err(E2eError::DuplicateProfile(format!(
                "profile id {} already registered",
                profile.id()
            )));
        }
        if self.name_to_id.contains_key(profile.name()) {
            return Err(E2eError::DuplicateProfile(format!(
                "profile name {:?} already registered",
                profile.name()
            )));
        }
        self.name_to_id.insert(profile.name().to_string(), profile.id());
        self.by_id.insert(profile.id(), profile);
        Ok(())
    }

    /// Looks up a profile by numeric id.
    pub fn lookup_by_id(&self, id: u32) -> Result<Arc<dyn Profile>> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| E2eError::NotInitialized(format!("no profile registered for id {id}")))
    }

    /// Looks up a profile by name.
    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<dyn Profile>> {
        let id = self.name_to_id.get(name).copied().ok_or_else(|| {
            E2eError::NotInitialized(format!("no profile registered for name {name:?}"))
        })?;
        self.lookup_by_id(id)
    }

    /// The shipped reference profile, registering it on first use.
    pub fn default_profile() -> Arc<dyn Profile> {
        Arc::new(ReferenceProfile::new())
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}
