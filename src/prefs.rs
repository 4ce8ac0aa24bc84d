// Browser-local preferences. Only one exists: whether the onboarding tutorial
// was dismissed.

use std::collections::HashMap;

use crate::error::MapError;

pub const TUTORIAL_SEEN_KEY: &str = "tutorialSeen";

/// Minimal key/value persistence (browser local storage in production).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), MapError>;
}

/// `window.localStorage`. Unavailable storage (private mode, no window) reads
/// as empty and rejects writes.
pub struct LocalStorage {
    storage: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        LocalStorage { storage }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), MapError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| MapError::Storage("local storage unavailable".to_string()))?;
        storage
            .set_item(key, value)
            .map_err(|e| MapError::Storage(format!("write failed: {e:?}")))
    }
}

/// In-memory store for native builds and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), MapError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The tutorial is a mobile-only first-run overlay.
pub fn should_show_tutorial(store: &impl KeyValueStore, is_mobile: bool) -> bool {
    is_mobile && store.get(TUTORIAL_SEEN_KEY).is_none()
}

pub fn dismiss_tutorial(store: &mut impl KeyValueStore) -> Result<(), MapError> {
    store.set(TUTORIAL_SEEN_KEY, "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tutorial_shown_once_on_mobile() {
        let mut store = MemoryStore::default();
        assert!(should_show_tutorial(&store, true));
        assert!(!should_show_tutorial(&store, false));

        dismiss_tutorial(&mut store).unwrap();
        assert!(!should_show_tutorial(&store, true));
        assert_eq!(store.get(TUTORIAL_SEEN_KEY).as_deref(), Some("true"));
    }
}
