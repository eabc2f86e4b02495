//! Named cache of decoded sounds.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::EngineError;
use crate::source::cached::CachedSound;

/// Name to [`CachedSound`] map, written at registration and read on play.
#[derive(Debug, Default)]
pub struct SoundRegistry {
    sounds: RwLock<HashMap<String, Arc<CachedSound>>>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sound under a new name.
    ///
    /// # Errors
    /// [`EngineError::DuplicateName`] if the name is taken; the existing
    /// entry is kept.
    pub fn insert(&self, name: &str, sound: Arc<CachedSound>) -> Result<(), EngineError> {
        let mut sounds = self.write();
        if sounds.contains_key(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        sounds.insert(name.to_string(), sound);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<CachedSound>, EngineError> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NameNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every entry. Cursors already playing keep their sound alive.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<CachedSound>>> {
        self.sounds.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<CachedSound>>> {
        self.sounds.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::AudioFormat;

    fn sound(len: usize) -> Arc<CachedSound> {
        Arc::new(CachedSound::from_samples(
            AudioFormat::new(22_050, 1),
            vec![0.0; len],
        ))
    }

    #[test]
    fn duplicate_names_keep_the_first_entry() {
        let registry = SoundRegistry::new();
        registry.insert("jump", sound(4)).unwrap();
        let err = registry.insert("jump", sound(8)).err().unwrap();
        assert!(matches!(err, EngineError::DuplicateName(ref name) if name == "jump"));
        assert_eq!(registry.get("jump").unwrap().len(), 4);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_names_are_reported() {
        let registry = SoundRegistry::new();
        let err = registry.get("coin").err().unwrap();
        assert!(matches!(err, EngineError::NameNotFound(ref name) if name == "coin"));
        assert!(!registry.contains("coin"));
    }

    #[test]
    fn names_are_sorted_and_clear_empties() {
        let registry = SoundRegistry::new();
        registry.insert("b", sound(1)).unwrap();
        registry.insert("a", sound(1)).unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

        let held = registry.get("a").unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(held.len(), 1);
    }
}
