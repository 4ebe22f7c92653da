//! Process-wide model cache
//!
//! Handles are inserted on first use and kept for the lifetime of the
//! process. Each key owns a slot with its own load lock, so concurrent first
//! requests for the same model wait for a single load while other keys keep
//! loading in parallel.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

struct Slot<V> {
    value: OnceLock<V>,
    loading: Mutex<()>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }
}

pub struct ModelCache<V> {
    slots: Mutex<HashMap<String, Arc<Slot<V>>>>,
}

// A panic inside a loader must not take the whole cache down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V: Clone> ModelCache<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle stored under `key`, running `loader` if there is none.
    ///
    /// A failed load stores nothing and the error goes back to the caller;
    /// the next request for the key runs its loader again.
    pub fn get_or_load<E, F>(&self, key: &str, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        if let Some(value) = slot.value.get() {
            debug!("model cache hit: {}", key);
            return Ok(value.clone());
        }

        let _loading = lock(&slot.loading);
        // another caller may have finished while we waited
        if let Some(value) = slot.value.get() {
            debug!("model cache hit after wait: {}", key);
            return Ok(value.clone());
        }

        let value = loader()?;
        let _ = slot.value.set(value.clone());
        Ok(value)
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|slot| slot.value.get().is_some())
    }

    /// Number of loaded handles.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| slot.value.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the loaded handles, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.slots)
            .iter()
            .filter(|(_, slot)| slot.value.get().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn slot(&self, key: &str) -> Arc<Slot<V>> {
        lock(&self.slots)
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

impl<V: Clone> Default for ModelCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
