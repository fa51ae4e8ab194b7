//! Container-lifetime cache of singleton products.

use std::collections::HashMap;

use crate::error::Error;
use crate::provider::ProviderId;
use crate::runtime::Store;
use crate::value::Value;

#[cfg(feature = "tracing")]
use tracing::trace;

/// Maps a singleton provider to the value it produced. Never evicted.
#[derive(Default)]
pub struct SingletonCache {
    entries: Store<HashMap<ProviderId, Value>>,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ProviderId) -> Option<Value> {
        let hit = self.entries.borrow().get(&id).cloned();

        #[cfg(feature = "tracing")]
        if hit.is_some() {
            trace!("Singleton cache hit for {}", id);
        }

        hit
    }

    /// The cached value of `id`, building and storing it on a miss.
    ///
    /// `build` runs without the cache borrowed, so it may resolve other
    /// singletons. If an entry for `id` appeared while it ran, that entry
    /// wins and the freshly built value is discarded.
    pub fn get_or_create(
        &self,
        id: ProviderId,
        build: impl FnOnce() -> Result<Value, Error>,
    ) -> Result<Value, Error> {
        if let Some(value) = self.get(id) {
            return Ok(value);
        }

        let value = build()?;
        Ok(self
            .entries
            .borrow_mut()
            .entry(id)
            .or_insert(value)
            .clone())
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
