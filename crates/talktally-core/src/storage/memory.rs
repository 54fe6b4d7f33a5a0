//! In-memory key/value store.

use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::DatabaseError;

/// `HashMap`-backed store for tests and embedders that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.map.get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), DatabaseError> {
        for (key, value) in entries {
            self.map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DatabaseError> {
        self.map.clear();
        Ok(())
    }
}
