//! Content-addressed cache of parsed remapper definitions

use crate::definition::Remapper;
use crate::error::DefinitionError;
use blake3::Hasher as Blake3Hasher;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Compute the fingerprint of a definition.
///
/// Hashes the compact JSON rendering with Blake3. Object key order is part of
/// the fingerprint since it determines `object.from` output order.
pub fn fingerprint(definition: &Value) -> String {
    let mut hasher = Blake3Hasher::new();
    hasher.update(definition.to_string().as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

/// Parsed definitions keyed by fingerprint.
///
/// Apps evaluate the same handful of definitions for every record they
/// render; the cache lets them pay for parsing and regex compilation once.
/// Safe to share between threads.
#[derive(Debug, Default)]
pub struct RemapperCache {
    entries: RwLock<HashMap<String, Arc<Remapper>>>,
}

impl RemapperCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed definition, parsing and storing it on first use.
    ///
    /// Rejected definitions are not cached.
    pub fn get_or_parse(&self, definition: &Value) -> Result<Arc<Remapper>, DefinitionError> {
        let key = fingerprint(definition);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(remapper) = entries.get(&key) {
                return Ok(Arc::clone(remapper));
            }
        }

        let remapper = Arc::new(Remapper::parse(definition)?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(entries.entry(key).or_insert(remapper)))
    }

    pub fn contains(&self, definition: &Value) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(&fingerprint(definition))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_deterministic() {
        let definition = json!([{"prop": "name"}]);
        assert_eq!(fingerprint(&definition), fingerprint(&definition.clone()));
        assert_eq!(fingerprint(&definition).len(), 64);
        assert_ne!(fingerprint(&definition), fingerprint(&json!([{"prop": "title"}])));
    }

    #[test]
    fn test_fingerprint_key_order_matters() {
        let a: Value = serde_json::from_str(r#"[{"object.from": {"a": 1, "b": 2}}]"#).unwrap();
        let b: Value = serde_json::from_str(r#"[{"object.from": {"b": 2, "a": 1}}]"#).unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_cache_reuses_entries() {
        let cache = RemapperCache::new();
        let definition = json!([{"prop": "name"}]);

        let first = cache.get_or_parse(&definition).unwrap();
        let second = cache.get_or_parse(&definition).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&definition));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_skips_invalid_definitions() {
        let cache = RemapperCache::new();
        assert!(cache.get_or_parse(&json!([{"prop": "a", "static": 1}])).is_err());
        assert!(cache.is_empty());
    }
}
