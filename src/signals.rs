//! Signal Registry: resolves the named "signal" values a method needs
//! before it can execute against a chunk.
//!
//! A signal is any pre-computed fact attached to a chunk (an extracted
//! table, a section reference, a compliance flag) that a method declares a
//! dependency on by name. Resolution must be all-or-nothing: if any
//! declared signal is missing, the question fails to route rather than
//! running with partial context.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// One resolved signal requirement: the type name plus its value.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequirement {
    pub signal_type: String,
    pub value: Value,
}

/// Per-chunk signal store. Three lookup strategies are tried in order:
/// an explicit keyed map, a small set of named well-known fields, then a
/// catch-all extras bag.
#[derive(Debug, Clone, Default)]
pub struct ChunkSignals {
    keyed: HashMap<String, Value>,
    named_fields: HashMap<String, Value>,
    extras: HashMap<String, Value>,
}

impl ChunkSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyed(mut self, signal_type: impl Into<String>, value: Value) -> Self {
        self.keyed.insert(signal_type.into(), value);
        self
    }

    pub fn with_named_field(mut self, signal_type: impl Into<String>, value: Value) -> Self {
        self.named_fields.insert(signal_type.into(), value);
        self
    }

    pub fn with_extra(mut self, signal_type: impl Into<String>, value: Value) -> Self {
        self.extras.insert(signal_type.into(), value);
        self
    }

    fn lookup(&self, signal_type: &str) -> Option<&Value> {
        self.keyed
            .get(signal_type)
            .or_else(|| self.named_fields.get(signal_type))
            .or_else(|| self.extras.get(signal_type))
    }
}

/// Registry of per-chunk signal stores, keyed by `chunk_id`.
#[derive(Debug, Default)]
pub struct SignalRegistry {
    chunks: HashMap<String, ChunkSignals>,
    cache: std::sync::Mutex<HashMap<(String, String), Vec<SignalRequirement>>>,
}

impl Clone for SignalRegistry {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
            cache: std::sync::Mutex::new(self.cache.lock().unwrap().clone()),
        }
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
            cache: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn register_chunk(&mut self, chunk_id: impl Into<String>, signals: ChunkSignals) {
        self.chunks.insert(chunk_id.into(), signals);
    }

    /// Resolve every signal type a question requires against one chunk.
    ///
    /// Empty requirement lists resolve to an empty vector without touching
    /// the chunk store. The resolution cache is keyed by `(chunk_id,
    /// signal_set_digest)`, not by chunk id alone, so two questions routed
    /// to the same chunk but declaring different signal sets never collide.
    pub fn resolve(
        &self,
        question_id: &str,
        chunk_id: &str,
        signal_types: &[String],
    ) -> Result<Vec<SignalRequirement>> {
        if signal_types.is_empty() {
            return Ok(Vec::new());
        }

        let digest = crate::hashing::blake3_hex(signal_types.join("\u{1}").as_bytes());
        let cache_key = (chunk_id.to_string(), digest);
        if let Some(hit) = self.cache.lock().unwrap().get(&cache_key) {
            return Ok(hit.clone());
        }

        let chunk = self.chunks.get(chunk_id).ok_or_else(|| {
            Error::signal_missing(question_id, signal_types.first().cloned().unwrap_or_default())
        })?;

        let mut resolved = Vec::with_capacity(signal_types.len());
        for signal_type in signal_types {
            let value = chunk
                .lookup(signal_type)
                .ok_or_else(|| Error::signal_missing(question_id, signal_type.clone()))?
                .clone();
            resolved.push(SignalRequirement {
                signal_type: signal_type.clone(),
                value,
            });
        }

        self.cache.lock().unwrap().insert(cache_key, resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_requirements_resolve_without_lookup() {
        let registry = SignalRegistry::new();
        let resolved = registry.resolve("Q1", "missing-chunk", &[]).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolves_across_all_three_stores() {
        let mut registry = SignalRegistry::new();
        let signals = ChunkSignals::new()
            .with_keyed("has_budget_table", json!(true))
            .with_named_field("section_ref", json!("3.2"))
            .with_extra("raw_note", json!("ok"));
        registry.register_chunk("PA01-DIM01", signals);

        let resolved = registry
            .resolve(
                "Q1",
                "PA01-DIM01",
                &[
                    "has_budget_table".to_string(),
                    "section_ref".to_string(),
                    "raw_note".to_string(),
                ],
            )
            .unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_missing_signal_is_hard_fail() {
        let mut registry = SignalRegistry::new();
        registry.register_chunk("PA01-DIM01", ChunkSignals::new());
        let err = registry
            .resolve("Q1", "PA01-DIM01", &["nonexistent".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::SignalMissing { .. }));
    }

    #[test]
    fn test_cache_keyed_by_chunk_and_signal_set_not_chunk_alone() {
        let mut registry = SignalRegistry::new();
        let signals = ChunkSignals::new().with_keyed("a", json!(1)).with_keyed("b", json!(2));
        registry.register_chunk("C1", signals);

        let first = registry.resolve("Q1", "C1", &["a".to_string()]).unwrap();
        let second = registry.resolve("Q2", "C1", &["b".to_string()]).unwrap();
        assert_eq!(first[0].signal_type, "a");
        assert_eq!(second[0].signal_type, "b");
    }
}
