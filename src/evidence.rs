//! Evidence Registry & Provenance DAG: an append-only, content-addressed
//! record of every method outcome, chained per task and linked across
//! tasks wherever one task's output was consumed as another's signal
//! input.
//!
//! A DAG of nodes and labeled edges with id-based lookup, using
//! content-addressed record ids and per-task hash chains instead of
//! randomly generated node ids.

use crate::error::{Error, Result};
use crate::hashing;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One append-only evidence record: a method outcome plus its position in
/// its task's hash chain. `record_id` is the content hash of every field
/// below except itself and `head_hash` — the chain fields are excluded so
/// the record's identity reflects only what happened, not where it landed
/// in the chain.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceRecord {
    pub record_id: String,
    pub task_id: String,
    pub method_id: String,
    pub output_fingerprint: String,
    pub consumes: Vec<String>,
    pub head_hash: String,
}

#[derive(Serialize)]
struct RecordPayload<'a> {
    task_id: &'a str,
    method_id: &'a str,
    output_fingerprint: &'a str,
    consumes: &'a [String],
}

/// Append-only evidence registry with a provenance DAG over
/// consumes-edges. Cycle detection runs at assemble-time (when a record is
/// appended), not lazily — an attempt to append a record whose `consumes`
/// set would introduce a cycle is rejected immediately.
#[derive(Debug, Clone, Default)]
pub struct EvidenceRegistry {
    records: HashMap<String, EvidenceRecord>,
    heads_by_task: HashMap<String, String>,
    order: Vec<String>,
}

impl EvidenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. `consumes` names the record ids this record's
    /// computation depended on (evidence from other tasks' signals); each
    /// must already exist in the registry, and the resulting graph must
    /// stay acyclic.
    pub fn append(
        &mut self,
        task_id: &str,
        method_id: &str,
        output_fingerprint: &str,
        consumes: Vec<String>,
    ) -> Result<String> {
        for dep in &consumes {
            if !self.records.contains_key(dep) {
                return Err(Error::Integrity {
                    artifact: dep.clone(),
                    expected: "existing evidence record".to_string(),
                    actual: "not found in registry".to_string(),
                });
            }
        }

        let payload = RecordPayload {
            task_id,
            method_id,
            output_fingerprint,
            consumes: &consumes,
        };
        let record_id = hashing::blake3_of(&payload)?;

        if self.would_cycle(&record_id, &consumes) {
            return Err(Error::Integrity {
                artifact: record_id,
                expected: "acyclic provenance DAG".to_string(),
                actual: "appending this record would introduce a cycle".to_string(),
            });
        }

        let prev_head = self
            .heads_by_task
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| "genesis".to_string());
        let head_hash = hashing::chain_next(&prev_head, &record_id);

        let record = EvidenceRecord {
            record_id: record_id.clone(),
            task_id: task_id.to_string(),
            method_id: method_id.to_string(),
            output_fingerprint: output_fingerprint.to_string(),
            consumes,
            head_hash: head_hash.clone(),
        };

        self.records.insert(record_id.clone(), record);
        self.heads_by_task.insert(task_id.to_string(), head_hash);
        self.order.push(record_id.clone());
        Ok(record_id)
    }

    /// Depth-first reachability check: would adding an edge from
    /// `new_record_id` to each of `consumes` create a cycle? Since
    /// `new_record_id` does not exist yet, a cycle can only occur if one
    /// of the consumed records can already reach a record that names
    /// `new_record_id` — impossible for a freshly computed hash unless a
    /// hash collision occurred, so this also guards against id reuse from
    /// an earlier append.
    fn would_cycle(&self, new_record_id: &str, consumes: &[String]) -> bool {
        if consumes.iter().any(|c| c == new_record_id) {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack: Vec<String> = consumes.to_vec();
        while let Some(current) = stack.pop() {
            if current == new_record_id {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(record) = self.records.get(&current) {
                stack.extend(record.consumes.iter().cloned());
            }
        }
        false
    }

    pub fn record(&self, record_id: &str) -> Option<&EvidenceRecord> {
        self.records.get(record_id)
    }

    pub fn head_for_task(&self, task_id: &str) -> Option<&str> {
        self.heads_by_task.get(task_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in append order, the canonical ordering for provenance
    /// replay and proof construction.
    pub fn records_in_order(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.order.iter().filter_map(move |id| self.records.get(id))
    }
}

/// Read-only view over the registry's consumes-edges as a DAG, for
/// traversal helpers that don't need append access.
pub struct ProvenanceDag<'a> {
    registry: &'a EvidenceRegistry,
}

impl<'a> ProvenanceDag<'a> {
    pub fn new(registry: &'a EvidenceRegistry) -> Self {
        Self { registry }
    }

    pub fn ancestors_of(&self, record_id: &str) -> Vec<&'a EvidenceRecord> {
        let mut visited = HashSet::new();
        let mut stack = vec![record_id.to_string()];
        let mut out = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(record) = self.registry.record(&current) {
                for dep in &record.consumes {
                    if visited.insert(dep.clone()) {
                        if let Some(dep_record) = self.registry.record(dep) {
                            out.push(dep_record);
                            stack.push(dep.clone());
                        }
                    }
                }
            }
        }
        out
    }
}
