//! Method Catalog: the fixed registry of `(class_name, method_name)`
//! analytical methods the executor dispatches to.
//!
//! A keyed table over callable units, indexed by a plain string pair
//! rather than a typed signature since catalog entries here are loaded
//! data rather than compile-time types. Also enforces the
//! stage-execution-order invariant every method's declared stage
//! sequence must satisfy.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The eight method-execution stages, in their required dispatch order.
/// A method's `required_stages` must appear in this relative order;
/// skipping stages is fine, reordering them is not.
///
/// Distinct from [`crate::calibration::layer::CalibrationLayer`], which
/// names the eight scoring dimensions a method-in-context is calibrated
/// against. The two sets share a cardinality and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    Ingestion,
    Extraction,
    Transformation,
    Validation,
    Aggregation,
    Scoring,
    Reporting,
    Meta,
}

impl ExecutionStage {
    /// Position in the canonical order, used to check monotonicity.
    fn position(self) -> u8 {
        match self {
            Self::Ingestion => 0,
            Self::Extraction => 1,
            Self::Transformation => 2,
            Self::Validation => 3,
            Self::Aggregation => 4,
            Self::Scoring => 5,
            Self::Reporting => 6,
            Self::Meta => 7,
        }
    }
}

/// A single entry in the method catalog: a dispatchable `(class, method)`
/// pair plus the execution metadata the executor and calibration
/// orchestrator need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub class_name: String,
    pub method_name: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub required_stages: Vec<ExecutionStage>,
}

impl MethodDescriptor {
    pub fn method_id(&self) -> String {
        format!("{}::{}", self.class_name, self.method_name)
    }

    /// Validate that `required_stages` is in non-decreasing canonical
    /// position order (duplicates disallowed, since a stage either
    /// participates once or not at all).
    fn validate_stage_order(&self) -> Result<()> {
        let mut last: Option<u8> = None;
        for stage in &self.required_stages {
            let pos = stage.position();
            if let Some(prev) = last {
                if pos <= prev {
                    return Err(Error::validation(
                        "catalog",
                        format!(
                            "method '{}' declares stages out of canonical order at {:?}",
                            self.method_id(),
                            stage
                        ),
                    ));
                }
            }
            last = Some(pos);
        }
        Ok(())
    }
}

/// An executor class groups the methods implemented by one analytical
/// component, so catalog lookups can validate class membership before
/// method dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutorClass<'a>(pub &'a str);

/// The full, validated set of dispatchable methods.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MethodCatalog {
    methods: HashMap<String, MethodDescriptor>,
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method descriptor, validating its stage order and
    /// rejecting duplicate `(class, method)` registration.
    pub fn register(&mut self, descriptor: MethodDescriptor) -> Result<()> {
        descriptor.validate_stage_order()?;
        let key = descriptor.method_id();
        if self.methods.contains_key(&key) {
            return Err(Error::validation(
                "catalog",
                format!("method '{key}' already registered"),
            ));
        }
        self.methods.insert(key, descriptor);
        Ok(())
    }

    pub fn lookup(&self, class_name: &str, method_name: &str) -> Result<&MethodDescriptor> {
        let key = format!("{class_name}::{method_name}");
        self.methods
            .get(&key)
            .ok_or_else(|| Error::IntrinsicMissing { method_id: key })
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }
}
