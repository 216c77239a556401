//! # quaestor-core
//!
//! A deterministic, multi-phase analytic kernel that scores a fixed
//! 300-question questionnaire against an ingested policy document and seals
//! the run behind a cryptographically verifiable proof.
//!
//! ## Pipeline shape
//!
//! Input validation → document ingestion → task planning → chunk routing →
//! signal resolution → method execution → calibration scoring → evidence
//! and provenance recording → aggregation → proof sealing. Each phase is a
//! [`contract::PhaseContract`] with its own input/output validation and a
//! content-hashed fingerprint; [`proof::ProofBuilder`] seals the chain of
//! fingerprints into one verifiable artifact.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quaestor_core::{factory, pipeline, config::PipelineConfig};
//!
//! let config = PipelineConfig::from_env()?;
//! let ctx = factory::build_context(inputs)?;
//! let proof = pipeline::run(&ctx, request)?;
//! assert!(proof.is_sealed());
//! ```

pub mod aggregator;
pub mod calibration;
pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod factory;
pub mod hashing;
pub mod ontology;
pub mod phases;
pub mod pipeline;
pub mod planner;
pub mod proof;
pub mod questionnaire;
pub mod signals;

pub use error::{Error, Result};

pub use aggregator::{Aggregator, AggregationReport, ClassificationBand};
pub use calibration::choquet::{ChoquetAggregator, DEFAULT_CAPACITY};
pub use calibration::data::{
    CalibrationStatus, IntrinsicCalibration, IntrinsicRecord, MethodCompatibility, MethodRole, MethodSignatures,
    Thresholds,
};
pub use calibration::layer::{CalibrationLayer, ContextAxis};
pub use calibration::orchestrator::CalibrationOrchestrator;
pub use catalog::{ExecutionStage, ExecutorClass, MethodCatalog, MethodDescriptor};
pub use config::PipelineConfig;
pub use contract::{PhaseContract, PhaseMetadata, PhaseOutcome};
pub use evidence::{EvidenceRecord, EvidenceRegistry, ProvenanceDag};
pub use executor::{MethodExecutor, MethodInvocation, MethodOutcome};
pub use factory::PipelineContext;
pub use ontology::{BaseSlot, ClusterId, ClusterPartition, DimensionId, MicroQuestionId, PolicyAreaId};
pub use pipeline::{run, RunRequest};
pub use planner::{ExecutableTask, TaskPlan};
pub use proof::{Proof, ProofBuilder};
pub use questionnaire::{MicroQuestion, Questionnaire};
pub use signals::{SignalRegistry, SignalRequirement};
