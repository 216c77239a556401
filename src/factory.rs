//! Factory: builds the one [`PipelineContext`] a run is threaded through,
//! replacing the ambient global state an earlier design might have reached
//! for with explicit construction at the call site.
//!
//! Load the fixed artifacts, validate them against each other, and hand
//! back a fully wired context — fallible builder steps collected into
//! one `build_context()` call.

use crate::calibration::data::{IntrinsicCalibration, MethodCompatibility, MethodSignatures, Thresholds};
use crate::calibration::orchestrator::CalibrationOrchestrator;
use crate::catalog::MethodCatalog;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ontology::ClusterPartition;
use crate::questionnaire::Questionnaire;
use crate::signals::SignalRegistry;

/// Everything a run needs, built once and passed by reference through
/// every phase: configuration, the loaded questionnaire, the method
/// catalog, the single calibration orchestrator (mandatory single-path
/// rule), the cluster partition, and the signal registry.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub questionnaire: Questionnaire,
    pub catalog: MethodCatalog,
    pub calibration: CalibrationOrchestrator,
    pub cluster_partition: ClusterPartition,
    pub signal_registry: SignalRegistry,
}

/// Inputs the factory needs to assemble a [`PipelineContext`]; each field
/// is itself data loaded elsewhere (questionnaire authoring, catalog
/// authoring, and calibration artifact loading are all out of scope —
/// this factory only wires already-loaded data together and validates the
/// wiring).
pub struct PipelineContextInputs {
    pub config: PipelineConfig,
    pub questionnaire: Questionnaire,
    pub catalog: MethodCatalog,
    pub intrinsic: IntrinsicCalibration,
    pub compatibility: MethodCompatibility,
    pub signatures: MethodSignatures,
    pub cluster_partition: ClusterPartition,
    pub signal_registry: SignalRegistry,
}

pub fn build_context(inputs: PipelineContextInputs) -> Result<PipelineContext> {
    let thresholds = Thresholds::new(inputs.config.calibration_threshold)?;
    let calibration = CalibrationOrchestrator::new(
        inputs.intrinsic,
        inputs.compatibility,
        inputs.signatures,
        thresholds,
    );

    Ok(PipelineContext {
        config: inputs.config,
        questionnaire: inputs.questionnaire,
        catalog: inputs.catalog,
        calibration,
        cluster_partition: inputs.cluster_partition,
        signal_registry: inputs.signal_registry,
    })
}
