//! The top-level pipeline driver: wires the phase sequence, task planner,
//! method executor, evidence registry, aggregator, and proof builder into
//! one end-to-end run.
//!
//! Per-task method dispatch fans out across a `rayon` worker pool sized
//! from [`crate::config::PipelineConfig::worker_pool_size`] — synchronous
//! phases internally, a bounded worker pool at the task level.

use crate::aggregator::Aggregator;
use crate::calibration::choquet;
use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::evidence::EvidenceRegistry;
use crate::executor::{MethodExecutor, MethodInvocation, MethodOutcome};
use crate::factory::PipelineContext;
use crate::hashing;
use crate::ontology::BaseSlot;
use crate::phases::adapter::PreprocessingAdapter;
use crate::phases::phase0::{InputValidationPhase, RawInput};
use crate::phases::phase1::{DocumentIngestionInput, DocumentIngestionPhase, DocumentParser};
use crate::phases::phase3::{ChunkRoutingInput, ChunkRoutingPhase};
use crate::phases::phase5::{SignalResolutionInput, SignalResolutionPhase};
use crate::planner::TaskPlan;
use crate::proof::{Proof, ProofBuilder};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;

/// Everything one run needs beyond the already-built [`PipelineContext`]:
/// the raw document bytes, the injected parser, and the executor holding
/// the registered analytical methods.
pub struct RunRequest<'a> {
    pub run_id: String,
    pub pdf_bytes: Vec<u8>,
    pub parser: &'a dyn DocumentParser,
    pub executor: &'a MethodExecutor,
    pub unit_quality: f64,
}

const EXPECTED_PHASE_COUNT: usize = 5;

/// Run the full pipeline — input validation through proof sealing — and
/// return the sealed proof. A task whose method execution or calibration
/// fails is recorded as unanswered rather than aborting the run; the
/// pipeline itself only aborts on a phase contract or planning failure,
/// matching the "continue, mark overall success false" default.
pub fn run(ctx: &PipelineContext, request: RunRequest) -> Result<Proof> {
    tracing::info!(run_id = %request.run_id, "pipeline run starting");

    let validated = InputValidationPhase.run(RawInput {
        pdf_bytes: request.pdf_bytes.clone(),
        expected_questionnaire_sha256: ctx.questionnaire.integrity_hash().to_string(),
        run_id: request.run_id.clone(),
    })?;

    let ingestion = DocumentIngestionPhase { parser: request.parser }.run(DocumentIngestionInput {
        validated: validated.output.clone(),
        pdf_bytes: request.pdf_bytes,
    })?;

    let adapted = PreprocessingAdapter.run(ingestion.output)?;

    let routing = ChunkRoutingPhase::default().run(ChunkRoutingInput {
        questionnaire: &ctx.questionnaire,
        document: &adapted.output,
    })?;

    let resolution = SignalResolutionPhase::default().run(SignalResolutionInput {
        questionnaire: &ctx.questionnaire,
        routing: &routing.output.results,
        registry: &ctx.signal_registry,
    })?;

    let plan = TaskPlan::assemble(&ctx.questionnaire, &routing.output.results, &resolution.output.resolved)?;
    tracing::info!(run_id = %request.run_id, tasks = plan.tasks().len(), "task plan assembled");

    let signals_by_global: HashMap<u16, &Vec<crate::phases::phase5::ResolvedSignalEntry>> = resolution
        .output
        .resolved
        .iter()
        .map(|r| (r.question_global, &r.signals))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.config.worker_pool_size)
        .build()
        .map_err(|e| Error::config(format!("failed to build worker pool: {e}")))?;

    let outcomes: Vec<(String, BaseSlot, Option<MethodOutcome>)> = pool.install(|| {
        plan.tasks()
            .par_iter()
            .map(|task| {
                let mut signals = HashMap::new();
                if let Some(resolved) = signals_by_global.get(&task.question_id.question_global) {
                    for entry in resolved.iter() {
                        signals.insert(entry.signal_type.clone(), Value::Bool(true));
                    }
                }
                let invocation = MethodInvocation {
                    task_id: task.task_id.clone(),
                    signals,
                    kwargs: HashMap::new(),
                };
                let outcome = request
                    .executor
                    .execute(task, &invocation, &ctx.catalog, &ctx.calibration, request.unit_quality)
                    .inspect_err(|e| tracing::warn!(task_id = %task.task_id, error = %e, "task execution failed; recording as unanswered"))
                    .ok();
                (task.task_id.clone(), task.question_id.slot, outcome)
            })
            .collect()
    });

    let mut evidence = EvidenceRegistry::new();
    let mut scores_by_slot: HashMap<BaseSlot, Vec<f64>> = HashMap::new();
    let mut answered = 0usize;

    for (task_id, slot, outcome) in &outcomes {
        let Some(outcome) = outcome else { continue };
        let fingerprint = hashing::blake3_of(&outcome.output)?;
        evidence.append(task_id, &outcome.method_id, &fingerprint, Vec::new())?;
        let score = outcome.output.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        scores_by_slot.entry(*slot).or_default().push(score);
        answered += 1;
    }

    let aggregation = Aggregator::new(&ctx.cluster_partition).aggregate(&scores_by_slot);
    tracing::info!(run_id = %request.run_id, answered, total = plan.tasks().len(), classification = ?aggregation.classification, "aggregation complete");

    let mut catalog_bytes = hashing::canonical_json_bytes(&ctx.catalog)?;
    catalog_bytes.extend_from_slice(&choquet::capacity_table_bytes());
    let catalog_hash = hashing::blake3_hex(&catalog_bytes);

    let proof = ProofBuilder::new(request.run_id.clone(), EXPECTED_PHASE_COUNT)
        .with_document_hashes(validated.output.pdf_sha256.clone(), validated.output.questionnaire_sha256.clone())
        .with_task_plan_hash(plan.integrity_hash().to_string())
        .with_catalog_hash(catalog_hash)
        .record_phase(&validated.metadata)
        .record_phase(&ingestion.metadata)
        .record_phase(&adapted.metadata)
        .record_phase(&routing.metadata)
        .record_phase(&resolution.metadata)
        .with_task_outcomes(answered, plan.tasks().len())
        .with_aggregation(&aggregation)
        .seal()?;

    tracing::info!(run_id = %request.run_id, hash = %proof.hash, overall_success = proof.overall_success(), "proof sealed");
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::data::{
        CalibrationStatus, IntrinsicCalibration, IntrinsicRecord, MethodCompatibility, MethodRole, MethodSignatures,
    };
    use crate::calibration::layer::CalibrationLayer;
    use crate::catalog::{ExecutionStage, MethodCatalog, MethodDescriptor};
    use crate::executor::AnalyticalMethod;
    use crate::factory::{build_context, PipelineContextInputs};
    use crate::ontology::{DimensionId, PolicyAreaId, DIMENSION_COUNT, POLICY_AREA_COUNT, QUESTIONS_PER_CHUNK};
    use crate::questionnaire::{MicroQuestion, Questionnaire};
    use crate::signals::SignalRegistry;
    use serde_json::json;

    struct FullMatrixParser;

    impl DocumentParser for FullMatrixParser {
        fn parse(&self, _pdf_bytes: &[u8]) -> Result<Vec<(BaseSlot, String)>> {
            let mut out = Vec::new();
            for pa in 1..=POLICY_AREA_COUNT as u8 {
                for dim in 1..=DIMENSION_COUNT as u8 {
                    let slot = BaseSlot::new(PolicyAreaId::new(pa).unwrap(), DimensionId::new(dim).unwrap());
                    out.push((slot, format!("body text for {slot}")));
                }
            }
            Ok(out)
        }
    }

    struct ConstantScore;

    impl AnalyticalMethod for ConstantScore {
        fn call(&self, _invocation: &MethodInvocation) -> Result<Value> {
            Ok(json!({"score": 1.0}))
        }
        fn accepted_kwargs(&self) -> &[&'static str] {
            &[]
        }
    }

    fn full_questionnaire() -> Questionnaire {
        let mut out = Vec::new();
        let mut global = 1u16;
        for pa in 1..=POLICY_AREA_COUNT as u8 {
            for dim in 1..=DIMENSION_COUNT as u8 {
                let slot = BaseSlot::new(PolicyAreaId::new(pa).unwrap(), DimensionId::new(dim).unwrap());
                for ordinal in 1..=QUESTIONS_PER_CHUNK as u8 {
                    out.push(MicroQuestion {
                        id: crate::ontology::MicroQuestionId::new(global, slot, ordinal).unwrap(),
                        prompt: format!("q{global}"),
                        method_class: "PolicyMethod".into(),
                        method_name: "evaluate".into(),
                        signal_requirements: vec![],
                        expected_elements: vec![],
                    });
                    global += 1;
                }
            }
        }
        Questionnaire::new(out).unwrap()
    }

    fn context() -> PipelineContext {
        let mut catalog = MethodCatalog::new();
        catalog
            .register(MethodDescriptor {
                class_name: "PolicyMethod".into(),
                method_name: "evaluate".into(),
                timeout_ms: 5_000,
                max_retries: 1,
                required_stages: vec![ExecutionStage::Ingestion],
            })
            .unwrap();

        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            IntrinsicRecord {
                status: CalibrationStatus::Calibrated,
                b_theory: 0.95,
                b_impl: 0.95,
                b_deploy: 0.95,
                required_layers: vec![CalibrationLayer::Base],
                role: MethodRole::Executor,
            },
        );

        build_context(PipelineContextInputs {
            config: crate::config::PipelineConfig::default(),
            questionnaire: full_questionnaire(),
            catalog,
            intrinsic: IntrinsicCalibration::new(records).unwrap(),
            compatibility: MethodCompatibility::new(HashMap::new()),
            signatures: MethodSignatures::new(HashMap::new()),
            cluster_partition: crate::ontology::ClusterPartition::default_partition(),
            signal_registry: SignalRegistry::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_full_run_seals_a_proof() {
        let ctx = context();
        let mut executor = MethodExecutor::new();
        executor.register("PolicyMethod", "evaluate", Box::new(ConstantScore));

        let proof = run(
            &ctx,
            RunRequest {
                run_id: "run-1".to_string(),
                pdf_bytes: b"%PDF-1.4 fake policy document".to_vec(),
                parser: &FullMatrixParser,
                executor: &executor,
                unit_quality: 0.95,
            },
        )
        .unwrap();

        assert!(proof.is_sealed());
        assert!(proof.overall_success());
        assert_eq!(proof.questions_total, crate::ontology::TOTAL_MICRO_QUESTIONS);
        assert_eq!(proof.macro_percentage, 100.0);
    }
}
