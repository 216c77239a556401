//! Method Executor: dispatches an [`crate::planner::ExecutableTask`] to its
//! registered `(class_name, method_name)` implementation, enforcing a
//! per-method timeout and retry budget and recording what happened for the
//! evidence registry.
//!
//! A plain keyed dispatch table over boxed synchronous closures, since
//! catalog entries here are loaded data rather than compile-time types,
//! and the injected analytical methods are synchronous by contract.

use crate::calibration::orchestrator::{CalibrationContext, CalibrationOrchestrator, CalibrationVerdict};
use crate::catalog::MethodCatalog;
use crate::error::{Error, Result};
use crate::planner::ExecutableTask;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Typed input handed to a method: the resolved signal values plus any
/// extra keyword arguments the caller supplies. Unknown kwargs are a hard
/// rejection at the method boundary rather than a silently dropped key.
#[derive(Debug, Clone)]
pub struct MethodInvocation {
    pub task_id: String,
    pub signals: HashMap<String, Value>,
    pub kwargs: HashMap<String, Value>,
}

/// What a method call produced, independent of calibration.
#[derive(Debug, Clone, Serialize)]
pub struct MethodOutcome {
    pub task_id: String,
    pub method_id: String,
    pub output: Value,
    pub elapsed_ms: u64,
    pub attempts: u32,
    pub calibration: CalibrationSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationSummary {
    pub aggregated_score: f64,
    pub threshold: f64,
    pub passed: bool,
}

impl From<&CalibrationVerdict> for CalibrationSummary {
    fn from(v: &CalibrationVerdict) -> Self {
        Self {
            aggregated_score: v.aggregated_score,
            threshold: v.threshold,
            passed: v.passed(),
        }
    }
}

/// A registered, callable analytical method. Implementors receive the
/// resolved signals and kwargs and return a JSON value; they must reject
/// (not silently ignore) any kwarg key they do not recognize.
pub trait AnalyticalMethod: Send + Sync {
    fn call(&self, invocation: &MethodInvocation) -> Result<Value>;

    /// Declares the kwarg keys this method accepts, for the "no silent
    /// kwarg drops" check the executor performs before calling `call`.
    fn accepted_kwargs(&self) -> &[&'static str];
}

#[derive(Default)]
pub struct MethodExecutor {
    methods: HashMap<String, Box<dyn AnalyticalMethod>>,
}

impl MethodExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: &str, method_name: &str, method: Box<dyn AnalyticalMethod>) {
        self.methods.insert(format!("{class_name}::{method_name}"), method);
    }

    /// Run one task through its registered method, enforcing catalog
    /// timeout/retry limits, then calibrate the result. A method exhausting
    /// its retry budget or exceeding its timeout fails the task; an
    /// unknown kwarg key is rejected before the first attempt.
    pub fn execute(
        &self,
        task: &ExecutableTask,
        invocation: &MethodInvocation,
        catalog: &MethodCatalog,
        calibration: &CalibrationOrchestrator,
        unit_quality: f64,
    ) -> Result<MethodOutcome> {
        let method_id = format!("{}::{}", task.method_class, task.method_name);
        let descriptor = catalog.lookup(&task.method_class, &task.method_name)?;
        let method = self
            .methods
            .get(&method_id)
            .ok_or_else(|| Error::IntrinsicMissing { method_id: method_id.clone() })?;

        let accepted = method.accepted_kwargs();
        for key in invocation.kwargs.keys() {
            if !accepted.contains(&key.as_str()) {
                return Err(Error::validation(
                    "executor",
                    format!("method '{method_id}' rejects unknown kwarg '{key}'"),
                ));
            }
        }

        let timeout = Duration::from_millis(descriptor.timeout_ms);
        let mut last_err = None;
        let mut attempts = 0u32;
        let started = Instant::now();

        while attempts <= descriptor.max_retries {
            attempts += 1;
            let attempt_started = Instant::now();
            let result = method.call(invocation);
            let attempt_elapsed = attempt_started.elapsed();

            if attempt_elapsed > timeout {
                last_err = Some(Error::MethodTimeout {
                    method_id: method_id.clone(),
                    timeout_ms: descriptor.timeout_ms,
                });
                continue;
            }

            match result {
                Ok(output) => {
                    let observed_kwargs: Vec<String> = invocation.kwargs.keys().cloned().collect();
                    let ctx = CalibrationContext {
                        method_id: &method_id,
                        observed_kwargs: &observed_kwargs,
                        unit_quality,
                        execution_within_budget: attempt_elapsed <= timeout,
                    };
                    let verdict = calibration.calibrate(catalog, &ctx)?;
                    tracing::debug!(
                        method_id = %method_id,
                        task_id = %task.task_id,
                        score = verdict.aggregated_score,
                        threshold = verdict.threshold,
                        passed = verdict.passed(),
                        "calibration verdict"
                    );
                    if !verdict.passed() {
                        return Err(Error::below_threshold(method_id, verdict.aggregated_score, verdict.threshold));
                    }
                    return Ok(MethodOutcome {
                        task_id: task.task_id.clone(),
                        method_id,
                        output,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        attempts,
                        calibration: CalibrationSummary::from(&verdict),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or(Error::MethodRetryExhausted {
            method_id,
            attempts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::data::{
        CalibrationStatus, IntrinsicCalibration, IntrinsicRecord, MethodCompatibility, MethodRole, MethodSignatures,
        Thresholds,
    };
    use crate::calibration::layer::CalibrationLayer;
    use crate::catalog::{ExecutionStage, MethodDescriptor};
    use crate::ontology::{BaseSlot, DimensionId, MicroQuestionId, PolicyAreaId};
    use serde_json::json;

    struct AlwaysSucceeds;
    impl AnalyticalMethod for AlwaysSucceeds {
        fn call(&self, _invocation: &MethodInvocation) -> Result<Value> {
            Ok(json!({"score": 0.8}))
        }
        fn accepted_kwargs(&self) -> &[&'static str] {
            &["weight"]
        }
    }

    struct AlwaysFails;
    impl AnalyticalMethod for AlwaysFails {
        fn call(&self, _invocation: &MethodInvocation) -> Result<Value> {
            Err(Error::internal("boom"))
        }
        fn accepted_kwargs(&self) -> &[&'static str] {
            &[]
        }
    }

    fn task() -> ExecutableTask {
        let slot = BaseSlot::new(PolicyAreaId::new(1).unwrap(), DimensionId::new(1).unwrap());
        let qid = MicroQuestionId::new(1, slot, 1).unwrap();
        ExecutableTask {
            task_id: qid.task_id(),
            question_id: qid,
            chunk_id: slot.chunk_id(),
            method_class: "PolicyMethod".into(),
            method_name: "evaluate".into(),
            resolved_signal_types: vec![],
        }
    }

    fn catalog_with(max_retries: u32) -> MethodCatalog {
        let mut catalog = MethodCatalog::new();
        catalog
            .register(MethodDescriptor {
                class_name: "PolicyMethod".into(),
                method_name: "evaluate".into(),
                timeout_ms: 5_000,
                max_retries,
                required_stages: vec![ExecutionStage::Ingestion],
            })
            .unwrap();
        catalog
    }

    fn calibration(score: f64) -> CalibrationOrchestrator {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            IntrinsicRecord {
                status: CalibrationStatus::Calibrated,
                b_theory: score,
                b_impl: score,
                b_deploy: score,
                required_layers: vec![CalibrationLayer::Base],
                role: MethodRole::Executor,
            },
        );
        CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        )
    }

    #[test]
    fn test_execute_succeeds_and_calibrates() {
        let mut executor = MethodExecutor::new();
        executor.register("PolicyMethod", "evaluate", Box::new(AlwaysSucceeds));
        let invocation = MethodInvocation {
            task_id: task().task_id,
            signals: HashMap::new(),
            kwargs: HashMap::new(),
        };
        let outcome = executor
            .execute(&task(), &invocation, &catalog_with(1), &calibration(0.9), 0.9)
            .unwrap();
        assert!(outcome.calibration.passed);
    }

    #[test]
    fn test_unknown_kwarg_is_rejected() {
        let mut executor = MethodExecutor::new();
        executor.register("PolicyMethod", "evaluate", Box::new(AlwaysSucceeds));
        let mut kwargs = HashMap::new();
        kwargs.insert("mystery".to_string(), json!(1));
        let invocation = MethodInvocation {
            task_id: task().task_id,
            signals: HashMap::new(),
            kwargs,
        };
        let err = executor
            .execute(&task(), &invocation, &catalog_with(1), &calibration(0.9), 0.9)
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_exhausts_retries_and_fails() {
        let mut executor = MethodExecutor::new();
        executor.register("PolicyMethod", "evaluate", Box::new(AlwaysFails));
        let invocation = MethodInvocation {
            task_id: task().task_id,
            signals: HashMap::new(),
            kwargs: HashMap::new(),
        };
        let err = executor
            .execute(&task(), &invocation, &catalog_with(2), &calibration(0.9), 0.9)
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_below_threshold_fails_task() {
        let mut executor = MethodExecutor::new();
        executor.register("PolicyMethod", "evaluate", Box::new(AlwaysSucceeds));
        let invocation = MethodInvocation {
            task_id: task().task_id,
            signals: HashMap::new(),
            kwargs: HashMap::new(),
        };
        let err = executor
            .execute(&task(), &invocation, &catalog_with(1), &calibration(0.05), 0.05)
            .unwrap_err();
        assert!(matches!(err, Error::BelowThreshold { .. }));
    }
}
