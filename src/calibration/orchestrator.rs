//! Calibration Orchestrator: the single coordinator for all eight
//! calibration layers (`@b`, `@u`, `@q`, `@d`, `@p`, `@C_cong`, `@chain`, `@m`).
//!
//! The mandatory single-path rule: calibration is resolved only through one
//! [`CalibrationOrchestrator`] instance, built once by
//! [`crate::factory::build_context`] and threaded through every phase as a
//! shared reference. No code path may construct a second orchestrator and
//! score against it — that would let two runs silently disagree on the
//! same method.

use crate::calibration::choquet::ChoquetAggregator;
use crate::calibration::data::{
    CalibrationStatus, IntrinsicCalibration, MethodCompatibility, MethodRole, MethodSignatures, Thresholds,
};
use crate::calibration::layer::{CalibrationLayer, CALIBRATION_LAYER_ORDER};
use crate::catalog::MethodCatalog;
use crate::error::{Error, Result};

/// One layer's contribution to a method's calibration score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerScore {
    pub layer: CalibrationLayer,
    pub score: f64,
}

/// The outcome of calibrating one method: the aggregated score, whether it
/// cleared the threshold, and the layer scores that produced it (kept for
/// evidence recording).
#[derive(Debug, Clone)]
pub struct CalibrationVerdict {
    pub method_id: String,
    pub aggregated_score: f64,
    pub threshold: f64,
    pub layer_scores: Vec<LayerScore>,
}

impl CalibrationVerdict {
    pub fn passed(&self) -> bool {
        self.aggregated_score >= self.threshold
    }
}

/// Context a layer needs to score a method: the observed kwargs from this
/// invocation (for chain-integrity checking), the caller-supplied unit
/// quality signal, and whether the call stayed within its declared timeout
/// budget.
pub struct CalibrationContext<'a> {
    pub method_id: &'a str,
    pub observed_kwargs: &'a [String],
    pub unit_quality: f64,
    pub execution_within_budget: bool,
}

pub struct CalibrationOrchestrator {
    intrinsic: IntrinsicCalibration,
    compatibility: MethodCompatibility,
    signatures: MethodSignatures,
    thresholds: Thresholds,
}

impl CalibrationOrchestrator {
    pub fn new(
        intrinsic: IntrinsicCalibration,
        compatibility: MethodCompatibility,
        signatures: MethodSignatures,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            intrinsic,
            compatibility,
            signatures,
            thresholds,
        }
    }

    /// Score one method through every layer its intrinsic record requires,
    /// aggregate (Choquet for executor roles, weighted sum for every other
    /// role), and compare against the configured threshold.
    pub fn calibrate(&self, catalog: &MethodCatalog, ctx: &CalibrationContext) -> Result<CalibrationVerdict> {
        catalog
            .descriptors()
            .find(|d| d.method_id() == ctx.method_id)
            .ok_or_else(|| Error::IntrinsicMissing {
                method_id: ctx.method_id.to_string(),
            })?;

        let record = self.intrinsic.record_for(ctx.method_id)?;
        if record.status == CalibrationStatus::Excluded {
            return Err(Error::MethodExcluded {
                method_id: ctx.method_id.to_string(),
            });
        }

        if !self.signatures.matches(ctx.method_id, ctx.observed_kwargs) {
            return Err(Error::Integrity {
                artifact: ctx.method_id.to_string(),
                expected: "declared call signature".to_string(),
                actual: "observed kwargs diverged from declared signature".to_string(),
            });
        }

        let mut layer_scores: Vec<LayerScore> = Vec::with_capacity(record.required_layers.len());
        for layer in CALIBRATION_LAYER_ORDER {
            if !record.required_layers.contains(&layer) {
                continue;
            }
            let score = self.score_layer(layer, ctx, &layer_scores)?;
            layer_scores.push(LayerScore { layer, score });
        }

        let aggregated_score = match record.role {
            MethodRole::Executor => {
                let pairs: Vec<(CalibrationLayer, f64)> =
                    layer_scores.iter().map(|ls| (ls.layer, ls.score)).collect();
                ChoquetAggregator::new().aggregate(&pairs)
            }
            MethodRole::Other => {
                if layer_scores.is_empty() {
                    0.0
                } else {
                    layer_scores.iter().map(|ls| ls.score).sum::<f64>() / layer_scores.len() as f64
                }
            }
        };

        Ok(CalibrationVerdict {
            method_id: ctx.method_id.to_string(),
            aggregated_score,
            threshold: self.thresholds.calibration_threshold,
            layer_scores,
        })
    }

    fn score_layer(&self, layer: CalibrationLayer, ctx: &CalibrationContext, scored_so_far: &[LayerScore]) -> Result<f64> {
        match layer {
            // @b — intrinsic/base: weighted combination of the three base
            // components, using the same weighting the catalog loads for
            // every run rather than a single undifferentiated scalar.
            CalibrationLayer::Base => {
                let record = self.intrinsic.record_for(ctx.method_id)?;
                let t = &self.thresholds;
                Ok((record.b_theory * t.base_theory_weight
                    + record.b_impl * t.base_impl_weight
                    + record.b_deploy * t.base_deploy_weight)
                    .clamp(0.0, 1.0))
            }
            // @u — unit quality: the caller-supplied signal for how well
            // this invocation's inputs held together, passed straight
            // through.
            CalibrationLayer::Unit => Ok(ctx.unit_quality.clamp(0.0, 1.0)),
            // @q/@d/@p — contextual compatibility: looked up per axis. A
            // method with no declared scalar for a required axis is not an
            // error; it degrades to the configured missing-layer penalty.
            CalibrationLayer::ContextQ | CalibrationLayer::ContextD | CalibrationLayer::ContextP => {
                let axis = layer.context_axis().expect("contextual layer always has an axis");
                match self.compatibility.scalar_for(ctx.method_id, axis) {
                    Some(scalar) => Ok(scalar.clamp(0.0, 1.0)),
                    None => Ok(self.thresholds.layer_missing_penalty),
                }
            }
            // @C_cong — congruence: how tightly the layers already scored
            // this call agree with one another. A single prior layer, or
            // none, is trivially congruent; more layers get a genuine
            // variance-based measure.
            CalibrationLayer::Congruence => {
                if scored_so_far.len() < 2 {
                    return Ok(1.0);
                }
                let values: Vec<f64> = scored_so_far.iter().map(|ls| ls.score).collect();
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
                Ok((1.0 - variance.sqrt()).clamp(0.0, 1.0))
            }
            // @chain — chain integrity: fraction of the method's declared
            // call signature actually present in this invocation. The hard
            // all-or-nothing gate already ran up front in `calibrate`; this
            // is the fractional score fed into aggregation.
            CalibrationLayer::Chain => Ok(self.signatures.match_ratio(ctx.method_id, ctx.observed_kwargs)),
            // @m — meta/governance: the two signals this kernel can verify
            // in-process — signature validity and whether the call stayed
            // within its declared timeout budget.
            CalibrationLayer::Meta => {
                let signature_valid = self.signatures.matches(ctx.method_id, ctx.observed_kwargs);
                let budget_ok = ctx.execution_within_budget;
                Ok(match (signature_valid, budget_ok) {
                    (true, true) => 1.0,
                    (true, false) | (false, true) => 0.5,
                    (false, false) => 0.0,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::data::{CalibrationStatus, IntrinsicRecord, MethodRole};
    use crate::catalog::{ExecutionStage, MethodDescriptor};
    use crate::calibration::layer::ContextAxis;
    use std::collections::HashMap;

    fn record(
        status: CalibrationStatus,
        b_theory: f64,
        b_impl: f64,
        b_deploy: f64,
        layers: Vec<CalibrationLayer>,
        role: MethodRole,
    ) -> IntrinsicRecord {
        IntrinsicRecord {
            status,
            b_theory,
            b_impl,
            b_deploy,
            required_layers: layers,
            role,
        }
    }

    fn catalog() -> MethodCatalog {
        let mut catalog = MethodCatalog::new();
        catalog
            .register(MethodDescriptor {
                class_name: "PolicyMethod".into(),
                method_name: "evaluate".into(),
                timeout_ms: 1000,
                max_retries: 1,
                required_stages: vec![ExecutionStage::Ingestion],
            })
            .unwrap();
        catalog
    }

    #[test]
    fn test_calibrate_passes_with_strong_context() {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            record(
                CalibrationStatus::Calibrated,
                0.9,
                0.9,
                0.9,
                vec![CalibrationLayer::Base, CalibrationLayer::ContextQ],
                MethodRole::Executor,
            ),
        );
        let mut compat = HashMap::new();
        let mut axes = HashMap::new();
        axes.insert(ContextAxis::Q, 0.9);
        compat.insert("PolicyMethod::evaluate".to_string(), axes);

        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(compat),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.9,
            execution_within_budget: true,
        };
        let verdict = orch.calibrate(&catalog(), &ctx).unwrap();
        assert!(verdict.passed());
        assert_eq!(verdict.layer_scores.len(), 2);
    }

    #[test]
    fn test_calibrate_fails_on_missing_intrinsic() {
        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(HashMap::new()).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.5,
            execution_within_budget: true,
        };
        assert!(orch.calibrate(&catalog(), &ctx).is_err());
    }

    #[test]
    fn test_calibrate_fails_on_excluded_status() {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            record(
                CalibrationStatus::Excluded,
                0.9,
                0.9,
                0.9,
                vec![CalibrationLayer::Base],
                MethodRole::Executor,
            ),
        );
        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.9,
            execution_within_budget: true,
        };
        let err = orch.calibrate(&catalog(), &ctx).unwrap_err();
        assert!(matches!(err, Error::MethodExcluded { .. }));
    }

    #[test]
    fn test_missing_contextual_axis_degrades_to_penalty_not_error() {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            record(
                CalibrationStatus::Calibrated,
                0.8,
                0.8,
                0.8,
                vec![CalibrationLayer::ContextD],
                MethodRole::Other,
            ),
        );
        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.5,
            execution_within_budget: true,
        };
        let verdict = orch.calibrate(&catalog(), &ctx).unwrap();
        assert_eq!(verdict.layer_scores[0].score, Thresholds::default().layer_missing_penalty);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_calibrate_fails_below_threshold() {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            record(
                CalibrationStatus::Calibrated,
                0.1,
                0.1,
                0.1,
                vec![CalibrationLayer::Base],
                MethodRole::Executor,
            ),
        );
        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.1,
            execution_within_budget: true,
        };
        let verdict = orch.calibrate(&catalog(), &ctx).unwrap();
        assert!(!verdict.passed());
    }

    #[test]
    fn test_weighted_sum_used_for_non_executor_role() {
        let mut records = HashMap::new();
        records.insert(
            "PolicyMethod::evaluate".to_string(),
            record(
                CalibrationStatus::Calibrated,
                1.0,
                1.0,
                1.0,
                vec![CalibrationLayer::Base, CalibrationLayer::Unit],
                MethodRole::Other,
            ),
        );
        let orch = CalibrationOrchestrator::new(
            IntrinsicCalibration::new(records).unwrap(),
            MethodCompatibility::new(HashMap::new()),
            MethodSignatures::new(HashMap::new()),
            Thresholds::default(),
        );
        let ctx = CalibrationContext {
            method_id: "PolicyMethod::evaluate",
            observed_kwargs: &[],
            unit_quality: 0.5,
            execution_within_budget: true,
        };
        let verdict = orch.calibrate(&catalog(), &ctx).unwrap();
        // Plain mean of 1.0 (base) and 0.5 (unit).
        assert!((verdict.aggregated_score - 0.75).abs() < 1e-9);
    }
}
