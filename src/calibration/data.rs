//! Calibration data model: the loaded artifacts a calibration run reads
//! but never writes — the intrinsic per-method base record, per-axis
//! compatibility scalars, the recorded layer-call signatures used for
//! chain-integrity checks, and the thresholds gating acceptance.

use crate::calibration::layer::{CalibrationLayer, ContextAxis};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whether a method's intrinsic score is usable at all. `Excluded` fails
/// any run that reaches it; only `Calibrated` methods contribute a base
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Calibrated,
    Excluded,
}

/// Which aggregation rule a method's layer scores go through: the Choquet
/// 2-additive integral for executor-role methods, a plain weighted sum for
/// every other role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodRole {
    Executor,
    Other,
}

/// One method's intrinsic (base, `@b`) calibration record, loaded once and
/// never recomputed at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicRecord {
    pub status: CalibrationStatus,
    pub b_theory: f64,
    pub b_impl: f64,
    pub b_deploy: f64,
    pub required_layers: Vec<CalibrationLayer>,
    pub role: MethodRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicCalibration {
    records: HashMap<String, IntrinsicRecord>,
}

impl IntrinsicCalibration {
    pub fn new(records: HashMap<String, IntrinsicRecord>) -> Result<Self> {
        for (method_id, record) in &records {
            for (component, value) in [
                ("b_theory", record.b_theory),
                ("b_impl", record.b_impl),
                ("b_deploy", record.b_deploy),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::validation(
                        "calibration",
                        format!("{component} for '{method_id}' is {value}, expected [0,1]"),
                    ));
                }
            }
        }
        Ok(Self { records })
    }

    /// Look up a method's intrinsic record. Missing entirely fails the run
    /// (`Error::IntrinsicMissing`); an `excluded` status is checked by the
    /// caller once it has the record.
    pub fn record_for(&self, method_id: &str) -> Result<&IntrinsicRecord> {
        self.records
            .get(method_id)
            .ok_or_else(|| Error::IntrinsicMissing { method_id: method_id.to_string() })
    }
}

/// Declares, per method and per contextual axis, a compatibility scalar in
/// `[0,1]` — a method with no declared value for an axis it requires is
/// not penalized as an error; it takes the configured missing-layer
/// penalty instead ([`Thresholds::layer_missing_penalty`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MethodCompatibility {
    axes: HashMap<String, HashMap<ContextAxis, f64>>,
}

impl MethodCompatibility {
    pub fn new(axes: HashMap<String, HashMap<ContextAxis, f64>>) -> Self {
        Self { axes }
    }

    pub fn scalar_for(&self, method_id: &str, axis: ContextAxis) -> Option<f64> {
        self.axes.get(method_id).and_then(|values| values.get(&axis)).copied()
    }
}

/// Recorded call signatures for methods that participate in a layer chain,
/// used by the chain-integrity layer (`@chain`) to detect a method being
/// invoked with an argument shape that drifted from what was declared.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MethodSignatures {
    signatures: HashMap<String, Vec<String>>,
}

impl MethodSignatures {
    pub fn new(signatures: HashMap<String, Vec<String>>) -> Self {
        Self { signatures }
    }

    pub fn matches(&self, method_id: &str, observed_kwargs: &[String]) -> bool {
        match self.signatures.get(method_id) {
            Some(declared) => {
                let mut declared_sorted = declared.clone();
                let mut observed_sorted = observed_kwargs.to_vec();
                declared_sorted.sort();
                observed_sorted.sort();
                declared_sorted == observed_sorted
            }
            // A method with no declared signature has no chain to check.
            None => true,
        }
    }

    /// Fraction of this method's declared kwargs present in the observed
    /// call, used as the chain layer's fractional score. A method with no
    /// declared signature, or an empty one, scores a full match.
    pub fn match_ratio(&self, method_id: &str, observed_kwargs: &[String]) -> f64 {
        match self.signatures.get(method_id) {
            Some(declared) if !declared.is_empty() => {
                let observed: HashSet<&String> = observed_kwargs.iter().collect();
                let matched = declared.iter().filter(|k| observed.contains(k)).count();
                matched as f64 / declared.len() as f64
            }
            _ => 1.0,
        }
    }
}

/// The minimum-acceptance threshold and related configuration, loaded from
/// `PipelineConfig` but kept as its own type since calibration is the only
/// consumer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub calibration_threshold: f64,
    pub layer_missing_penalty: f64,
    pub base_theory_weight: f64,
    pub base_impl_weight: f64,
    pub base_deploy_weight: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            calibration_threshold: 0.7,
            layer_missing_penalty: 0.1,
            base_theory_weight: 1.0 / 3.0,
            base_impl_weight: 1.0 / 3.0,
            base_deploy_weight: 1.0 / 3.0,
        }
    }
}

impl Thresholds {
    pub fn new(calibration_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&calibration_threshold) {
            return Err(Error::config(format!(
                "calibration_threshold {calibration_threshold} out of range [0,1]"
            )));
        }
        Ok(Self {
            calibration_threshold,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(b_theory: f64, b_impl: f64, b_deploy: f64) -> IntrinsicRecord {
        IntrinsicRecord {
            status: CalibrationStatus::Calibrated,
            b_theory,
            b_impl,
            b_deploy,
            required_layers: vec![CalibrationLayer::Base],
            role: MethodRole::Executor,
        }
    }

    #[test]
    fn test_intrinsic_rejects_out_of_range_component() {
        let mut records = HashMap::new();
        records.insert("M::f".to_string(), record(1.5, 0.5, 0.5));
        assert!(IntrinsicCalibration::new(records).is_err());
    }

    #[test]
    fn test_intrinsic_missing_method() {
        let intrinsic = IntrinsicCalibration::new(HashMap::new()).unwrap();
        let err = intrinsic.record_for("nope").unwrap_err();
        assert!(matches!(err, Error::IntrinsicMissing { .. }));
    }

    #[test]
    fn test_intrinsic_record_roundtrip() {
        let mut records = HashMap::new();
        records.insert("M::f".to_string(), record(0.9, 0.8, 0.7));
        let intrinsic = IntrinsicCalibration::new(records).unwrap();
        let found = intrinsic.record_for("M::f").unwrap();
        assert_eq!(found.status, CalibrationStatus::Calibrated);
        assert_eq!(found.b_theory, 0.9);
    }

    #[test]
    fn test_compatibility_lookup() {
        let mut axes = HashMap::new();
        let mut per_method = HashMap::new();
        per_method.insert(ContextAxis::Q, 0.6);
        axes.insert("M::f".to_string(), per_method);
        let compat = MethodCompatibility::new(axes);
        assert_eq!(compat.scalar_for("M::f", ContextAxis::Q), Some(0.6));
        assert_eq!(compat.scalar_for("M::f", ContextAxis::D), None);
        assert_eq!(compat.scalar_for("other", ContextAxis::Q), None);
    }

    #[test]
    fn test_signature_match_is_order_independent() {
        let mut map = HashMap::new();
        map.insert("M::f".to_string(), vec!["a".into(), "b".into()]);
        let sigs = MethodSignatures::new(map);
        assert!(sigs.matches("M::f", &["b".into(), "a".into()]));
        assert!(!sigs.matches("M::f", &["a".into()]));
    }

    #[test]
    fn test_match_ratio_is_fractional() {
        let mut map = HashMap::new();
        map.insert("M::f".to_string(), vec!["a".into(), "b".into()]);
        let sigs = MethodSignatures::new(map);
        assert_eq!(sigs.match_ratio("M::f", &["a".into()]), 0.5);
        assert_eq!(sigs.match_ratio("M::f", &["a".into(), "b".into()]), 1.0);
    }

    #[test]
    fn test_unsigned_method_always_matches() {
        let sigs = MethodSignatures::new(HashMap::new());
        assert!(sigs.matches("anything", &["x".into()]));
        assert_eq!(sigs.match_ratio("anything", &["x".into()]), 1.0);
    }

    #[test]
    fn test_thresholds_default_values() {
        let t = Thresholds::default();
        assert_eq!(t.calibration_threshold, 0.7);
        assert_eq!(t.layer_missing_penalty, 0.1);
    }

    #[test]
    fn test_thresholds_rejects_out_of_range() {
        assert!(Thresholds::new(1.2).is_err());
    }
}
