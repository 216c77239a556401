//! Proof Builder: seals a completed run into one verifiable artifact by
//! hashing every phase fingerprint, the questionnaire's integrity hash,
//! the task plan's integrity hash, the calibration capacity table, and the
//! aggregation report together.
//!
//! An attempt object that accumulates state across stages and is only
//! considered valid once every required stage has reported in.

use crate::aggregator::AggregationReport;
use crate::contract::PhaseMetadata;
use crate::error::{Error, Result};
use crate::hashing;
use serde::{Deserialize, Serialize};

/// Everything a sealed proof commits to. `hash` covers every field below
/// it via canonical JSON, so the struct's field order never matters for
/// verification — only content does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub run_id: String,
    pub pdf_sha256: String,
    pub questionnaire_sha256: String,
    pub task_plan_integrity_hash: String,
    pub catalog_hash: String,
    pub phase_fingerprints: Vec<PhaseFingerprint>,
    pub questions_answered: usize,
    pub questions_total: usize,
    pub macro_percentage: f64,
    pub hash: String,
}

impl Proof {
    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }

    pub fn overall_success(&self) -> bool {
        self.questions_answered == self.questions_total
    }

    /// Independently re-verify this proof: reconstruct the exact shape
    /// hashed at seal time, recompute its hash, and compare against the
    /// stored `hash`. Returns `Ok(false)` (not an error) on a content
    /// mismatch — the caller decides whether mismatch is fatal.
    pub fn verify(&self) -> Result<bool> {
        let unsealed = UnsealedProof {
            run_id: &self.run_id,
            pdf_sha256: &self.pdf_sha256,
            questionnaire_sha256: &self.questionnaire_sha256,
            task_plan_integrity_hash: &self.task_plan_integrity_hash,
            catalog_hash: &self.catalog_hash,
            phase_fingerprints: &self.phase_fingerprints,
            questions_answered: self.questions_answered,
            questions_total: self.questions_total,
            macro_percentage: self.macro_percentage,
        };
        let recomputed = hashing::blake3_of(&unsealed)?;
        Ok(recomputed == self.hash)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFingerprint {
    pub phase_name: String,
    pub fingerprint: String,
}

impl From<&PhaseMetadata> for PhaseFingerprint {
    fn from(meta: &PhaseMetadata) -> Self {
        Self {
            phase_name: meta.phase_name.clone(),
            fingerprint: meta.fingerprint.clone(),
        }
    }
}

#[derive(Serialize)]
struct UnsealedProof<'a> {
    run_id: &'a str,
    pdf_sha256: &'a str,
    questionnaire_sha256: &'a str,
    task_plan_integrity_hash: &'a str,
    catalog_hash: &'a str,
    phase_fingerprints: &'a [PhaseFingerprint],
    questions_answered: usize,
    questions_total: usize,
    macro_percentage: f64,
}

/// Accumulates the artifacts a proof needs; rejects sealing until every
/// required phase has reported its fingerprint.
pub struct ProofBuilder {
    run_id: String,
    pdf_sha256: Option<String>,
    questionnaire_sha256: Option<String>,
    task_plan_integrity_hash: Option<String>,
    catalog_hash: Option<String>,
    phase_fingerprints: Vec<PhaseFingerprint>,
    expected_phase_count: usize,
    questions_answered: usize,
    questions_total: usize,
    macro_percentage: Option<f64>,
}

impl ProofBuilder {
    pub fn new(run_id: impl Into<String>, expected_phase_count: usize) -> Self {
        Self {
            run_id: run_id.into(),
            pdf_sha256: None,
            questionnaire_sha256: None,
            task_plan_integrity_hash: None,
            catalog_hash: None,
            phase_fingerprints: Vec::new(),
            expected_phase_count,
            questions_answered: 0,
            questions_total: 0,
            macro_percentage: None,
        }
    }

    pub fn with_document_hashes(mut self, pdf_sha256: impl Into<String>, questionnaire_sha256: impl Into<String>) -> Self {
        self.pdf_sha256 = Some(pdf_sha256.into());
        self.questionnaire_sha256 = Some(questionnaire_sha256.into());
        self
    }

    pub fn with_task_plan_hash(mut self, hash: impl Into<String>) -> Self {
        self.task_plan_integrity_hash = Some(hash.into());
        self
    }

    pub fn with_catalog_hash(mut self, hash: impl Into<String>) -> Self {
        self.catalog_hash = Some(hash.into());
        self
    }

    pub fn record_phase(mut self, meta: &PhaseMetadata) -> Self {
        self.phase_fingerprints.push(PhaseFingerprint::from(meta));
        self
    }

    pub fn with_task_outcomes(mut self, questions_answered: usize, questions_total: usize) -> Self {
        self.questions_answered = questions_answered;
        self.questions_total = questions_total;
        self
    }

    pub fn with_aggregation(mut self, report: &AggregationReport) -> Self {
        self.macro_percentage = Some(report.macro_percentage);
        self
    }

    /// Seal the proof. Fails if any required artifact is missing or if
    /// fewer than `expected_phase_count` phases reported a fingerprint —
    /// an incomplete proof is rejected outright rather than emitted with
    /// placeholder fields.
    pub fn seal(self) -> Result<Proof> {
        if self.phase_fingerprints.len() != self.expected_phase_count {
            return Err(Error::validation(
                "proof",
                format!(
                    "{} of {} required phases reported a fingerprint",
                    self.phase_fingerprints.len(),
                    self.expected_phase_count
                ),
            ));
        }

        let pdf_sha256 = self
            .pdf_sha256
            .ok_or_else(|| Error::validation("proof", "missing pdf_sha256"))?;
        let questionnaire_sha256 = self
            .questionnaire_sha256
            .ok_or_else(|| Error::validation("proof", "missing questionnaire_sha256"))?;
        let task_plan_integrity_hash = self
            .task_plan_integrity_hash
            .ok_or_else(|| Error::validation("proof", "missing task_plan_integrity_hash"))?;
        let catalog_hash = self
            .catalog_hash
            .ok_or_else(|| Error::validation("proof", "missing catalog_hash"))?;
        let macro_percentage = self
            .macro_percentage
            .ok_or_else(|| Error::validation("proof", "missing aggregation report"))?;

        let unsealed = UnsealedProof {
            run_id: &self.run_id,
            pdf_sha256: &pdf_sha256,
            questionnaire_sha256: &questionnaire_sha256,
            task_plan_integrity_hash: &task_plan_integrity_hash,
            catalog_hash: &catalog_hash,
            phase_fingerprints: &self.phase_fingerprints,
            questions_answered: self.questions_answered,
            questions_total: self.questions_total,
            macro_percentage,
        };
        let hash = hashing::blake3_of(&unsealed)?;

        Ok(Proof {
            run_id: self.run_id,
            pdf_sha256,
            questionnaire_sha256,
            task_plan_integrity_hash,
            catalog_hash,
            phase_fingerprints: self.phase_fingerprints,
            questions_answered: self.questions_answered,
            questions_total: self.questions_total,
            macro_percentage,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ClassificationBand;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn phase_meta(name: &str) -> PhaseMetadata {
        let now = Utc::now();
        PhaseMetadata {
            phase_name: name.to_string(),
            started_at: now,
            finished_at: now,
            fingerprint: format!("fingerprint-{name}"),
        }
    }

    fn aggregation() -> AggregationReport {
        AggregationReport {
            cells: vec![],
            clusters: vec![],
            macro_score: 0.8,
            macro_percentage: 80.0,
            classification: ClassificationBand::Satisfactorio,
        }
    }

    #[test]
    fn test_seal_succeeds_when_complete() {
        let proof = ProofBuilder::new("run-1", 2)
            .with_document_hashes("a".repeat(64), "b".repeat(64))
            .with_task_plan_hash("c".repeat(64))
            .with_catalog_hash("d".repeat(64))
            .record_phase(&phase_meta("input_validation"))
            .record_phase(&phase_meta("document_ingestion"))
            .with_task_outcomes(300, 300)
            .with_aggregation(&aggregation())
            .seal()
            .unwrap();
        assert!(proof.is_sealed());
        assert!(proof.overall_success());
    }

    #[test]
    fn test_seal_rejects_incomplete_phase_set() {
        let result = ProofBuilder::new("run-1", 2)
            .with_document_hashes("a".repeat(64), "b".repeat(64))
            .with_task_plan_hash("c".repeat(64))
            .with_catalog_hash("d".repeat(64))
            .record_phase(&phase_meta("input_validation"))
            .with_task_outcomes(300, 300)
            .with_aggregation(&aggregation())
            .seal();
        assert!(result.is_err());
    }

    #[test]
    fn test_proof_allows_partial_task_failure_but_not_sealing_failure() {
        let proof = ProofBuilder::new("run-1", 1)
            .with_document_hashes("a".repeat(64), "b".repeat(64))
            .with_task_plan_hash("c".repeat(64))
            .with_catalog_hash("d".repeat(64))
            .record_phase(&phase_meta("input_validation"))
            .with_task_outcomes(295, 300)
            .with_aggregation(&aggregation())
            .seal()
            .unwrap();
        assert!(proof.is_sealed());
        assert!(!proof.overall_success());
    }

    #[test]
    fn test_verify_succeeds_on_untampered_proof() {
        let proof = ProofBuilder::new("run-1", 1)
            .with_document_hashes("a".repeat(64), "b".repeat(64))
            .with_task_plan_hash("c".repeat(64))
            .with_catalog_hash("d".repeat(64))
            .record_phase(&phase_meta("input_validation"))
            .with_task_outcomes(300, 300)
            .with_aggregation(&aggregation())
            .seal()
            .unwrap();
        assert!(proof.verify().unwrap());
    }

    #[test]
    fn test_verify_detects_tampered_field() {
        let mut proof = ProofBuilder::new("run-1", 1)
            .with_document_hashes("a".repeat(64), "b".repeat(64))
            .with_task_plan_hash("c".repeat(64))
            .with_catalog_hash("d".repeat(64))
            .record_phase(&phase_meta("input_validation"))
            .with_task_outcomes(300, 300)
            .with_aggregation(&aggregation())
            .seal()
            .unwrap();
        proof.questions_answered = 299;
        assert!(!proof.verify().unwrap());
    }

    #[test]
    fn test_hash_is_stable_for_identical_content() {
        let build = || {
            ProofBuilder::new("run-1", 1)
                .with_document_hashes("a".repeat(64), "b".repeat(64))
                .with_task_plan_hash("c".repeat(64))
                .with_catalog_hash("d".repeat(64))
                .record_phase(&phase_meta("input_validation"))
                .with_task_outcomes(300, 300)
                .with_aggregation(&aggregation())
                .seal()
                .unwrap()
        };
        assert_eq!(build(), build());
    }
}
