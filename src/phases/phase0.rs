//! Phase 0 — input validation: the pipeline's first gate. Confirms the
//! uploaded document and the questionnaire are both present, well-formed,
//! and hashed, before anything downstream is allowed to run.

use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::hashing;
use serde::Serialize;

/// Raw input handed to the kernel: a document's bytes and the
/// caller-declared questionnaire hash it expects to be scored against.
pub struct RawInput {
    pub pdf_bytes: Vec<u8>,
    pub expected_questionnaire_sha256: String,
    pub run_id: String,
}

/// Output of input validation: the computed hashes every later phase will
/// cross-check its own inputs against.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedInput {
    pub pdf_sha256: String,
    pub questionnaire_sha256: String,
    pub run_id: String,
    pub pdf_byte_len: usize,
}

pub struct InputValidationPhase;

impl PhaseContract for InputValidationPhase {
    type Input = RawInput;
    type Output = ValidatedInput;

    fn name(&self) -> &str {
        "input_validation"
    }

    fn validate_input(&self, input: &RawInput) -> Result<()> {
        if input.pdf_bytes.is_empty() {
            return Err(Error::validation("input_validation", "document is empty"));
        }
        if !hashing::is_hex64(&input.expected_questionnaire_sha256) {
            return Err(Error::validation(
                "input_validation",
                "expected_questionnaire_sha256 is not a 64-char hex digest",
            ));
        }
        if input.run_id.trim().is_empty() {
            return Err(Error::validation("input_validation", "run_id is empty"));
        }
        Ok(())
    }

    fn execute(&self, input: RawInput) -> Result<ValidatedInput> {
        let pdf_sha256 = hashing::sha256_hex(&input.pdf_bytes);
        Ok(ValidatedInput {
            pdf_byte_len: input.pdf_bytes.len(),
            pdf_sha256,
            questionnaire_sha256: input.expected_questionnaire_sha256,
            run_id: input.run_id,
        })
    }

    fn validate_output(&self, output: &ValidatedInput) -> Result<()> {
        if !hashing::is_hex64(&output.pdf_sha256) {
            return Err(Error::validation("input_validation", "pdf_sha256 malformed"));
        }
        Ok(())
    }

    fn invariants(&self, output: &ValidatedInput) -> Vec<(&'static str, bool)> {
        vec![
            ("pdf_has_bytes", output.pdf_byte_len > 0),
            ("questionnaire_hash_well_formed", hashing::is_hex64(&output.questionnaire_sha256)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input_passes() {
        let input = RawInput {
            pdf_bytes: b"%PDF-1.4 fake".to_vec(),
            expected_questionnaire_sha256: "a".repeat(64),
            run_id: "run-001".to_string(),
        };
        let outcome = InputValidationPhase.run(input).unwrap();
        assert_eq!(outcome.output.pdf_sha256.len(), 64);
    }

    #[test]
    fn test_empty_document_rejected() {
        let input = RawInput {
            pdf_bytes: vec![],
            expected_questionnaire_sha256: "a".repeat(64),
            run_id: "run-001".to_string(),
        };
        assert!(InputValidationPhase.run(input).is_err());
    }

    #[test]
    fn test_malformed_questionnaire_hash_rejected() {
        let input = RawInput {
            pdf_bytes: b"bytes".to_vec(),
            expected_questionnaire_sha256: "not-hex".to_string(),
            run_id: "run-001".to_string(),
        };
        assert!(InputValidationPhase.run(input).is_err());
    }

    #[test]
    fn test_blank_run_id_rejected() {
        let input = RawInput {
            pdf_bytes: b"bytes".to_vec(),
            expected_questionnaire_sha256: "a".repeat(64),
            run_id: "   ".to_string(),
        };
        assert!(InputValidationPhase.run(input).is_err());
    }
}
