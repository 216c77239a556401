//! Canonical Questionnaire: the fixed, content-hashed set of 300
//! micro-questions every run is scored against.
//!
//! Loaded once from an externally authored JSON document (authoring format
//! itself is out of scope); this module only validates structure, enforces
//! cardinality, and computes the integrity hash every later phase checks
//! its questionnaire reference against.

use crate::error::{Error, Result};
use crate::hashing;
use crate::ontology::{BaseSlot, DimensionId, MicroQuestionId, PolicyAreaId, TOTAL_MICRO_QUESTIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single signal requirement declared by a micro-question: the signal
/// type a method needs resolved before it can execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequirementSpec {
    pub signal_type: String,
}

/// One of the 300 fixed micro-questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroQuestion {
    pub id: MicroQuestionId,
    pub prompt: String,
    pub method_class: String,
    pub method_name: String,
    #[serde(default)]
    pub signal_requirements: Vec<SignalRequirementSpec>,
    /// Ordered list of elements a conforming answer must address. Empty is
    /// allowed; never null once deserialized (defaults to empty).
    #[serde(default)]
    pub expected_elements: Vec<String>,
}

impl MicroQuestion {
    pub fn policy_area_id(&self) -> PolicyAreaId {
        self.id.slot.policy_area_id
    }

    pub fn dimension_id(&self) -> DimensionId {
        self.id.slot.dimension_id
    }

    pub fn chunk_id(&self) -> String {
        self.id.slot.chunk_id()
    }
}

/// The full, immutable questionnaire: exactly [`TOTAL_MICRO_QUESTIONS`]
/// micro-questions, one integrity hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    questions: Vec<MicroQuestion>,
    integrity_hash: String,
}

impl Questionnaire {
    /// Build and validate a questionnaire from its raw question list.
    ///
    /// Validates: exactly 300 questions, unique `question_global` across
    /// 1..=300, unique `(policy_area_id, dimension_id, slot_ordinal)`
    /// triples, and that every `BaseSlot` implied by a question is covered
    /// by exactly five questions (the `QUESTIONS_PER_CHUNK` invariant).
    pub fn new(questions: Vec<MicroQuestion>) -> Result<Self> {
        if questions.len() != TOTAL_MICRO_QUESTIONS {
            return Err(Error::validation(
                "questionnaire",
                format!(
                    "expected {TOTAL_MICRO_QUESTIONS} micro-questions, found {}",
                    questions.len()
                ),
            ));
        }

        let mut globals = HashSet::new();
        let mut per_slot: std::collections::HashMap<BaseSlot, u32> = std::collections::HashMap::new();
        for q in &questions {
            if !globals.insert(q.id.question_global) {
                return Err(Error::validation(
                    "questionnaire",
                    format!("duplicate question_global {}", q.id.question_global),
                ));
            }
            *per_slot.entry(q.id.slot).or_insert(0) += 1;
        }

        for (slot, count) in &per_slot {
            if *count != crate::ontology::QUESTIONS_PER_CHUNK as u32 {
                return Err(Error::validation(
                    "questionnaire",
                    format!("slot {slot} has {count} questions, expected {}", crate::ontology::QUESTIONS_PER_CHUNK),
                ));
            }
        }

        let expected_slots = crate::ontology::POLICY_AREA_COUNT * crate::ontology::DIMENSION_COUNT;
        if per_slot.len() != expected_slots {
            return Err(Error::validation(
                "questionnaire",
                format!(
                    "questionnaire covers {} chunk slots, expected {expected_slots}",
                    per_slot.len()
                ),
            ));
        }

        let mut sorted = questions;
        sorted.sort_by_key(|q| q.id.question_global);
        let integrity_hash = hashing::blake3_of(&sorted)?;

        Ok(Self {
            questions: sorted,
            integrity_hash,
        })
    }

    pub fn integrity_hash(&self) -> &str {
        &self.integrity_hash
    }

    pub fn questions(&self) -> &[MicroQuestion] {
        &self.questions
    }

    pub fn question_by_global(&self, question_global: u16) -> Option<&MicroQuestion> {
        self.questions
            .iter()
            .find(|q| q.id.question_global == question_global)
    }

    pub fn questions_in_policy_area(&self, pa: PolicyAreaId) -> impl Iterator<Item = &MicroQuestion> {
        self.questions.iter().filter(move |q| q.policy_area_id() == pa)
    }
}
