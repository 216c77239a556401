//! Phase 3 — chunk routing: binds every micro-question to exactly one of
//! the 60 chunks via its `(policy_area_id, dimension_id)` coordinate.
//!
//! Duplicate `(PA, DIM)` keys are rejected before the 60-entry count is
//! even checked, dimension aliases are normalized before comparison, and
//! a question whose declared PA/DIM does not match its resolved chunk is
//! a routing error naming the question.

use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::ontology::{BaseSlot, DimensionId, PolicyAreaId, DIMENSION_COUNT, POLICY_AREA_COUNT};
use crate::phases::adapter::PreprocessedDocument;
use crate::questionnaire::{MicroQuestion, Questionnaire};
use serde::Serialize;
use std::collections::HashMap;

/// The validated chunk matrix: exactly 60 unique `(PA, DIM)` entries.
#[derive(Debug, Clone)]
pub struct ChunkMatrix {
    slots: HashMap<BaseSlot, String>,
}

impl ChunkMatrix {
    /// Build from a preprocessed document, rejecting a duplicate slot key
    /// before ever reaching the cardinality check.
    pub fn build(document: &PreprocessedDocument) -> Result<Self> {
        let mut slots = HashMap::new();
        for pa in 1..=POLICY_AREA_COUNT as u8 {
            for dim in 1..=DIMENSION_COUNT as u8 {
                let slot = BaseSlot::new(PolicyAreaId::new(pa)?, DimensionId::new(dim)?);
                let chunk_id = slot.chunk_id();
                let chunk = document.chunk(&chunk_id).ok_or_else(|| {
                    Error::validation("chunk_routing", format!("missing chunk for slot {slot}"))
                })?;
                if slots.insert(slot, chunk.chunk_id.clone()).is_some() {
                    return Err(Error::validation(
                        "chunk_routing",
                        format!("duplicate chunk matrix entry for slot {slot}"),
                    ));
                }
            }
        }
        if slots.len() != POLICY_AREA_COUNT * DIMENSION_COUNT {
            return Err(Error::validation(
                "chunk_routing",
                format!(
                    "chunk matrix has {} entries, expected {}",
                    slots.len(),
                    POLICY_AREA_COUNT * DIMENSION_COUNT
                ),
            ));
        }
        Ok(Self { slots })
    }

    pub fn chunk_id_for(&self, slot: BaseSlot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One question's routing result: the chunk it was bound to, and the
/// normalized PA/DIM the binding was derived from.
///
/// The seven canonical fields of a routing result: `target_chunk` and
/// `chunk_id` name the same underlying chunk (this kernel has only one
/// chunk-identifier concept); `text_content` and `expected_elements` are
/// never null (an unrouted chunk fails routing outright; a question with
/// no declared elements carries an empty list); `document_position` is
/// always `None` since no byte-span data survives preprocessing.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRoutingResult {
    pub question_global: u16,
    pub policy_area_id: String,
    pub dimension_id: String,
    pub chunk_id: String,
    pub target_chunk: String,
    pub text_content: String,
    pub expected_elements: Vec<String>,
    pub document_position: Option<usize>,
}

/// Route a single question's declared (possibly aliased) dimension against
/// the chunk matrix, raising a routing error naming the question on any
/// mismatch.
fn route_question_to_chunk(
    question: &MicroQuestion,
    raw_dimension_alias: &str,
    matrix: &ChunkMatrix,
    document: &PreprocessedDocument,
) -> Result<ChunkRoutingResult> {
    let normalized_dim = DimensionId::normalize(raw_dimension_alias).map_err(|e| {
        Error::routing(
            question.id.task_id(),
            question.policy_area_id().to_string(),
            raw_dimension_alias.to_string(),
            e.to_string(),
        )
    })?;

    if normalized_dim != question.dimension_id() {
        return Err(Error::routing(
            question.id.task_id(),
            question.policy_area_id().to_string(),
            raw_dimension_alias.to_string(),
            format!(
                "question declares dimension {} but alias normalized to {normalized_dim}",
                question.dimension_id()
            ),
        ));
    }

    let slot = BaseSlot::new(question.policy_area_id(), normalized_dim);
    let chunk_id = matrix.chunk_id_for(slot).ok_or_else(|| {
        Error::routing(
            question.id.task_id(),
            question.policy_area_id().to_string(),
            normalized_dim.to_string(),
            format!("no chunk registered for slot {slot}"),
        )
    })?;
    let text_content = document
        .chunk(chunk_id)
        .ok_or_else(|| {
            Error::routing(
                question.id.task_id(),
                question.policy_area_id().to_string(),
                normalized_dim.to_string(),
                format!("chunk '{chunk_id}' registered in matrix but absent from document"),
            )
        })?
        .text
        .clone();

    Ok(ChunkRoutingResult {
        question_global: question.id.question_global,
        policy_area_id: question.policy_area_id().to_string(),
        dimension_id: normalized_dim.to_string(),
        chunk_id: chunk_id.to_string(),
        target_chunk: chunk_id.to_string(),
        text_content,
        expected_elements: question.expected_elements.clone(),
        document_position: None,
    })
}

#[derive(Serialize)]
pub struct ChunkRoutingOutput {
    pub results: Vec<ChunkRoutingResult>,
}

pub struct ChunkRoutingInput<'a> {
    pub questionnaire: &'a Questionnaire,
    pub document: &'a PreprocessedDocument,
}

pub struct ChunkRoutingPhase<'a>(std::marker::PhantomData<&'a ()>);

impl<'a> ChunkRoutingPhase<'a> {
    pub const fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<'a> Default for ChunkRoutingPhase<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PhaseContract for ChunkRoutingPhase<'a> {
    type Input = ChunkRoutingInput<'a>;
    type Output = ChunkRoutingOutput;

    fn name(&self) -> &str {
        "chunk_routing"
    }

    fn validate_input(&self, input: &ChunkRoutingInput<'a>) -> Result<()> {
        if input.questionnaire.questions().is_empty() {
            return Err(Error::validation("chunk_routing", "questionnaire has no questions"));
        }
        Ok(())
    }

    fn execute(&self, input: ChunkRoutingInput<'a>) -> Result<ChunkRoutingOutput> {
        let matrix = ChunkMatrix::build(input.document)?;
        let mut results = Vec::with_capacity(input.questionnaire.questions().len());
        for question in input.questionnaire.questions() {
            let result = route_question_to_chunk(
                question,
                &question.dimension_id().to_string(),
                &matrix,
                input.document,
            )?;
            results.push(result);
        }
        Ok(ChunkRoutingOutput { results })
    }

    fn validate_output(&self, output: &ChunkRoutingOutput) -> Result<()> {
        if output.results.is_empty() {
            return Err(Error::validation("chunk_routing", "no questions were routed"));
        }
        Ok(())
    }

    fn invariants(&self, output: &ChunkRoutingOutput) -> Vec<(&'static str, bool)> {
        let mut per_pa: HashMap<String, u32> = HashMap::new();
        for r in &output.results {
            *per_pa.entry(r.policy_area_id.clone()).or_insert(0) += 1;
        }
        let routing_completeness = output.results.len() == crate::ontology::TOTAL_MICRO_QUESTIONS;
        let policy_area_distribution_sum = per_pa.values().all(|count| *count == 30);
        vec![
            ("routing_completeness", routing_completeness),
            ("policy_area_distribution_sum", policy_area_distribution_sum),
        ]
    }
}
