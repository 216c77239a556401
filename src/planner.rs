//! Task Planner / Irrigation Synchronizer: binds every micro-question to
//! exactly one chunk and produces the immutable, content-hashed
//! [`TaskPlan`] of 300 [`ExecutableTask`]s that the executor consumes.
//!
//! A frozen plan: 300-count and duplicate-id invariants plus a content
//! hash over sorted-key canonical JSON, all checked before ever handing
//! out an immutable plan.

use crate::error::{Error, Result};
use crate::ontology::{sort_by_policy_area_then_global, MicroQuestionId, PolicyAreaId, TOTAL_MICRO_QUESTIONS};
use crate::phases::phase3::ChunkRoutingResult;
use crate::phases::phase5::ResolvedSignals;
use crate::questionnaire::Questionnaire;
use serde::Serialize;
use std::collections::HashMap;

/// One fully-bound unit of work: a question, the chunk it routes to, its
/// resolved signals, and the method it will be dispatched to. Immutable
/// once constructed — nothing after planning may rebind a task's chunk or
/// signals.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutableTask {
    pub task_id: String,
    pub question_id: MicroQuestionId,
    pub chunk_id: String,
    pub method_class: String,
    pub method_name: String,
    pub resolved_signal_types: Vec<String>,
}

/// The complete, validated plan: exactly [`TOTAL_MICRO_QUESTIONS`] tasks,
/// each chunk referenced exactly [`crate::ontology::QUESTIONS_PER_CHUNK`]
/// times, each policy area referenced exactly 30 times, one integrity hash
/// over the canonical plan.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPlan {
    tasks: Vec<ExecutableTask>,
    integrity_hash: String,
}

impl TaskPlan {
    /// Assemble the plan from a questionnaire, its chunk routing, and its
    /// resolved signals, performing every cross-task validation before
    /// returning.
    pub fn assemble(
        questionnaire: &Questionnaire,
        routing: &[ChunkRoutingResult],
        signals: &[ResolvedSignals],
    ) -> Result<Self> {
        let routing_by_global: HashMap<u16, &ChunkRoutingResult> =
            routing.iter().map(|r| (r.question_global, r)).collect();
        let signals_by_global: HashMap<u16, &ResolvedSignals> =
            signals.iter().map(|s| (s.question_global, s)).collect();

        let mut tasks = Vec::with_capacity(questionnaire.questions().len());
        for question in questionnaire.questions() {
            let global = question.id.question_global;
            let route = routing_by_global.get(&global).ok_or_else(|| {
                Error::validation("planner", format!("question {global} has no routing result"))
            })?;
            let resolved = signals_by_global.get(&global).ok_or_else(|| {
                Error::validation("planner", format!("question {global} has no resolved signals"))
            })?;

            tasks.push(ExecutableTask {
                task_id: question.id.task_id(),
                question_id: question.id,
                chunk_id: route.chunk_id.clone(),
                method_class: question.method_class.clone(),
                method_name: question.method_name.clone(),
                resolved_signal_types: resolved.signals.iter().map(|s| s.signal_type.clone()).collect(),
            });
        }

        Self::from_tasks(tasks)
    }

    /// Build directly from a task list, running the same cross-validation
    /// `assemble` runs. Exposed so tests and alternate call sites can
    /// construct a plan without going through the full phase sequence.
    pub fn from_tasks(mut tasks: Vec<ExecutableTask>) -> Result<Self> {
        if tasks.len() != TOTAL_MICRO_QUESTIONS {
            return Err(Error::validation(
                "planner",
                format!("plan has {} tasks, expected {TOTAL_MICRO_QUESTIONS}", tasks.len()),
            ));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for task in &tasks {
            if !seen_ids.insert(task.task_id.clone()) {
                return Err(Error::validation("planner", format!("duplicate task_id {}", task.task_id)));
            }
        }

        let mut per_chunk: HashMap<String, u32> = HashMap::new();
        let mut per_pa: HashMap<PolicyAreaId, u32> = HashMap::new();
        for task in &tasks {
            *per_chunk.entry(task.chunk_id.clone()).or_insert(0) += 1;
            *per_pa.entry(task.question_id.slot.policy_area_id).or_insert(0) += 1;
        }
        if per_chunk.values().any(|count| *count != crate::ontology::QUESTIONS_PER_CHUNK as u32) {
            return Err(Error::validation(
                "planner",
                "a chunk is not referenced by exactly QUESTIONS_PER_CHUNK tasks",
            ));
        }
        if per_pa.values().any(|count| *count != 30) {
            return Err(Error::validation(
                "planner",
                "a policy area is not referenced by exactly 30 tasks",
            ));
        }

        let mut ids: Vec<MicroQuestionId> = tasks.iter().map(|t| t.question_id).collect();
        sort_by_policy_area_then_global(&mut ids);
        let order: HashMap<MicroQuestionId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        tasks.sort_by_key(|t| order[&t.question_id]);

        let integrity_hash = crate::hashing::blake3_of(&tasks)?;

        Ok(Self { tasks, integrity_hash })
    }

    pub fn tasks(&self) -> &[ExecutableTask] {
        &self.tasks
    }

    pub fn integrity_hash(&self) -> &str {
        &self.integrity_hash
    }
}
