//! Phase 5 — signal resolution: resolves every micro-question's declared
//! signal requirements against its routed chunk, failing loudly (and
//! naming the question) on the first missing signal rather than silently
//! proceeding with partial context.

use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::phases::phase3::ChunkRoutingResult;
use crate::questionnaire::Questionnaire;
use crate::signals::{SignalRegistry, SignalRequirement};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSignals {
    pub question_global: u16,
    pub chunk_id: String,
    pub signals: Vec<ResolvedSignalEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSignalEntry {
    pub signal_type: String,
}

impl From<&SignalRequirement> for ResolvedSignalEntry {
    fn from(req: &SignalRequirement) -> Self {
        Self {
            signal_type: req.signal_type.clone(),
        }
    }
}

pub struct SignalResolutionInput<'a> {
    pub questionnaire: &'a Questionnaire,
    pub routing: &'a [ChunkRoutingResult],
    pub registry: &'a SignalRegistry,
}

#[derive(Serialize)]
pub struct SignalResolutionOutput {
    pub resolved: Vec<ResolvedSignals>,
}

pub struct SignalResolutionPhase<'a>(std::marker::PhantomData<&'a ()>);

impl<'a> SignalResolutionPhase<'a> {
    pub const fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<'a> Default for SignalResolutionPhase<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PhaseContract for SignalResolutionPhase<'a> {
    type Input = SignalResolutionInput<'a>;
    type Output = SignalResolutionOutput;

    fn name(&self) -> &str {
        "signal_resolution"
    }

    fn validate_input(&self, input: &SignalResolutionInput<'a>) -> Result<()> {
        if input.routing.is_empty() {
            return Err(Error::validation("signal_resolution", "no routing results to resolve signals for"));
        }
        Ok(())
    }

    fn execute(&self, input: SignalResolutionInput<'a>) -> Result<SignalResolutionOutput> {
        let routing_by_global: HashMap<u16, &ChunkRoutingResult> = input
            .routing
            .iter()
            .map(|r| (r.question_global, r))
            .collect();

        let mut resolved = Vec::with_capacity(input.routing.len());
        for question in input.questionnaire.questions() {
            let route = routing_by_global.get(&question.id.question_global).ok_or_else(|| {
                Error::validation(
                    "signal_resolution",
                    format!("question {} was never routed to a chunk", question.id.task_id()),
                )
            })?;

            let signal_types: Vec<String> = question
                .signal_requirements
                .iter()
                .map(|r| r.signal_type.clone())
                .collect();

            let requirements = input.registry.resolve(&question.id.task_id(), &route.chunk_id, &signal_types)?;

            resolved.push(ResolvedSignals {
                question_global: question.id.question_global,
                chunk_id: route.chunk_id.clone(),
                signals: requirements.iter().map(ResolvedSignalEntry::from).collect(),
            });
        }

        Ok(SignalResolutionOutput { resolved })
    }

    fn validate_output(&self, output: &SignalResolutionOutput) -> Result<()> {
        if output.resolved.is_empty() {
            return Err(Error::validation("signal_resolution", "resolved no questions"));
        }
        Ok(())
    }

    fn invariants(&self, output: &SignalResolutionOutput) -> Vec<(&'static str, bool)> {
        vec![(
            "one_resolution_per_question",
            output.resolved.len()
                == output
                    .resolved
                    .iter()
                    .map(|r| r.question_global)
                    .collect::<std::collections::HashSet<_>>()
                    .len(),
        )]
    }
}
