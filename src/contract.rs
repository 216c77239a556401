//! Phase Contract Framework: the generic `validate_input → execute →
//! validate_output` pipeline every phase in the sequence implements.
//!
//! Grounded in the same separation-of-concerns shape as a staged workflow
//! phase trait (one entry point, declared invariants, structured metadata
//! describing what ran) but specialized to this kernel's requirement that
//! every phase also produce a content-addressed fingerprint of its output
//! for the eventual proof.

use crate::error::Result;
use crate::hashing;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata recorded for one phase run: timing plus the content hash of
/// its output, which never includes the timing fields themselves — two
/// runs that produce identical output at different wall-clock times must
/// fingerprint identically.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseMetadata {
    pub phase_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fingerprint: String,
}

impl PhaseMetadata {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// The result of running one phase to completion: its typed output plus
/// the metadata the proof builder will fold in later.
#[derive(Debug, Clone)]
pub struct PhaseOutcome<O> {
    pub output: O,
    pub metadata: PhaseMetadata,
}

/// A single phase in the sequence: typed input, typed output, a name for
/// logging/fingerprinting, a list of declared invariants checked against
/// the output, and the one entry point ([`PhaseContract::run`]) that drives
/// validate → execute → validate → invariants → fingerprint.
///
/// Implementors provide [`validate_input`], [`execute`], [`validate_output`]
/// and [`invariants`]; [`run`] is not meant to be overridden.
pub trait PhaseContract {
    type Input;
    type Output: Serialize;

    /// Name used in error messages, log spans, and the proof's phase list.
    fn name(&self) -> &str;

    /// Reject malformed or out-of-contract input before any work happens.
    fn validate_input(&self, input: &Self::Input) -> Result<()>;

    /// Do the phase's work. Only called after `validate_input` succeeds.
    fn execute(&self, input: Self::Input) -> Result<Self::Output>;

    /// Reject an output that executed without error but still violates the
    /// phase's contract (distinct from `invariants`, which checks named,
    /// individually reportable properties rather than raw well-formedness).
    fn validate_output(&self, output: &Self::Output) -> Result<()>;

    /// Named invariants checked against a successful output. Each entry is
    /// `(invariant_name, holds)`; `run` fails loudly naming the first
    /// invariant that does not hold, rather than a generic validation
    /// error, so a failure can be traced straight back to its contract
    /// clause.
    fn invariants(&self, output: &Self::Output) -> Vec<(&'static str, bool)>;

    /// Drive the full phase lifecycle and produce a [`PhaseOutcome`].
    fn run(&self, input: Self::Input) -> Result<PhaseOutcome<Self::Output>> {
        let started_at = Utc::now();
        tracing::debug!(phase = self.name(), "phase starting");
        self.validate_input(&input)?;
        let output = self.execute(input)?;
        self.validate_output(&output)?;

        for (invariant_name, holds) in self.invariants(&output) {
            if !holds {
                tracing::warn!(phase = self.name(), invariant = invariant_name, "phase invariant failed");
                return Err(crate::error::Error::validation(
                    self.name(),
                    format!("invariant '{invariant_name}' failed"),
                ));
            }
        }

        let fingerprint = hashing::blake3_of(&output)?;
        let finished_at = Utc::now();

        tracing::info!(
            phase = self.name(),
            fingerprint = %fingerprint,
            duration_ms = (finished_at - started_at).num_milliseconds(),
            "phase completed"
        );

        Ok(PhaseOutcome {
            output,
            metadata: PhaseMetadata {
                phase_name: self.name().to_string(),
                started_at,
                finished_at,
                fingerprint,
            },
        })
    }
}
