//! Error taxonomy for quaestor-core.

use thiserror::Error;

/// Result type alias using quaestor-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running or verifying the pipeline.
///
/// Variant names track the taxonomy of failure *kinds*, not Rust types —
/// each maps to a specific propagation rule in the phase contract framework.
#[derive(Error, Debug)]
pub enum Error {
    /// Contract input/output or declared-invariant failure. Aborts the phase.
    #[error("validation failed in phase '{phase}': {message}")]
    Validation { phase: String, message: String },

    /// A question's (policy_area_id, dimension_id) chunk could not be routed.
    #[error(
        "routing failed for {question_id} (PA={policy_area_id}, DIM={dimension_id}): {message}"
    )]
    Routing {
        question_id: String,
        policy_area_id: String,
        dimension_id: String,
        message: String,
    },

    /// A required signal type could not be resolved from the registry.
    #[error("signal '{signal_type}' missing from registry for question {question_id}")]
    SignalMissing {
        question_id: String,
        signal_type: String,
    },

    /// A method referenced by an executor sequence has no intrinsic calibration.
    #[error("method '{method_id}' has no intrinsic calibration entry")]
    IntrinsicMissing { method_id: String },

    /// A method's aggregated calibration score fell below the configured threshold.
    #[error("method '{method_id}' scored {score:.4}, below threshold {threshold:.4}")]
    BelowThreshold {
        method_id: String,
        score: f64,
        threshold: f64,
    },

    /// A method's intrinsic record is present but marked excluded from
    /// calibration; distinct from [`Error::IntrinsicMissing`] — missing
    /// fails the run entirely, excluded fails the run for that method.
    #[error("method '{method_id}' is excluded from calibration")]
    MethodExcluded { method_id: String },

    /// A method invocation exceeded its declared timeout.
    #[error("method '{method_id}' timed out after {timeout_ms}ms")]
    MethodTimeout { method_id: String, timeout_ms: u64 },

    /// A method exhausted its configured retry budget.
    #[error("method '{method_id}' exhausted {attempts} retry attempts")]
    MethodRetryExhausted { method_id: String, attempts: u32 },

    /// A content hash did not match its expected value; the run is unsafe.
    #[error("integrity check failed for '{artifact}': expected {expected}, got {actual}")]
    Integrity {
        artifact: String,
        expected: String,
        actual: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error reading an input artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline configuration was invalid or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant violated; indicates a bug rather than bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn routing(
        question_id: impl Into<String>,
        policy_area_id: impl Into<String>,
        dimension_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Routing {
            question_id: question_id.into(),
            policy_area_id: policy_area_id.into(),
            dimension_id: dimension_id.into(),
            message: message.into(),
        }
    }

    pub fn signal_missing(question_id: impl Into<String>, signal_type: impl Into<String>) -> Self {
        Self::SignalMissing {
            question_id: question_id.into(),
            signal_type: signal_type.into(),
        }
    }

    pub fn below_threshold(method_id: impl Into<String>, score: f64, threshold: f64) -> Self {
        Self::BelowThreshold {
            method_id: method_id.into(),
            score,
            threshold,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
