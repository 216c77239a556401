//! Calibration layer identifiers: the up-to-eight scoring dimensions a
//! method-in-context is evaluated against (`@b`, `@u`, `@q`, `@d`, `@p`,
//! `@C_cong`, `@chain`, `@m`).
//!
//! Distinct from [`crate::catalog::ExecutionStage`], which orders the
//! method-sequence a catalog entry declares for dispatch. A method's
//! calibration layers and its execution stages are two independent
//! eight-element sets that happen to share a cardinality, not one concept
//! wearing two names.

use serde::{Deserialize, Serialize};

/// A calibration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationLayer {
    /// `@b` — intrinsic/base score.
    Base,
    /// `@u` — unit quality.
    Unit,
    /// `@q` — contextual compatibility, policy-question axis.
    ContextQ,
    /// `@d` — contextual compatibility, dimension axis.
    ContextD,
    /// `@p` — contextual compatibility, policy-area axis.
    ContextP,
    /// `@C_cong` — congruence with the layers already scored this call.
    Congruence,
    /// `@chain` — chain integrity: declared vs. observed call signature.
    Chain,
    /// `@m` — meta/governance.
    Meta,
}

/// Canonical evaluation order. A method's declared `required_layers` may
/// list these in any order; the orchestrator always evaluates (and, for
/// the congruence layer, accumulates) in this order.
pub const CALIBRATION_LAYER_ORDER: [CalibrationLayer; 8] = [
    CalibrationLayer::Base,
    CalibrationLayer::Unit,
    CalibrationLayer::ContextQ,
    CalibrationLayer::ContextD,
    CalibrationLayer::ContextP,
    CalibrationLayer::Congruence,
    CalibrationLayer::Chain,
    CalibrationLayer::Meta,
];

impl CalibrationLayer {
    /// The contextual axis this layer reads from [`super::data::MethodCompatibility`],
    /// or `None` for a non-contextual layer.
    pub fn context_axis(self) -> Option<ContextAxis> {
        match self {
            Self::ContextQ => Some(ContextAxis::Q),
            Self::ContextD => Some(ContextAxis::D),
            Self::ContextP => Some(ContextAxis::P),
            _ => None,
        }
    }
}

/// The three contextual compatibility axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAxis {
    Q,
    D,
    P,
}
