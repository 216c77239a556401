//! Calibration: scoring a method's output against up to eight layers of
//! requirements, aggregated through a Choquet 2-additive integral (for
//! executor-role methods) or a weighted sum (for every other role), gated
//! by a configurable minimum threshold.

pub mod choquet;
pub mod data;
pub mod layer;
pub mod orchestrator;

pub use choquet::{capacity_table_bytes, ChoquetAggregator, DEFAULT_CAPACITY};
pub use data::{
    CalibrationStatus, IntrinsicCalibration, IntrinsicRecord, MethodCompatibility, MethodRole,
    MethodSignatures, Thresholds,
};
pub use layer::{CalibrationLayer, ContextAxis, CALIBRATION_LAYER_ORDER};
pub use orchestrator::{CalibrationOrchestrator, CalibrationVerdict, LayerScore};
