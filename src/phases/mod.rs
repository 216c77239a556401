//! The phase sequence: input validation, document ingestion, the
//! preprocessing adapter, chunk routing, and signal resolution.
//!
//! Every phase here is a [`crate::contract::PhaseContract`] implementation;
//! task planning, method execution, calibration, evidence recording,
//! aggregation, and proof sealing live in their own top-level modules since
//! they are not phases in the `validate → execute → validate` sense — they
//! consume a completed phase sequence rather than being one stage of it.

pub mod adapter;
pub mod phase0;
pub mod phase1;
pub mod phase3;
pub mod phase5;

pub use adapter::{PreprocessedDocument, PreprocessingAdapter};
pub use phase0::{InputValidationPhase, ValidatedInput};
pub use phase1::{CanonPolicyPackage, Chunk, DocumentIngestionPhase, DocumentParser};
pub use phase3::{ChunkMatrix, ChunkRoutingPhase, ChunkRoutingResult};
pub use phase5::SignalResolutionPhase;
