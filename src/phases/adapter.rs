//! Preprocessing adapter: reindexes the Canon Policy Package by its
//! string `chunk_id` (the key every downstream routing/signal lookup
//! actually uses) and attaches the signal stores chunk routing and signal
//! resolution will need.

use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::phases::phase1::CanonPolicyPackage;
use crate::signals::ChunkSignals;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct PreprocessedChunk {
    pub chunk_id: String,
    pub text: String,
    pub content_hash: String,
}

/// The document reindexed by chunk_id, ready for chunk routing.
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessedDocument {
    pub run_id: String,
    chunks_by_id: HashMap<String, PreprocessedChunk>,
}

impl PreprocessedDocument {
    pub fn chunk(&self, chunk_id: &str) -> Option<&PreprocessedChunk> {
        self.chunks_by_id.get(chunk_id)
    }

    pub fn len(&self) -> usize {
        self.chunks_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks_by_id.is_empty()
    }

    /// Build an empty [`crate::signals::ChunkSignals`] store per chunk so
    /// the signal resolution phase has a registration target even when the
    /// injected signal extractor contributes nothing for a given chunk.
    pub fn empty_signal_stores(&self) -> HashMap<String, ChunkSignals> {
        self.chunks_by_id
            .keys()
            .map(|id| (id.clone(), ChunkSignals::new()))
            .collect()
    }
}

pub struct PreprocessingAdapter;

impl PhaseContract for PreprocessingAdapter {
    type Input = CanonPolicyPackage;
    type Output = PreprocessedDocument;

    fn name(&self) -> &str {
        "preprocessing_adapter"
    }

    fn validate_input(&self, input: &CanonPolicyPackage) -> Result<()> {
        if input.is_empty() {
            return Err(Error::validation("preprocessing_adapter", "empty Canon Policy Package"));
        }
        Ok(())
    }

    fn execute(&self, input: CanonPolicyPackage) -> Result<PreprocessedDocument> {
        let run_id = input.run_id.clone();
        let mut chunks_by_id = HashMap::new();
        for chunk in input.chunks() {
            let chunk_id = chunk.slot.chunk_id();
            chunks_by_id.insert(
                chunk_id.clone(),
                PreprocessedChunk {
                    chunk_id,
                    text: chunk.text.clone(),
                    content_hash: chunk.content_hash.clone(),
                },
            );
        }
        Ok(PreprocessedDocument { run_id, chunks_by_id })
    }

    fn validate_output(&self, output: &PreprocessedDocument) -> Result<()> {
        if output.is_empty() {
            return Err(Error::validation("preprocessing_adapter", "no chunks survived reindexing"));
        }
        Ok(())
    }

    fn invariants(&self, output: &PreprocessedDocument) -> Vec<(&'static str, bool)> {
        vec![(
            "chunk_ids_unique",
            output.chunks_by_id.len() == output.chunks_by_id.keys().collect::<std::collections::HashSet<_>>().len(),
        )]
    }
}
