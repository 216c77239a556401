//! Phase 1 — document ingestion: turns validated document bytes into the
//! Canon Policy Package (CPP), the fixed 60-chunk matrix every micro-
//! question is eventually routed against.
//!
//! Extracting structured chunks from a PDF's bytes is itself out of
//! scope here — this phase takes a [`DocumentParser`] trait object as
//! injected dependency and only owns
//! the validation that whatever the parser returns actually forms a
//! complete, non-overlapping 60-chunk matrix.

use crate::contract::PhaseContract;
use crate::error::{Error, Result};
use crate::ontology::{BaseSlot, DIMENSION_COUNT, POLICY_AREA_COUNT};
use crate::phases::phase0::ValidatedInput;
use serde::Serialize;
use std::collections::HashMap;

/// One extracted chunk of the source document, bound to a chunk slot.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub slot: BaseSlot,
    pub text: String,
    pub content_hash: String,
}

/// Injected document parser: given validated raw bytes, produce the raw
/// `(slot, text)` extraction this phase will validate and hash.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, pdf_bytes: &[u8]) -> Result<Vec<(BaseSlot, String)>>;
}

/// The complete, validated 60-chunk Canon Policy Package.
#[derive(Debug, Clone, Serialize)]
pub struct CanonPolicyPackage {
    #[serde(serialize_with = "serialize_chunks_by_slot_id")]
    chunks: HashMap<BaseSlot, Chunk>,
    pub run_id: String,
}

/// `BaseSlot` is a struct, not a string, so it can't be used directly as a
/// JSON object key; serialize by its canonical `chunk_id()` string instead,
/// sorted for a deterministic fingerprint.
fn serialize_chunks_by_slot_id<S>(chunks: &HashMap<BaseSlot, Chunk>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut entries: Vec<(String, &Chunk)> = chunks.iter().map(|(slot, chunk)| (slot.chunk_id(), chunk)).collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, chunk) in entries {
        map.serialize_entry(&key, chunk)?;
    }
    map.end()
}

impl CanonPolicyPackage {
    pub fn chunk(&self, slot: BaseSlot) -> Option<&Chunk> {
        self.chunks.get(&slot)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub struct DocumentIngestionInput {
    pub validated: ValidatedInput,
    pub pdf_bytes: Vec<u8>,
}

pub struct DocumentIngestionPhase<'a> {
    pub parser: &'a dyn DocumentParser,
}

impl<'a> PhaseContract for DocumentIngestionPhase<'a> {
    type Input = DocumentIngestionInput;
    type Output = CanonPolicyPackage;

    fn name(&self) -> &str {
        "document_ingestion"
    }

    fn validate_input(&self, input: &DocumentIngestionInput) -> Result<()> {
        if input.pdf_bytes.is_empty() {
            return Err(Error::validation("document_ingestion", "no document bytes to ingest"));
        }
        if crate::hashing::sha256_hex(&input.pdf_bytes) != input.validated.pdf_sha256 {
            return Err(Error::Integrity {
                artifact: "pdf_bytes".to_string(),
                expected: input.validated.pdf_sha256.clone(),
                actual: crate::hashing::sha256_hex(&input.pdf_bytes),
            });
        }
        Ok(())
    }

    fn execute(&self, input: DocumentIngestionInput) -> Result<CanonPolicyPackage> {
        let extracted = self.parser.parse(&input.pdf_bytes)?;
        let mut chunks = HashMap::with_capacity(extracted.len());
        for (slot, text) in extracted {
            if chunks.contains_key(&slot) {
                return Err(Error::validation(
                    "document_ingestion",
                    format!("duplicate chunk extracted for slot {slot}"),
                ));
            }
            let content_hash = crate::hashing::blake3_hex(text.as_bytes());
            chunks.insert(slot, Chunk { slot, text, content_hash });
        }
        Ok(CanonPolicyPackage {
            chunks,
            run_id: input.validated.run_id,
        })
    }

    fn validate_output(&self, output: &CanonPolicyPackage) -> Result<()> {
        let expected = POLICY_AREA_COUNT * DIMENSION_COUNT;
        if output.len() != expected {
            return Err(Error::validation(
                "document_ingestion",
                format!("extracted {} chunks, expected {expected}", output.len()),
            ));
        }
        Ok(())
    }

    fn invariants(&self, output: &CanonPolicyPackage) -> Vec<(&'static str, bool)> {
        vec![(
            "all_chunks_nonempty",
            output.chunks().all(|c| !c.text.trim().is_empty()),
        )]
    }
}
