//! Content-hashing helpers shared by every content-addressed artifact.
//!
//! `sha2` produces the externally-specified hex-64 digests
//! (`pdf_sha256`, `questionnaire_sha256`); `blake3` produces every other
//! internal content hash (chunk hashes, phase fingerprints, evidence
//! record ids, the proof hash). Both are always rendered as lowercase hex.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serialize `value` as canonical JSON: sorted keys, no insignificant
/// whitespace, UTF-8. `serde_json`'s `Map` already sorts keys when the
/// `preserve_order` feature is off, which this crate does not enable, so a
/// plain `to_vec` over a `serde_json::Value` built from `value` is already
/// canonical.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> crate::error::Result<Vec<u8>> {
    let as_value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&as_value)?)
}

/// BLAKE3 hex digest of canonical-JSON(`value`).
pub fn blake3_of<T: Serialize>(value: &T) -> crate::error::Result<String> {
    let bytes = canonical_json_bytes(value)?;
    Ok(blake3_hex(&bytes))
}

/// BLAKE3 hex digest of raw bytes.
pub fn blake3_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Fold a new record into a hash chain: `H(prev ‖ record_id)`.
pub fn chain_next(prev_head_hash: &str, record_id: &str) -> String {
    let mut input = String::with_capacity(prev_head_hash.len() + record_id.len());
    input.push_str(prev_head_hash);
    input.push_str(record_id);
    blake3_hex(input.as_bytes())
}

/// SHA-256 hex digest of raw bytes (used for externally-specified hex-64 fields).
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Validate that `s` is exactly 64 lowercase hex characters.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}
