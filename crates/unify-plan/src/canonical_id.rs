//! The canonical-ID hashing construction (spec §4.3.4).
//!
//! This is a pure Rust re-expression of the SQL expression the plan compiler
//! emits (see [`crate::stages::canonicalize`]), used by the mock backend and
//! by tests to check the "lookup consistency" law of spec §8 without parsing
//! SQL back out of a warehouse.

use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Per-namespace 9-byte key masks (18 hex chars), grounded verbatim in
/// `original_source/.../generate_key_mask_values`. Namespaces 1-3 are the
/// values TD's own implementation uses; 4-10 are labeled "derived pattern"
/// in the source and are **not** confirmed to match any production system
/// (spec §9 Open Questions) — they exist only so configs with more than
/// three merge keys still compile to a deterministic (if unverified)
/// canonical ID.
pub const KEY_MASKS: [&str; 10] = [
    "0ffdbcf0c666ce190d",
    "61a821f2b646a4e890",
    "acd2206c3f88b3ee27",
    "e2b8c47f5a94d1e36f",
    "7c3f9e8b2d156a0492",
    "4f6a1c8e7b359d2841",
    "9b2e5f7a4c8d1e6307",
    "3a7c9f2e6b8d4e1529",
    "8e4f7a1c9b6d2e5083",
    "2c6f9e4a7b1d8e3567",
];

#[derive(Debug, Error)]
pub enum CanonicalIdError {
    #[error("no key mask defined for namespace {0} (only {} namespaces are supported)", KEY_MASKS.len())]
    NamespaceOutOfRange(u32),
}

/// Returns the 9-byte key mask for 1-based namespace `ns`, split into
/// `(mask_low, mask_high)` as the spec's "first 16 hex chars" / "last 2 hex
/// chars" halves.
pub fn key_mask(ns: u32) -> Result<(&'static str, &'static str), CanonicalIdError> {
    let mask = KEY_MASKS
        .get((ns as usize).wrapping_sub(1))
        .ok_or(CanonicalIdError::NamespaceOutOfRange(ns))?;
    Ok((&mask[..16], &mask[16..]))
}

/// Computes `canonical_id` for a converged leader identifier, per spec
/// §4.3.4: SHA-256 the leader id, XOR the first 16 hex chars (as two 32-bit
/// halves) against the namespace's mask, append the 1-byte mask tail,
/// base64-encode, then apply the URL-safe projection.
pub fn compute_canonical_id(leader_id: &str, leader_ns: u32) -> Result<String, CanonicalIdError> {
    let (mask_low, mask_high) = key_mask(leader_ns)?;

    let digest = Sha256::digest(leader_id.as_bytes());
    let digest_hex = hex_encode(&digest[..8]); // first 16 hex chars = first 8 bytes

    let half_a = u32::from_str_radix(&digest_hex[0..8], 16).expect("valid hex from sha256 digest");
    let half_b = u32::from_str_radix(&digest_hex[8..16], 16).expect("valid hex from sha256 digest");
    let mask_a = u32::from_str_radix(&mask_low[0..8], 16).expect("key mask is valid hex");
    let mask_b = u32::from_str_radix(&mask_low[8..16], 16).expect("key mask is valid hex");

    let xored_a = half_a ^ mask_a;
    let xored_b = half_b ^ mask_b;
    let tail = u8::from_str_radix(mask_high, 16).expect("mask_high is one valid hex byte");

    let mut bytes = Vec::with_capacity(9);
    bytes.extend_from_slice(&xored_a.to_be_bytes());
    bytes.extend_from_slice(&xored_b.to_be_bytes());
    bytes.push(tail);

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(url_safe(&encoded))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Snowflake/Presto-style URL-safe base64 projection (spec §3.2 glossary):
/// `+` → `-`, `/` → `_`, strip trailing `=` padding.
fn url_safe(b64: &str) -> String {
    b64.replace('+', "-").replace('/', "_").trim_end_matches('=').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_url_safe_and_unpadded() {
        let id = compute_canonical_id("a@x.com", 1).unwrap();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!id.ends_with('='));
    }

    #[test]
    fn canonical_id_is_deterministic() {
        let a = compute_canonical_id("a@x.com", 1).unwrap();
        let b = compute_canonical_id("a@x.com", 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_depends_on_namespace_mask() {
        let a = compute_canonical_id("a@x.com", 1).unwrap();
        let b = compute_canonical_id("a@x.com", 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_out_of_range_namespace() {
        assert!(matches!(
            compute_canonical_id("a@x.com", 99),
            Err(CanonicalIdError::NamespaceOutOfRange(99))
        ));
    }
}
