//! Domain-separated BLAKE3 hashing.
//!
//! Every hash computed by the protocol goes through [`derive_key`] (or its
//! extendable-output variant) with one of the registered [`contexts`], so
//! digests from different purposes can never collide.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const SHARE_ENCRYPTION_KEY: &str = "DPSS v1 share-encryption-key";
    pub const NIZK_CHALLENGE: &str = "DPSS v1 nizk-challenge";
    pub const ACSS_DATA_HASH: &str = "DPSS v1 acss-data-hash";
    pub const COMMITMENT_HASH: &str = "DPSS v1 commitment-hash";
    pub const SHARD_FINGERPRINT: &str = "DPSS v1 shard-fingerprint";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[
        SHARE_ENCRYPTION_KEY,
        NIZK_CHALLENGE,
        ACSS_DATA_HASH,
        COMMITMENT_HASH,
        SHARD_FINGERPRINT,
    ];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte key (or domain-separated digest) using BLAKE3's
/// key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "DPSS v1 ")
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Variable-length output in key derivation mode. Used for wide
/// reductions into a scalar field.
pub fn derive_key_xof(context: &str, key_material: &[u8], output: &mut [u8]) {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let mut reader = hasher.finalize_xof();
    reader.fill(output);
}

/// Digest identifying a reliably broadcast payload.
pub fn payload_hash(payload: &[u8]) -> [u8; 32] {
    derive_key(contexts::ACSS_DATA_HASH, payload)
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_strings_prefixed() {
        for ctx in contexts::ALL_CONTEXTS {
            assert!(ctx.starts_with("DPSS v1 "), "context '{ctx}' has wrong prefix");
            assert!(is_registered_context(ctx));
        }
        assert!(!is_registered_context("DPSS v1 made-up-context"));
    }

    #[test]
    fn test_derive_key_separates_contexts() {
        let a = derive_key(contexts::ACSS_DATA_HASH, b"payload");
        let b = derive_key(contexts::COMMITMENT_HASH, b"payload");
        assert_ne!(a, b);
        assert_eq!(a, derive_key(contexts::ACSS_DATA_HASH, b"payload"));
        assert_ne!(a, hash(b"payload"));
    }

    #[test]
    fn test_xof_prefix_matches_derive_key() {
        let mut wide = [0u8; 64];
        derive_key_xof(contexts::NIZK_CHALLENGE, b"input", &mut wide);
        assert_eq!(&wide[..32], &derive_key(contexts::NIZK_CHALLENGE, b"input"));
    }

    #[test]
    fn test_multi_field_is_unambiguous() {
        let ab_c = encode_multi_field(&[b"ab", b"c"]);
        let a_bc = encode_multi_field(&[b"a", b"bc"]);
        assert_ne!(ab_c, a_bc);
        assert_eq!(&ab_c[0..4], &2u32.to_le_bytes());
        assert_eq!(&ab_c[4..6], b"ab");
    }
}
