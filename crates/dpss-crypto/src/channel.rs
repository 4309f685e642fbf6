//! ECDH-derived symmetric channel between a dealer and a recipient.
//!
//! `K = PK^sk`; the AEAD key is the domain-separated hash of the
//! compressed affine encoding of `K`. Ciphertexts carry their random
//! nonce as a prefix: `nonce(12) || ciphertext || tag(16)`.

use ark_ec::CurveGroup;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::blake3::{self, contexts};
use crate::chacha20::{self, KEY_SIZE, NONCE_SIZE};
use crate::curve::{point_to_bytes, Scalar};
use crate::{CryptoError, Result};

/// `other_public^my_private`.
pub fn shared_key<C: CurveGroup>(my_private: &Scalar<C>, other_public: &C) -> C {
    *other_public * *my_private
}

/// AEAD key for a shared point.
pub fn symmetric_key<C: CurveGroup>(key: &C) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let encoded = Zeroizing::new(point_to_bytes(key)?);
    Ok(Zeroizing::new(blake3::derive_key(
        contexts::SHARE_ENCRYPTION_KEY,
        &encoded,
    )))
}

/// Encrypt `msg` under `key` with a fresh nonce.
pub fn encrypt<C: CurveGroup>(key: &C, msg: &[u8]) -> Result<Vec<u8>> {
    let aead_key = symmetric_key(key)?;
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = chacha20::encrypt(&aead_key, &nonce, msg, &[])?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a nonce-prefixed ciphertext.
///
/// # Errors
///
/// [`CryptoError::AuthenticationFailed`] if the input is shorter than a
/// nonce or the tag does not verify.
pub fn decrypt<C: CurveGroup>(key: &C, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }
    let aead_key = symmetric_key(key)?;
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);
    chacha20::decrypt(&aead_key, &nonce_bytes, ciphertext, &[])
}
