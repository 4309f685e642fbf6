//! Curve abstraction.
//!
//! Rounds run over secp256k1 or ed25519, chosen per round. Protocol code
//! is generic over [`DacssCurve`]; the two arkworks projective groups
//! implement it.

use ark_ec::{CurveGroup, Group};
use ark_ff::{PrimeField, UniformRand};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use dpss_types::CurveName;
use rand::{CryptoRng, RngCore};

use crate::blake3;
use crate::{CryptoError, Result};

/// A prime-order group usable for a sharing round.
pub trait DacssCurve: CurveGroup {
    /// Wire name carried in every envelope for this curve.
    const NAME: CurveName;
}

/// Scalar field of `C`.
pub type Scalar<C> = <C as Group>::ScalarField;

/// secp256k1 in projective coordinates.
pub type Secp256k1 = ark_secp256k1::Projective;

/// The prime-order subgroup of edwards25519.
pub type Ed25519 = ark_ed25519::EdwardsProjective;

impl DacssCurve for Secp256k1 {
    const NAME: CurveName = CurveName::Secp256k1;
}

impl DacssCurve for Ed25519 {
    const NAME: CurveName = CurveName::Ed25519;
}

/// Compressed encoding of a point.
pub fn point_to_bytes<C: CurveGroup>(point: &C) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    point
        .into_affine()
        .serialize_compressed(&mut buf)
        .map_err(|e| CryptoError::Serialization(format!("point encoding failed: {e}")))?;
    Ok(buf)
}

/// Decode a compressed point, rejecting trailing bytes and points off
/// the prime-order subgroup.
pub fn point_from_bytes<C: CurveGroup>(bytes: &[u8]) -> Result<C> {
    let mut reader = bytes;
    let affine = C::Affine::deserialize_compressed(&mut reader)
        .map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CryptoError::InvalidPoint(format!(
            "{} trailing bytes",
            reader.len()
        )));
    }
    Ok(affine.into())
}

/// Hex of the compressed point. Used to key ciphertexts by recipient.
pub fn point_to_hex<C: CurveGroup>(point: &C) -> Result<String> {
    Ok(hex::encode(point_to_bytes(point)?))
}

pub fn scalar_to_bytes<F: PrimeField>(scalar: &F) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    scalar
        .serialize_compressed(&mut buf)
        .map_err(|e| CryptoError::Serialization(format!("scalar encoding failed: {e}")))?;
    Ok(buf)
}

/// Decode a canonically encoded scalar.
pub fn scalar_from_bytes<F: PrimeField>(bytes: &[u8]) -> Result<F> {
    let mut reader = bytes;
    let scalar = F::deserialize_compressed(&mut reader)
        .map_err(|e| CryptoError::Serialization(format!("scalar decoding failed: {e}")))?;
    if !reader.is_empty() {
        return Err(CryptoError::Serialization(format!(
            "{} trailing bytes after scalar",
            reader.len()
        )));
    }
    Ok(scalar)
}

pub fn random_scalar<F: PrimeField, R: RngCore + CryptoRng>(rng: &mut R) -> F {
    F::rand(rng)
}

/// Fresh `(sk, g^sk)` pair.
pub fn keypair<C: DacssCurve, R: RngCore + CryptoRng>(rng: &mut R) -> (Scalar<C>, C) {
    let sk = random_scalar::<Scalar<C>, R>(rng);
    (sk, C::generator() * sk)
}

/// Reduce a 64-byte domain-separated digest into the scalar field.
pub fn hash_to_scalar<F: PrimeField>(context: &str, data: &[u8]) -> F {
    let mut wide = [0u8; 64];
    blake3::derive_key_xof(context, data, &mut wide);
    F::from_le_bytes_mod_order(&wide)
}
