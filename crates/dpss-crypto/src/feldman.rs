//! Feldman polynomial commitments.
//!
//! `C_i = g^{a_i}` for every coefficient `a_i` of the sharing polynomial.
//! Anyone holding the commitments can check a share `(x, v)` via
//! `g^v == Σ C_i^{x^i}` without learning the polynomial.

use ark_ec::Group;
use ark_ff::{One, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::blake3::{self, contexts};
use crate::curve::{point_to_bytes, DacssCurve, Scalar};
use crate::shamir::{Polynomial, ShamirShare};
use crate::{CryptoError, Result};

/// Ordered commitments, one per coefficient. Length equals the
/// reconstruction threshold `k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeldmanCommitments<C> {
    points: Vec<C>,
}

impl<C: DacssCurve> FeldmanCommitments<C> {
    pub fn commit(polynomial: &Polynomial<Scalar<C>>) -> Self {
        let generator = C::generator();
        Self {
            points: polynomial
                .coefficients()
                .iter()
                .map(|coefficient| generator * *coefficient)
                .collect(),
        }
    }

    pub fn points(&self) -> &[C] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `C_0 = g^secret`.
    pub fn secret_commitment(&self) -> Option<&C> {
        self.points.first()
    }

    /// `Σ C_i^{x^i}`, i.e. `g^{p(x)}`.
    pub fn evaluate(&self, x: u32) -> C {
        let x = Scalar::<C>::from(u64::from(x));
        let mut power = Scalar::<C>::one();
        let mut acc = C::zero();
        for point in &self.points {
            acc += *point * power;
            power *= x;
        }
        acc
    }

    /// Whether `share` lies on the committed polynomial.
    pub fn verify(&self, share: &ShamirShare<Scalar<C>>) -> bool {
        if share.id == 0 || self.points.is_empty() {
            return false;
        }
        C::generator() * share.value == self.evaluate(share.id)
    }

    /// Concatenated compressed points.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for point in &self.points {
            point
                .into_affine()
                .serialize_compressed(&mut buf)
                .map_err(|e| CryptoError::Serialization(format!("commitment encoding failed: {e}")))?;
        }
        Ok(buf)
    }

    /// Decode exactly `k` compressed points.
    pub fn from_bytes(bytes: &[u8], k: usize) -> Result<Self> {
        let mut reader = bytes;
        let mut points = Vec::with_capacity(k);
        for _ in 0..k {
            let affine = C::Affine::deserialize_compressed(&mut reader)
                .map_err(|e| CryptoError::InvalidPoint(format!("commitment: {e}")))?;
            points.push(affine.into());
        }
        if !reader.is_empty() {
            return Err(CryptoError::InvalidPoint(format!(
                "{} trailing bytes after {k} commitments",
                reader.len()
            )));
        }
        Ok(Self { points })
    }

    /// Digest of `C_0`, the part both committees' polynomials share.
    pub fn secret_commitment_hash(&self) -> Result<[u8; 32]> {
        let first = self
            .secret_commitment()
            .ok_or_else(|| CryptoError::InvalidParameters("empty commitments".to_string()))?;
        Ok(blake3::derive_key(contexts::COMMITMENT_HASH, &point_to_bytes(first)?))
    }
}
