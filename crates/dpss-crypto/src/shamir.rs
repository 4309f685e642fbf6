//! Shamir secret sharing over a prime field.
//!
//! Lagrange weights are always computed from the x-coordinates actually
//! supplied, since the participating set differs from call to call.

use std::collections::HashSet;

use ark_ff::{PrimeField, Zero};
use rand::{CryptoRng, RngCore};

use crate::curve::{random_scalar, scalar_from_bytes, scalar_to_bytes};
use crate::{CryptoError, Result};

/// Largest number of shares (x-coordinates 1..=255).
pub const MAX_SHARES: usize = 255;

/// One point `(id, p(id))` on a sharing polynomial.
///
/// Neither coordinate is zero. [`ShamirShare::from_bytes`] and
/// [`Shamir::combine`] reject shares that break this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShamirShare<F> {
    /// x-coordinate.
    pub id: u32,
    pub value: F,
}

impl<F: PrimeField> ShamirShare<F> {
    pub fn new(id: u32, value: F) -> Self {
        Self { id, value }
    }

    /// `BE32(id) || scalar`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.id.to_be_bytes().to_vec();
        out.extend_from_slice(&scalar_to_bytes(&self.value)?);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(CryptoError::InvalidShare(format!(
                "share encoding too short: {} bytes",
                bytes.len()
            )));
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[..4]);
        let id = u32::from_be_bytes(id);
        if id == 0 {
            return Err(CryptoError::InvalidShare("share id is zero".to_string()));
        }
        let value: F = scalar_from_bytes(&bytes[4..])?;
        if value.is_zero() {
            return Err(CryptoError::InvalidShare(format!("share {id} has zero value")));
        }
        Ok(Self { id, value })
    }
}

/// A polynomial in coefficient form, lowest degree first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial<F> {
    coefficients: Vec<F>,
}

impl<F: PrimeField> Polynomial<F> {
    /// Random polynomial of the given degree with fixed constant term.
    pub fn random<R: RngCore + CryptoRng>(intercept: F, degree: usize, rng: &mut R) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(intercept);
        for _ in 0..degree {
            coefficients.push(random_scalar(rng));
        }
        Self { coefficients }
    }

    pub fn from_coefficients(coefficients: Vec<F>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[F] {
        &self.coefficients
    }

    pub fn intercept(&self) -> F {
        self.coefficients.first().copied().unwrap_or_else(F::zero)
    }

    /// Horner evaluation.
    pub fn evaluate(&self, x: F) -> F {
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, coefficient| acc * x + coefficient)
    }
}

/// `threshold`-of-`limit` sharing scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shamir {
    threshold: usize,
    limit: usize,
}

impl Shamir {
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidParameters`] unless
    /// `2 <= threshold <= limit <= 255`.
    pub fn new(threshold: usize, limit: usize) -> Result<Self> {
        if threshold < 2 {
            return Err(CryptoError::InvalidParameters(format!(
                "threshold {threshold} below 2"
            )));
        }
        if limit < threshold {
            return Err(CryptoError::InvalidParameters(format!(
                "limit {limit} below threshold {threshold}"
            )));
        }
        if limit > MAX_SHARES {
            return Err(CryptoError::InvalidParameters(format!(
                "limit {limit} exceeds {MAX_SHARES}"
            )));
        }
        Ok(Self { threshold, limit })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Share `secret` into `limit` points on a random degree-`(threshold-1)`
    /// polynomial.
    pub fn split<F: PrimeField, R: RngCore + CryptoRng>(
        &self,
        secret: F,
        rng: &mut R,
    ) -> Result<Vec<ShamirShare<F>>> {
        self.split_with_polynomial(secret, rng).map(|(_, shares)| shares)
    }

    /// Like [`Shamir::split`] but also returns the polynomial, which the
    /// dealer needs for Feldman commitments.
    ///
    /// A polynomial that evaluates to zero at some share id is resampled.
    pub fn split_with_polynomial<F: PrimeField, R: RngCore + CryptoRng>(
        &self,
        secret: F,
        rng: &mut R,
    ) -> Result<(Polynomial<F>, Vec<ShamirShare<F>>)> {
        if secret.is_zero() {
            return Err(CryptoError::InvalidSecret);
        }
        loop {
            let polynomial = Polynomial::random(secret, self.threshold - 1, rng);
            let shares: Vec<ShamirShare<F>> = (1..=self.limit as u32)
                .map(|id| ShamirShare::new(id, polynomial.evaluate(F::from(u64::from(id)))))
                .collect();
            if shares.iter().all(|share| !share.value.is_zero()) {
                return Ok((polynomial, shares));
            }
        }
    }

    /// Reconstruct the secret by interpolating at zero.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InsufficientShares`] with fewer than `threshold` shares,
    /// [`CryptoError::InvalidShare`] for a zero, out-of-range or repeated id.
    pub fn combine<F: PrimeField>(&self, shares: &[ShamirShare<F>]) -> Result<F> {
        if shares.len() < self.threshold {
            return Err(CryptoError::InsufficientShares {
                required: self.threshold,
                available: shares.len(),
            });
        }
        let mut seen = HashSet::with_capacity(shares.len());
        for share in shares {
            if share.id == 0 || share.id as usize > self.limit {
                return Err(CryptoError::InvalidShare(format!(
                    "share id {} outside 1..={}",
                    share.id, self.limit
                )));
            }
            if share.value.is_zero() {
                return Err(CryptoError::InvalidShare(format!(
                    "share {} has zero value",
                    share.id
                )));
            }
            if !seen.insert(share.id) {
                return Err(CryptoError::InvalidShare(format!(
                    "duplicate share id {}",
                    share.id
                )));
            }
        }
        interpolate(shares, F::zero())
    }
}

/// Lagrange basis weights for evaluating at `x` from points at `ids`.
///
/// # Errors
///
/// [`CryptoError::DivideByZero`] if two ids coincide.
pub fn lagrange_coefficients<F: PrimeField>(ids: &[u32], x: F) -> Result<Vec<F>> {
    let xs: Vec<F> = ids.iter().map(|id| F::from(u64::from(*id))).collect();
    let mut weights = Vec::with_capacity(xs.len());
    for (i, xi) in xs.iter().enumerate() {
        let mut numerator = F::one();
        let mut denominator = F::one();
        for (j, xj) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator *= x - xj;
            denominator *= *xi - xj;
        }
        let inverse = denominator.inverse().ok_or(CryptoError::DivideByZero)?;
        weights.push(numerator * inverse);
    }
    Ok(weights)
}

/// Evaluate the polynomial through `shares` at an arbitrary `x`.
///
/// Used by share recovery, where `x` is the index of the node whose share
/// was corrupted.
pub fn obtain_eval_for_x<F: PrimeField>(shares: &[ShamirShare<F>], x: u32) -> Result<F> {
    if shares.is_empty() {
        return Err(CryptoError::InsufficientShares {
            required: 1,
            available: 0,
        });
    }
    interpolate(shares, F::from(u64::from(x)))
}

fn interpolate<F: PrimeField>(shares: &[ShamirShare<F>], x: F) -> Result<F> {
    let ids: Vec<u32> = shares.iter().map(|s| s.id).collect();
    let weights = lagrange_coefficients(&ids, x)?;
    Ok(shares
        .iter()
        .zip(weights)
        .fold(F::zero(), |acc, (share, weight)| acc + share.value * weight))
}
