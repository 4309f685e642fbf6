//! Chaum-Pedersen proof of discrete-log equality.
//!
//! Proves that a claimed ECDH point `K = pk_other^sk` was derived with the
//! same `sk` behind `pk_self = g^sk`, without revealing `sk`. This is
//! what lets any node check an implicating node's symmetric key.
//!
//! ```text
//! R = g^r, S = pk_other^r
//! e = H(g, pk_self, pk_other, K, R, S)
//! d = sk * e + r
//! accept iff pk_self^e * R == g^d  and  K^e * S == pk_other^d
//! ```

use rand::{CryptoRng, RngCore};

use crate::blake3::{contexts, encode_multi_field};
use crate::curve::{hash_to_scalar, point_from_bytes, point_to_bytes, random_scalar, DacssCurve, Scalar};
use crate::{CryptoError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NizkProof<C: DacssCurve> {
    pub d: Scalar<C>,
    pub r: C,
    pub s: C,
}

/// The statement a proof speaks about.
struct Statement<'a, C> {
    generator: &'a C,
    pk_self: &'a C,
    pk_other: &'a C,
    shared_key: &'a C,
}

impl<C: DacssCurve> Statement<'_, C> {
    fn challenge(&self, r: &C, s: &C) -> Result<Scalar<C>> {
        let encoded = [
            point_to_bytes(self.generator)?,
            point_to_bytes(self.pk_self)?,
            point_to_bytes(self.pk_other)?,
            point_to_bytes(self.shared_key)?,
            point_to_bytes(r)?,
            point_to_bytes(s)?,
        ];
        let fields: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
        Ok(hash_to_scalar(
            contexts::NIZK_CHALLENGE,
            &encode_multi_field(&fields),
        ))
    }
}

impl<C: DacssCurve> NizkProof<C> {
    /// Prove `shared_key = pk_other^sk_self` and `pk_self = generator^sk_self`.
    pub fn generate<R: RngCore + CryptoRng>(
        sk_self: &Scalar<C>,
        pk_self: &C,
        pk_other: &C,
        shared_key: &C,
        generator: &C,
        rng: &mut R,
    ) -> Result<Self> {
        let nonce: Scalar<C> = random_scalar(rng);
        let r = *generator * nonce;
        let s = *pk_other * nonce;
        let statement = Statement {
            generator,
            pk_self,
            pk_other,
            shared_key,
        };
        let e = statement.challenge(&r, &s)?;
        Ok(Self {
            d: *sk_self * e + nonce,
            r,
            s,
        })
    }

    /// Check the proof against the claimed statement.
    pub fn verify(&self, generator: &C, pk_self: &C, pk_other: &C, shared_key: &C) -> bool {
        let statement = Statement {
            generator,
            pk_self,
            pk_other,
            shared_key,
        };
        let e = match statement.challenge(&self.r, &self.s) {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(error = %err, "nizk: challenge encoding failed");
                return false;
            }
        };
        *pk_self * e + self.r == *generator * self.d
            && *shared_key * e + self.s == *pk_other * self.d
    }

    /// `R || S || d`, points compressed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let r = point_to_bytes(&self.r)?;
        let s = point_to_bytes(&self.s)?;
        let d = crate::curve::scalar_to_bytes(&self.d)?;
        Ok(encode_multi_field(&[&r, &s, &d]))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let fields = split_multi_field(bytes)?;
        let [r, s, d] = fields.as_slice() else {
            return Err(CryptoError::Serialization(format!(
                "proof has {} fields, expected 3",
                fields.len()
            )));
        };
        Ok(Self {
            r: point_from_bytes(r)?,
            s: point_from_bytes(s)?,
            d: crate::curve::scalar_from_bytes(d)?,
        })
    }
}

fn split_multi_field(mut bytes: &[u8]) -> Result<Vec<&[u8]>> {
    let mut fields = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 4 {
            return Err(CryptoError::Serialization("truncated field length".to_string()));
        }
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[..4]);
        let len = u32::from_le_bytes(len) as usize;
        let rest = &bytes[4..];
        if rest.len() < len {
            return Err(CryptoError::Serialization("truncated field".to_string()));
        }
        fields.push(&rest[..len]);
        bytes = &rest[len..];
    }
    Ok(fields)
}
