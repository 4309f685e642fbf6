//! Reed-Solomon erasure coding of broadcast payloads.
//!
//! A payload is framed as `BE64(len) || payload`, zero-padded to a
//! multiple of `k`, split into `k` data shards, and extended with
//! `n - k` parity shards. Any `k` intact shards reconstruct it.
//!
//! Shard `i` holds, per byte column, the evaluation at `x = i` of a
//! polynomial of degree `< k` over GF(2^8). A READY pool that may contain
//! Byzantine shards is decoded by [`ErasureCodec::decode_correcting`],
//! which locates corrupt shards with [`welch`](crate::welch).

use std::collections::HashMap;

use reed_solomon_erasure::galois_8::ReedSolomon;

use dpss_types::{short_hex, CommitteeParams, Hash, Shard};

use crate::{payload_hash, welch, RbcError, Result};

/// Length prefix size.
const LEN_PREFIX: usize = 8;

/// Erasure codec for one committee size.
pub struct ErasureCodec {
    data_shards: usize,
    total_shards: usize,
    rs: ReedSolomon,
}

impl ErasureCodec {
    /// `k = t + 1` data shards out of `n`.
    pub fn new(params: &CommitteeParams) -> Result<Self> {
        let rs = ReedSolomon::new(params.k, params.n - params.k)
            .map_err(|e| RbcError::Encode(format!("codec setup failed: {e:?}")))?;
        Ok(Self {
            data_shards: params.k,
            total_shards: params.n,
            rs,
        })
    }

    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    pub fn total_shards(&self) -> usize {
        self.total_shards
    }

    /// Encode `payload` into `n` equally sized shards, index `0..n`.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<Shard>> {
        let mut framed = Vec::with_capacity(LEN_PREFIX + payload.len());
        framed.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        framed.extend_from_slice(payload);

        let shard_len = framed.len().div_ceil(self.data_shards);
        framed.resize(shard_len * self.data_shards, 0);

        let mut shards: Vec<Vec<u8>> = framed.chunks(shard_len).map(<[u8]>::to_vec).collect();
        shards.resize(self.total_shards, vec![0u8; shard_len]);
        self.rs
            .encode(&mut shards)
            .map_err(|e| RbcError::Encode(format!("{e:?}")))?;

        Ok(shards
            .into_iter()
            .enumerate()
            .map(|(index, data)| Shard { index, data })
            .collect())
    }

    /// Reconstruct the payload from at least `k` shards, trusting them.
    ///
    /// The first shard seen for an index wins.
    pub fn decode(&self, shards: &[Shard]) -> Result<Vec<u8>> {
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; self.total_shards];
        for shard in shards {
            let slot = slots.get_mut(shard.index).ok_or(RbcError::InvalidShard {
                index: shard.index,
                total: self.total_shards,
            })?;
            if slot.is_none() {
                *slot = Some(shard.data.clone());
            }
        }
        let present = slots.iter().filter(|s| s.is_some()).count();
        if present < self.data_shards {
            return Err(RbcError::Decode(format!(
                "need at least {} shards, have {present}",
                self.data_shards
            )));
        }

        self.rs
            .reconstruct_data(slots.as_mut_slice())
            .map_err(|e| RbcError::Decode(format!("{e:?}")))?;

        let mut framed = Vec::new();
        for (index, slot) in slots.into_iter().take(self.data_shards).enumerate() {
            let data = slot.ok_or_else(|| {
                RbcError::Decode(format!("data shard {index} missing after reconstruction"))
            })?;
            framed.extend_from_slice(&data);
        }
        unframe(&framed)
    }

    /// Decode a READY pool that may contain corrupt shards and check the
    /// payload against `expected`.
    pub fn decode_matching(&self, pool: &[Shard], expected: &Hash) -> Option<Vec<u8>> {
        match self.decode_correcting(pool) {
            Ok(payload) if payload_hash(&payload) == *expected => Some(payload),
            Ok(payload) => {
                tracing::debug!(
                    pool = pool.len(),
                    decoded = %short_hex(&payload_hash(&payload)),
                    expected = %short_hex(expected),
                    "pool decoded to a different payload"
                );
                None
            }
            Err(e) => {
                tracing::debug!(pool = pool.len(), error = %e, "pool not decodable yet");
                None
            }
        }
    }

    /// Reconstruct the payload from a pool holding at most
    /// `(len - k) / 2` corrupt shards.
    ///
    /// Each pass erasure-decodes from the first `k` remaining shards and
    /// looks for the first byte column some other shard disagrees with.
    /// Berlekamp-Welch on that column names the corrupt shards, which are
    /// dropped before the next pass. Every pass drops at least one shard.
    pub fn decode_correcting(&self, pool: &[Shard]) -> Result<Vec<u8>> {
        let mut candidates = self.candidates(pool);
        loop {
            if candidates.len() < self.data_shards {
                return Err(RbcError::Decode(format!(
                    "{} consistent shards, need {}",
                    candidates.len(),
                    self.data_shards
                )));
            }
            let codeword = self.reconstruct(&candidates[..self.data_shards])?;
            let column = candidates
                .iter()
                .filter_map(|shard| first_mismatch(&shard.data, &codeword[shard.index]))
                .min();
            let Some(column) = column else {
                let framed: Vec<u8> = codeword.into_iter().take(self.data_shards).flatten().collect();
                return unframe(&framed);
            };

            let points: Vec<(u8, u8)> = candidates
                .iter()
                .map(|shard| (shard.index as u8, shard.data[column]))
                .collect();
            let poly = welch::decode(&points, self.data_shards).ok_or_else(|| {
                RbcError::Decode(format!("too many corrupt shards at column {column}"))
            })?;
            let before = candidates.len();
            candidates.retain(|shard| welch::evaluate(&poly, shard.index as u8) == shard.data[column]);
            if candidates.len() == before {
                return Err(RbcError::Decode(format!("no corrupt shard located at column {column}")));
            }
            tracing::debug!(column, dropped = before - candidates.len(), "corrupt shards dropped");
        }
    }

    /// One shard per in-range index, first seen wins, all of the most
    /// common length.
    fn candidates<'a>(&self, pool: &'a [Shard]) -> Vec<&'a Shard> {
        let mut seen = vec![false; self.total_shards];
        let mut unique = Vec::with_capacity(pool.len());
        for shard in pool {
            if shard.index < self.total_shards && !seen[shard.index] {
                seen[shard.index] = true;
                unique.push(shard);
            }
        }
        let mut lengths: HashMap<usize, usize> = HashMap::new();
        for shard in &unique {
            *lengths.entry(shard.data.len()).or_insert(0) += 1;
        }
        let common = lengths
            .into_iter()
            .max_by_key(|(len, count)| (*count, *len))
            .map(|(len, _)| len);
        unique.retain(|shard| Some(shard.data.len()) == common && !shard.data.is_empty());
        unique
    }

    /// All `n` shards of the codeword through `shards`.
    fn reconstruct(&self, shards: &[&Shard]) -> Result<Vec<Vec<u8>>> {
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; self.total_shards];
        for shard in shards {
            if let Some(slot) = slots.get_mut(shard.index) {
                *slot = Some(shard.data.clone());
            }
        }
        self.rs
            .reconstruct(slots.as_mut_slice())
            .map_err(|e| RbcError::Decode(format!("{e:?}")))?;
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| RbcError::Decode(format!("shard {index} missing after reconstruction")))
            })
            .collect()
    }
}

fn first_mismatch(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter().zip(b).position(|(x, y)| x != y)
}

fn unframe(framed: &[u8]) -> Result<Vec<u8>> {
    if framed.len() < LEN_PREFIX {
        return Err(RbcError::Decode("frame shorter than length prefix".to_string()));
    }
    let mut len = [0u8; LEN_PREFIX];
    len.copy_from_slice(&framed[..LEN_PREFIX]);
    let len = usize::try_from(u64::from_be_bytes(len))
        .map_err(|_| RbcError::Decode("payload length overflows".to_string()))?;
    let body = &framed[LEN_PREFIX..];
    if len > body.len() {
        return Err(RbcError::Decode(format!(
            "declared length {len} exceeds decoded {} bytes",
            body.len()
        )));
    }
    Ok(body[..len].to_vec())
}
