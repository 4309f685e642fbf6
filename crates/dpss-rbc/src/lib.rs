//! # dpss-rbc
//!
//! Erasure-coded reliable broadcast.
//!
//! The dealer's payload is Reed-Solomon encoded into `n` shards, any
//! `k = t + 1` of which reconstruct it. Nodes exchange ECHO and READY
//! messages carrying shards; once enough READY shards arrive, a node
//! decodes and checks the result against the payload hash.
//!
//! ## Modules
//!
//! - [`codec`] - Reed-Solomon shard encoding and error-correcting decoding
//! - [`state`] - Per-round ECHO/READY state machine (no I/O)
//! - [`welch`] - Berlekamp-Welch over GF(2^8)

pub mod codec;
pub mod state;
pub mod welch;

pub use dpss_crypto::blake3::payload_hash;

pub use codec::ErasureCodec;
pub use state::{RbcAction, RbcPhase, RbcState};

/// Error types for reliable broadcast.
#[derive(Debug, thiserror::Error)]
pub enum RbcError {
    /// Reed-Solomon encoding error.
    #[error("reed-solomon encoding error: {0}")]
    Encode(String),

    /// Reed-Solomon decoding error.
    #[error("reed-solomon decoding error: {0}")]
    Decode(String),

    /// Shard index out of range.
    #[error("shard index out of range: {index}, total {total}")]
    InvalidShard { index: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, RbcError>;
