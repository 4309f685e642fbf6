//! # dpss-types
//!
//! Shared identifiers and parameters used across the DPSS workspace:
//! committee membership, round identifiers, curve selection and
//! erasure-code shards.

pub mod committee;
pub mod round;

use serde::{Deserialize, Serialize};

pub use committee::{CommitteeKind, CommitteeParams, NodeDetails};
pub use round::{AcssRoundId, PssId};

/// 1-based position of a node inside its committee. Doubles as the
/// node's Shamir x-coordinate.
pub type NodeIndex = u32;

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Largest committee the GF(2^8) erasure code can serve.
pub const MAX_COMMITTEE_SIZE: usize = 255;

/// Errors raised while constructing shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Committee parameters violate `n > 3t`, `t >= 1` or the size cap.
    #[error("invalid committee parameters: {0}")]
    InvalidParams(String),

    /// Unrecognized curve or committee name.
    #[error("unknown name: {0}")]
    UnknownName(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Curve a round is executed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveName {
    Secp256k1,
    Ed25519,
}

impl CurveName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveName::Secp256k1 => "secp256k1",
            CurveName::Ed25519 => "ed25519",
        }
    }
}

impl std::fmt::Display for CurveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurveName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "secp256k1" => Ok(CurveName::Secp256k1),
            "ed25519" => Ok(CurveName::Ed25519),
            other => Err(TypesError::UnknownName(other.to_string())),
        }
    }
}

/// One erasure-coded fragment of a reliably broadcast payload.
///
/// `index` is 0-based: node `i` of a committee owns shard `i - 1`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub index: usize,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.index)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Render a digest for log fields.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..6])
}
