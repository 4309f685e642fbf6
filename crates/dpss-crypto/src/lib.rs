//! # dpss-crypto
//!
//! Cryptographic primitives for dual-committee secret sharing.
//!
//! ## Modules
//!
//! - [`blake3`] - Domain-separated BLAKE3 hashing
//! - [`chacha20`] - ChaCha20-Poly1305 AEAD encryption (RFC 8439)
//! - [`curve`] - Curve abstraction over secp256k1 and ed25519, point/scalar encoding
//! - [`shamir`] - Polynomials, Shamir split/combine, Lagrange interpolation
//! - [`feldman`] - Feldman polynomial commitments
//! - [`channel`] - ECDH-derived symmetric channel for share encryption
//! - [`predicate`] - Decrypt-and-verify check of a dealt share
//! - [`nizk`] - Chaum-Pedersen proof of correct ECDH key derivation

pub mod blake3;
pub mod chacha20;
pub mod channel;
pub mod curve;
pub mod feldman;
pub mod nizk;
pub mod predicate;
pub mod shamir;

pub use curve::{DacssCurve, Ed25519, Scalar, Secp256k1};
pub use feldman::FeldmanCommitments;
pub use nizk::NizkProof;
pub use shamir::{Polynomial, Shamir, ShamirShare};

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Secret to be shared is the additive identity.
    #[error("secret must be non-zero")]
    InvalidSecret,

    /// Share is malformed, duplicated or out of range.
    #[error("invalid share: {0}")]
    InvalidShare(String),

    /// Two interpolation points share an x-coordinate.
    #[error("division by zero during interpolation")]
    DivideByZero,

    /// Fewer shares than the reconstruction threshold.
    #[error("insufficient shares: required {required}, got {available}")]
    InsufficientShares { required: usize, available: usize },

    /// AEAD tag check failed or ciphertext shorter than the nonce.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Point encoding is not a valid compressed curve point.
    #[error("invalid point: {0}")]
    InvalidPoint(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Threshold parameters out of range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
