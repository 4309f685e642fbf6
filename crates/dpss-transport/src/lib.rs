//! # dpss-transport
//!
//! Wire format for DACSS messages. Delivery itself belongs to the
//! surrounding node; this crate only defines what travels.
//!
//! - **Envelope** ([`wire`]) - CBOR envelope with version, round, curve, kind, payload
//! - **CBOR serialization** helpers via [`cbor`]
//! - **Message types** for every payload via [`messages`]
//!
//! ```text
//! Envelope { version, round, curve, kind, payload }
//!     |
//!     v
//! payload = CBOR(ProposeMessage | EchoMessage | ReadyMessage | ...)
//! ```

pub mod cbor;
pub mod messages;
pub mod wire;

pub use messages::{AcssData, MessageKind, Payload};
pub use wire::Envelope;

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// CBOR serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// CBOR deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Protocol violation (version mismatch, oversized payload, kind mismatch).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
