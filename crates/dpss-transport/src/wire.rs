//! Message envelope.
//!
//! Every DACSS message is wrapped in an [`Envelope`]. The sender's
//! identity is supplied by the delivering transport, not the envelope.
//!
//! ## Wire format
//!
//! ```text
//! Envelope {
//!     version: u8,           // Protocol version (1)
//!     round:   AcssRoundId,  // dealer, PSS session, batch index
//!     curve:   CurveName,    // "secp256k1" | "ed25519"
//!     kind:    MessageKind,  // "propose" | "echo" | ...
//!     payload: Vec<u8>,      // CBOR-encoded payload struct
//! }
//! ```

use serde::{Deserialize, Serialize};

use dpss_types::{AcssRoundId, CurveName};

use crate::cbor;
use crate::messages::{MessageKind, Payload};
use crate::TransportError;

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum payload size (to prevent allocation attacks).
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version. Must be [`PROTOCOL_VERSION`].
    pub version: u8,
    pub round: AcssRoundId,
    pub curve: CurveName,
    pub kind: MessageKind,
    /// CBOR-encoded payload bytes.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wrap a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if the payload cannot be
    /// CBOR-serialized.
    pub fn new<P: Payload>(round: AcssRoundId, curve: CurveName, payload: &P) -> Result<Self, TransportError> {
        Ok(Self {
            version: PROTOCOL_VERSION,
            round,
            curve,
            kind: P::KIND,
            payload: cbor::to_vec(payload)?,
        })
    }

    /// Decode the payload as `P`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ProtocolViolation`] if the envelope's kind
    /// is not `P::KIND`, or [`TransportError::Deserialization`] if the
    /// payload does not match the schema.
    pub fn decode<P: Payload>(&self) -> Result<P, TransportError> {
        if self.kind != P::KIND {
            return Err(TransportError::ProtocolViolation(format!(
                "expected {} payload, envelope is {}",
                P::KIND,
                self.kind
            )));
        }
        cbor::from_slice(&self.payload)
    }

    /// Serialize for transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        cbor::to_vec(self)
    }

    /// Deserialize an envelope received from the wire. Unknown kinds fail
    /// here.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Deserialization`] for malformed bytes and
    /// [`TransportError::ProtocolViolation`] for a bad version or oversized
    /// payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransportError> {
        let envelope: Self = cbor::from_slice(data)?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        if self.version != PROTOCOL_VERSION {
            return Err(TransportError::ProtocolViolation(format!(
                "unsupported protocol version {}, expected {PROTOCOL_VERSION}",
                self.version
            )));
        }
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::ProtocolViolation(format!(
                "payload too large: {} bytes, max {MAX_PAYLOAD_SIZE}",
                self.payload.len()
            )));
        }
        Ok(())
    }
}
