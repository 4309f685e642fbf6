//! # dpss-dacss
//!
//! Dual-committee asynchronous complete secret sharing.
//!
//! A dealer from the old committee shares one secret to both the old and
//! the new committee. Each committee agrees on the dealt data through an
//! erasure-coded reliable broadcast; each member decrypts and checks its
//! own share against the Feldman commitments. A member whose share fails
//! the check proves so with a NIZK (implicate) and rebuilds a correct
//! share from `t + 1` verified shares of its peers. Finally, each member
//! confirms with the other committee that both were dealt the same secret
//! and emits a [`DacssOutput`](events::DacssOutput).
//!
//! ## Modules
//!
//! - [`config`] - TOML node configuration
//! - [`membership`] - Committee membership capability
//! - [`keys`] - Key material capability
//! - [`outbox`] - Outbound message queue consumed by the transport
//! - [`events`] - Output event bus for the consensus layer
//! - [`state`] - Per-round state
//! - [`store`] - Keyed store of per-round state with one lock per round
//! - [`node`] - Message dispatch
//! - [`dealer`] - Dealing to both committees
//! - [`protocol`] - Handlers for each message kind
//! - [`router`] - Per-curve dispatch

pub mod config;
pub mod dealer;
pub mod events;
pub mod keys;
pub mod membership;
pub mod node;
pub mod outbox;
pub mod protocol;
pub mod router;
pub mod state;
pub mod store;

pub use config::DacssConfig;
pub use events::{DacssOutput, EventBus};
pub use keys::{KeyAccess, StaticKeys};
pub use membership::{Membership, StaticMembership};
pub use node::DacssNode;
pub use outbox::{Outbound, Outbox, Recipient};
pub use router::CurveRouter;
pub use state::{AccsState, RoundSnapshot};
pub use store::RoundStore;

use dpss_types::{AcssRoundId, CurveName, NodeDetails};

/// Error types for DACSS message handling.
#[derive(Debug, thiserror::Error)]
pub enum DacssError {
    #[error(transparent)]
    Crypto(#[from] dpss_crypto::CryptoError),

    #[error(transparent)]
    Rbc(#[from] dpss_rbc::RbcError),

    #[error(transparent)]
    Transport(#[from] dpss_transport::TransportError),

    #[error(transparent)]
    Types(#[from] dpss_types::TypesError),

    /// A local message referenced a round with no state.
    #[error("no state for round {0}")]
    UnknownRound(AcssRoundId),

    /// Sender is not allowed to send this message.
    #[error("unexpected sender {sender} for {kind}")]
    UnexpectedSender { sender: NodeDetails, kind: &'static str },

    /// Envelope names a curve this node does not run.
    #[error("curve mismatch: expected {expected}, got {actual}")]
    CurveMismatch { expected: CurveName, actual: CurveName },

    /// No public key registered for a node.
    #[error("missing public key for {0}")]
    MissingKey(NodeDetails),

    /// Dealing requested by a node that is not the round's dealer.
    #[error("node {node} is not the dealer of round {round}")]
    NotDealer { node: NodeDetails, round: AcssRoundId },

    /// Outbound channel was closed by the transport.
    #[error("outbound channel closed")]
    ChannelClosed,

    /// Message is well-formed but inconsistent with round state.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

pub type Result<T> = std::result::Result<T, DacssError>;
