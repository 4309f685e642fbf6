//! Typed payloads carried inside an [`Envelope`](crate::wire::Envelope).
//!
//! Curve points and scalars travel as compressed bytes so this crate stays
//! curve-agnostic; the protocol layer decodes them for the round's curve.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use dpss_crypto::blake3::payload_hash;
use dpss_types::{CommitteeKind, Hash, NodeIndex, Shard};

use crate::{cbor, Result};

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Propose,
    Echo,
    Ready,
    Output,
    Commitment,
    ImplicateReceive,
    ImplicateExecute,
    ShareRecovery,
    ReceiveShareRecovery,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Propose => "propose",
            MessageKind::Echo => "echo",
            MessageKind::Ready => "ready",
            MessageKind::Output => "output",
            MessageKind::Commitment => "commitment",
            MessageKind::ImplicateReceive => "implicate_receive",
            MessageKind::ImplicateExecute => "implicate_execute",
            MessageKind::ShareRecovery => "share_recovery",
            MessageKind::ReceiveShareRecovery => "receive_share_recovery",
        }
    }

    /// Kinds a node only ever sends to itself.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            MessageKind::Output | MessageKind::ImplicateExecute | MessageKind::ShareRecovery
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload struct bound to its message kind.
pub trait Payload: Serialize + DeserializeOwned {
    const KIND: MessageKind;
}

/// Everything a dealer publishes for one committee. Its hash is the value
/// the reliable broadcast agrees on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcssData {
    /// `k` compressed Feldman commitments, concatenated.
    pub commitments: Vec<u8>,
    /// Recipient public key (compressed, hex) to encrypted share.
    pub share_map: BTreeMap<String, Vec<u8>>,
    /// Compressed ephemeral public key of the dealer for this round.
    pub dealer_ephemeral_pub_key: Vec<u8>,
}

impl AcssData {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        cbor::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        cbor::from_slice(bytes)
    }

    /// Hash of the canonical encoding.
    pub fn hash(&self) -> Result<Hash> {
        Ok(payload_hash(&self.to_bytes()?))
    }
}

/// Dealer to committee: the data to be reliably broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeMessage {
    /// Committee this dealing is for.
    pub committee: CommitteeKind,
    pub data: AcssData,
}

impl Payload for ProposeMessage {
    const KIND: MessageKind = MessageKind::Propose;
}

/// Node `i` to node `j`: shard `j` of the payload with hash `hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoMessage {
    pub shard: Shard,
    pub hash: Hash,
}

impl Payload for EchoMessage {
    const KIND: MessageKind = MessageKind::Echo;
}

/// Broadcast once a node has seen enough matching echoes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyMessage {
    pub shard: Shard,
    pub hash: Hash,
}

impl Payload for ReadyMessage {
    const KIND: MessageKind = MessageKind::Ready;
}

/// Local: the decoded broadcast payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub payload: Vec<u8>,
    pub hash: Hash,
}

impl Payload for OutputMessage {
    const KIND: MessageKind = MessageKind::Output;
}

/// Hash of the secret commitment, sent to the other committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMessage {
    pub commitment_hash: Hash,
}

impl Payload for CommitmentMessage {
    const KIND: MessageKind = MessageKind::Commitment;
}

/// Complaint that the sender's share failed verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicateReceiveMessage {
    /// Sender's ECDH point with the dealer's ephemeral key, compressed.
    pub symmetric_key: Vec<u8>,
    /// Proof that `symmetric_key` was honestly derived.
    pub proof: Vec<u8>,
}

impl Payload for ImplicateReceiveMessage {
    const KIND: MessageKind = MessageKind::ImplicateReceive;
}

/// Local: check an implicate now that the dealt data is available.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicateExecuteMessage {
    pub accused_by: NodeIndex,
    pub symmetric_key: Vec<u8>,
    pub proof: Vec<u8>,
}

impl Payload for ImplicateExecuteMessage {
    const KIND: MessageKind = MessageKind::ImplicateExecute;
}

/// Local: an implicate was accepted; help recover.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecoveryMessage {}

impl Payload for ShareRecoveryMessage {
    const KIND: MessageKind = MessageKind::ShareRecovery;
}

/// A valid holder's key material so a recovering node can decrypt and
/// verify the holder's share itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveShareRecoveryMessage {
    pub symmetric_key: Vec<u8>,
    pub proof: Vec<u8>,
    pub data: AcssData,
}

impl Payload for ReceiveShareRecoveryMessage {
    const KIND: MessageKind = MessageKind::ReceiveShareRecovery;
}
