//! Per-curve dispatch.
//!
//! A process may run rounds over both curves. The router owns one node per
//! curve and hands each envelope to the node named by its `curve` field.

use std::sync::Arc;

use dpss_crypto::{Ed25519, Secp256k1};
use dpss_transport::Envelope;
use dpss_types::{CurveName, NodeDetails};

use crate::node::DacssNode;

#[derive(Default, Clone)]
pub struct CurveRouter {
    secp256k1: Option<Arc<DacssNode<Secp256k1>>>,
    ed25519: Option<Arc<DacssNode<Ed25519>>>,
}

impl CurveRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secp256k1(mut self, node: Arc<DacssNode<Secp256k1>>) -> Self {
        self.secp256k1 = Some(node);
        self
    }

    pub fn with_ed25519(mut self, node: Arc<DacssNode<Ed25519>>) -> Self {
        self.ed25519 = Some(node);
        self
    }

    pub fn secp256k1(&self) -> Option<&Arc<DacssNode<Secp256k1>>> {
        self.secp256k1.as_ref()
    }

    pub fn ed25519(&self) -> Option<&Arc<DacssNode<Ed25519>>> {
        self.ed25519.as_ref()
    }

    /// Whether a node is registered for `curve`.
    pub fn supports(&self, curve: CurveName) -> bool {
        match curve {
            CurveName::Secp256k1 => self.secp256k1.is_some(),
            CurveName::Ed25519 => self.ed25519.is_some(),
        }
    }

    /// Route an envelope. Envelopes for an unregistered curve are dropped.
    pub async fn handle_message(&self, from: NodeDetails, envelope: Envelope) {
        match envelope.curve {
            CurveName::Secp256k1 => match &self.secp256k1 {
                Some(node) => node.handle_message(from, envelope).await,
                None => drop_unrouted(from, &envelope),
            },
            CurveName::Ed25519 => match &self.ed25519 {
                Some(node) => node.handle_message(from, envelope).await,
                None => drop_unrouted(from, &envelope),
            },
        }
    }

    /// Decode wire bytes and route them.
    pub async fn handle_bytes(&self, from: NodeDetails, bytes: &[u8]) {
        match Envelope::from_bytes(bytes) {
            Ok(envelope) => self.handle_message(from, envelope).await,
            Err(e) => tracing::warn!(%from, error = %e, "dropping malformed envelope"),
        }
    }
}

fn drop_unrouted(from: NodeDetails, envelope: &Envelope) {
    tracing::warn!(
        %from,
        round = %envelope.round,
        curve = %envelope.curve,
        kind = %envelope.kind,
        "no node for curve, dropping"
    );
}
