//! Integration test: rounds over ed25519 and per-curve routing.
//!
//! 1. A full round over ed25519 with four members per committee
//! 2. A router with only an ed25519 node drops secp256k1 envelopes
//! 3. The router delivers ed25519 envelopes to its node

use dpss_crypto::{Ed25519, Scalar, Shamir};
use dpss_dacss::CurveRouter;
use dpss_integration_tests::LocalNetwork;
use dpss_transport::messages::CommitmentMessage;
use dpss_transport::Envelope;
use dpss_types::{AcssRoundId, CommitteeKind, CommitteeParams, CurveName, NodeDetails, PssId};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ed25519_round() {
    let network = LocalNetwork::<Ed25519>::start(
        CommitteeParams::new(4, 1).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");

    let round = AcssRoundId::new(3, PssId(2), 0);
    let secret = Scalar::<Ed25519>::from(2_024u64);
    network
        .node(NodeDetails::new(3, CommitteeKind::Old))
        .expect("dealer")
        .deal(round, secret)
        .expect("deal");

    let new_members = network.active(CommitteeKind::New);
    let mut everyone = network.active(CommitteeKind::Old);
    everyone.extend(new_members.iter().copied());
    network.wait_for_outputs(round, &everyone).await.expect("outputs");

    let mut shares = Vec::new();
    for member in &new_members {
        let snapshot = network.snapshot(*member, &round).await.expect("round state");
        shares.push(snapshot.received_share.expect("share"));
    }
    let shamir = Shamir::new(2, 4).expect("shamir");
    assert_eq!(shamir.combine(&shares[1..3]).expect("combine"), secret);
}

#[tokio::test]
async fn test_router_dispatches_by_curve() {
    let network = LocalNetwork::<Ed25519>::start(
        CommitteeParams::new(4, 1).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");
    let member = NodeDetails::new(1, CommitteeKind::Old);
    let router = CurveRouter::new().with_ed25519(network.node(member).expect("node").clone());
    assert!(router.supports(CurveName::Ed25519));
    assert!(!router.supports(CurveName::Secp256k1));

    let sender = NodeDetails::new(2, CommitteeKind::New);
    let secp_round = AcssRoundId::new(1, PssId(40), 0);
    let ed_round = AcssRoundId::new(1, PssId(41), 0);
    let commitment = CommitmentMessage {
        commitment_hash: [6u8; 32],
    };

    let secp = Envelope::new(secp_round, CurveName::Secp256k1, &commitment).expect("envelope");
    router.handle_message(sender, secp).await;
    assert!(network.snapshot(member, &secp_round).await.is_none());

    let ed = Envelope::new(ed_round, CurveName::Ed25519, &commitment).expect("envelope");
    router
        .handle_bytes(sender, &ed.to_bytes().expect("bytes"))
        .await;
    assert!(network.snapshot(member, &ed_round).await.is_some());
}
