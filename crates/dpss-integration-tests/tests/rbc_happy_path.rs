//! Integration test: sharing with silent members.
//!
//! Old committee n = 7, t = 2 (k = 3) with members 6 and 7 silent; new
//! committee n = 4, t = 1. The dealer shares one secret:
//! 1. The five running old members finish the broadcast with a valid share
//! 2. Every running member of both committees emits its output
//! 3. Any three old shares reconstruct the secret

use dpss_crypto::{Scalar, Secp256k1, Shamir};
use dpss_integration_tests::LocalNetwork;
use dpss_rbc::RbcPhase;
use dpss_types::{AcssRoundId, CommitteeKind, CommitteeParams, NodeDetails, PssId};

fn old(index: u32) -> NodeDetails {
    NodeDetails::new(index, CommitteeKind::Old)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_five_of_seven_reach_ended_with_valid_shares() {
    let network = LocalNetwork::<Secp256k1>::start(
        CommitteeParams::new(7, 2).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[old(6), old(7)],
    )
    .expect("network");

    let round = AcssRoundId::new(1, PssId(1), 0);
    let secret = Scalar::<Secp256k1>::from(0x00da_c55e_u64);
    network
        .node(old(1))
        .expect("dealer")
        .deal(round, secret)
        .expect("deal");

    let mut running = network.active(CommitteeKind::Old);
    running.extend(network.active(CommitteeKind::New));
    network.wait_for_outputs(round, &running).await.expect("outputs");

    let mut shares = Vec::new();
    for member in network.active(CommitteeKind::Old) {
        let snapshot = network.snapshot(member, &round).await.expect("round state");
        assert_eq!(snapshot.phase, RbcPhase::Ended, "{member} not ended");
        assert!(snapshot.valid_share_output, "{member} has no valid share");
        assert!(!snapshot.share_recovery_ongoing);
        shares.push(snapshot.received_share.expect("share"));
    }
    assert_eq!(shares.len(), 5);
    assert!(network.node(old(6)).is_none());
    assert!(network.node(old(7)).is_none());

    let shamir = Shamir::new(3, 7).expect("shamir");
    for window in shares.windows(3) {
        assert_eq!(shamir.combine(window).expect("combine"), secret);
    }
    let spread = [shares[0].clone(), shares[2].clone(), shares[4].clone()];
    assert_eq!(shamir.combine(&spread).expect("combine"), secret);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outputs_emitted_once_per_round() {
    let network = LocalNetwork::<Secp256k1>::start(
        CommitteeParams::new(4, 1).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");

    let round = AcssRoundId::new(2, PssId(3), 0);
    network
        .node(old(2))
        .expect("dealer")
        .deal(round, Scalar::<Secp256k1>::from(77u64))
        .expect("deal");

    let mut running = network.active(CommitteeKind::Old);
    running.extend(network.active(CommitteeKind::New));
    network.wait_for_outputs(round, &running).await.expect("outputs");
    // Let stragglers (late READYs, duplicate commitments) drain.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    for member in running {
        let outputs = network.outputs_of(member).await;
        assert_eq!(outputs.len(), 1, "{member} emitted {} outputs", outputs.len());
        assert_eq!(outputs[0].share.id, member.index);
        assert_eq!(outputs[0].committee, member.committee);
    }
}

#[tokio::test]
async fn test_only_dealer_may_deal() {
    let network = LocalNetwork::<Secp256k1>::start(
        CommitteeParams::new(4, 1).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");
    let round = AcssRoundId::new(1, PssId(1), 0);
    let result = network
        .node(old(2))
        .expect("node")
        .deal(round, Scalar::<Secp256k1>::from(5u64));
    assert!(matches!(result, Err(dpss_dacss::DacssError::NotDealer { .. })));
    let result = network
        .node(NodeDetails::new(1, CommitteeKind::New))
        .expect("node")
        .deal(round, Scalar::<Secp256k1>::from(5u64));
    assert!(result.is_err());
}
