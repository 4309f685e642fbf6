//! Integration test: both committees receive the same secret.
//!
//! 1. A dealer batch deals fresh random secrets for one PSS session
//! 2. Every member of both committees emits an output for every round
//! 3. All outputs of a round carry the same commitment hash
//! 4. Old and new shares of a round reconstruct the same secret
//! 5. Session teardown drops all round state

use dpss_crypto::{Secp256k1, Shamir, ShamirShare};
use dpss_integration_tests::LocalNetwork;
use dpss_types::{CommitteeKind, CommitteeParams, NodeDetails, PssId};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_rounds_agree_across_committees() {
    let network = LocalNetwork::<Secp256k1>::start(
        CommitteeParams::new(7, 2).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");

    let pss_id = PssId(11);
    let dealer = NodeDetails::new(4, CommitteeKind::Old);
    // n - 2t = 3 sharings per round: 5 shares need 2 rounds.
    let rounds = network
        .node(dealer)
        .expect("dealer")
        .start_batch(pss_id, 5)
        .expect("batch");
    assert_eq!(rounds.len(), 2);
    assert!(rounds.iter().all(|r| r.dealer == 4 && r.pss_id == pss_id));

    let old_members = network.active(CommitteeKind::Old);
    let new_members = network.active(CommitteeKind::New);
    let mut everyone = old_members.clone();
    everyone.extend(new_members.iter().copied());

    let old_shamir = Shamir::new(network.old.k, network.old.n).expect("shamir");
    let new_shamir = Shamir::new(network.new.k, network.new.n).expect("shamir");

    let mut secrets = Vec::new();
    for round in &rounds {
        network.wait_for_outputs(*round, &everyone).await.expect("outputs");

        let mut commitment_hashes = Vec::new();
        let mut old_shares: Vec<ShamirShare<_>> = Vec::new();
        let mut new_shares: Vec<ShamirShare<_>> = Vec::new();
        for member in &everyone {
            let output = network
                .outputs_of(*member)
                .await
                .into_iter()
                .find(|o| o.round == *round)
                .expect("output");
            commitment_hashes.push(output.commitment_hash);
            match member.committee {
                CommitteeKind::Old => old_shares.push(output.share),
                CommitteeKind::New => new_shares.push(output.share),
            }
        }
        assert!(commitment_hashes.windows(2).all(|w| w[0] == w[1]));

        let old_secret = old_shamir.combine(&old_shares[..network.old.k]).expect("old combine");
        let new_secret = new_shamir.combine(&new_shares[2..]).expect("new combine");
        assert_eq!(old_secret, new_secret);
        secrets.push(old_secret);
    }
    assert_ne!(secrets[0], secrets[1]);

    // A node from a different session is untouched by teardown.
    let member = NodeDetails::new(2, CommitteeKind::New);
    let node = network.node(member).expect("node");
    assert_eq!(node.teardown_session(PssId(12)).await, 0);
    assert_eq!(node.teardown_session(pss_id).await, 2);
    assert!(network.snapshot(member, &rounds[0]).await.is_none());
}
