//! Integration test: a dealer that proposes different data to different
//! members of one round.
//!
//! Old committee n = 7, t = 2. Dealer 1 sends payload A to members 1-5 and
//! payload B to members 6 and 7:
//! 1. Members 1-5 gather 2t + 1 echoes for A and end the broadcast on A
//! 2. No member ever delivers B
//! 3. Every member that ends agrees on A

use std::time::Duration;

use rand::rngs::OsRng;

use dpss_crypto::curve::keypair;
use dpss_crypto::{Scalar, Secp256k1};
use dpss_dacss::dealer::build_acss_data;
use dpss_dacss::{Recipient, StaticKeys};
use dpss_integration_tests::{wait_until, LocalNetwork, SCENARIO_TIMEOUT};
use dpss_rbc::RbcPhase;
use dpss_transport::messages::ProposeMessage;
use dpss_transport::{AcssData, Envelope};
use dpss_types::{AcssRoundId, CommitteeKind, CommitteeParams, CurveName, NodeDetails, PssId};

type Curve = Secp256k1;

fn old(index: u32) -> NodeDetails {
    NodeDetails::new(index, CommitteeKind::Old)
}

fn dealing(network: &LocalNetwork<Curve>, dealer: NodeDetails, secret: u64) -> AcssData {
    let keys = StaticKeys::new(network.secrets[&dealer], network.public.clone());
    let (eph_sk, _) = keypair::<Curve, _>(&mut OsRng);
    build_acss_data(
        &keys,
        CommitteeKind::Old,
        &network.old,
        Scalar::<Curve>::from(secret),
        &eph_sk,
        &mut OsRng,
    )
    .expect("dealing")
    .data
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_split_proposal_delivers_one_payload() {
    let network = LocalNetwork::<Curve>::start(
        CommitteeParams::new(7, 2).expect("old params"),
        CommitteeParams::new(4, 1).expect("new params"),
        &[],
    )
    .expect("network");

    let dealer = old(1);
    let round = AcssRoundId::new(dealer.index, PssId(21), 0);
    let payload_a = dealing(&network, dealer, 111);
    let payload_b = dealing(&network, dealer, 222);
    let hash_a = payload_a.hash().expect("hash a");
    let hash_b = payload_b.hash().expect("hash b");
    assert_ne!(hash_a, hash_b);

    for index in 1..=7u32 {
        let data = if index <= 5 {
            payload_a.clone()
        } else {
            payload_b.clone()
        };
        let propose = Envelope::new(
            round,
            CurveName::Secp256k1,
            &ProposeMessage {
                committee: CommitteeKind::Old,
                data,
            },
        )
        .expect("envelope");
        network
            .deliver(dealer, Recipient::Node(old(index)), propose)
            .expect("deliver");
    }

    let majority: Vec<NodeDetails> = (1..=5).map(old).collect();
    let (majority, net) = (&majority, &network);
    wait_until(SCENARIO_TIMEOUT, "majority ends on payload A", move || async move {
        for member in majority {
            match net.snapshot(*member, &round).await {
                Some(snapshot) if snapshot.phase == RbcPhase::Ended => {}
                _ => return false,
            }
        }
        true
    })
    .await
    .expect("majority ended");

    // Give the READYs time to reach members 6 and 7.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut ended = 0;
    for member in network.active(CommitteeKind::Old) {
        let snapshot = network.snapshot(member, &round).await.expect("round state");
        if snapshot.phase == RbcPhase::Ended {
            ended += 1;
            assert_eq!(snapshot.acss_data_hash, Some(hash_a), "{member} ended on another payload");
        }
        assert!(
            !(snapshot.phase == RbcPhase::Ended && snapshot.acss_data_hash == Some(hash_b)),
            "{member} delivered payload B"
        );
    }
    assert!(ended >= 5);
}
