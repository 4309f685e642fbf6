//! In-memory network harness for end-to-end DACSS tests.
//!
//! [`LocalNetwork`] runs every active member of both committees as a
//! [`DacssNode`] in one process. A pump task per node drains its outbox,
//! serializes each envelope to wire bytes and spawns one delivery task per
//! recipient, so messages interleave the way independent network
//! deliveries would. Silent members have keys (and are dealt shares) but
//! run no node: whatever is addressed to them is dropped.
//!
//! Run the tests:
//! ```sh
//! cargo test -p dpss-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::OsRng;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use dpss_crypto::{DacssCurve, Scalar};
use dpss_dacss::keys::generate_committee_keys;
use dpss_dacss::{
    DacssConfig, DacssNode, DacssOutput, EventBus, Outbound, Outbox, Recipient, RoundSnapshot,
    StaticKeys, StaticMembership,
};
use dpss_transport::Envelope;
use dpss_types::{AcssRoundId, CommitteeKind, CommitteeParams, NodeDetails};

/// Poll interval of [`wait_until`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// `log_level` written into every node's configuration.
const HARNESS_LOG_LEVEL: &str = "warn";

/// Default timeout for end-to-end scenarios.
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(30);

/// Install a test subscriber honouring `RUST_LOG`, falling back to
/// `default_level`. Only the first call in a process takes effect.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, what: &str, mut condition: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("timed out after {timeout:?} waiting for {what}");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

type Outputs<C> = Arc<Mutex<HashMap<NodeDetails, Vec<DacssOutput<C>>>>>;

/// Both committees of one test run.
pub struct LocalNetwork<C: DacssCurve> {
    pub old: CommitteeParams,
    pub new: CommitteeParams,
    /// Every member's private key, silent members included.
    pub secrets: HashMap<NodeDetails, Scalar<C>>,
    /// Public key directory shared by all nodes.
    pub public: HashMap<NodeDetails, C>,
    nodes: Arc<HashMap<NodeDetails, Arc<DacssNode<C>>>>,
    outputs: Outputs<C>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: DacssCurve> LocalNetwork<C> {
    /// Start both committees. Members listed in `silent` never run.
    pub fn start(old: CommitteeParams, new: CommitteeParams, silent: &[NodeDetails]) -> anyhow::Result<Self> {
        let (secrets, public) = generate_committee_keys::<C, _>(old.n, new.n, &mut OsRng);
        let silent: HashSet<NodeDetails> = silent.iter().copied().collect();

        let mut nodes = HashMap::new();
        let mut receivers = Vec::new();
        let outputs: Outputs<C> = Arc::new(Mutex::new(HashMap::new()));
        let mut tasks = Vec::new();

        let members = members(CommitteeKind::Old, &old).chain(members(CommitteeKind::New, &new));
        for details in members.filter(|d| !silent.contains(d)) {
            let config = DacssConfig::from_toml_str(&node_config::<C>(details, &old, &new))
                .with_context(|| format!("config for {details}"))?;
            init_tracing(&config.runtime.log_level);
            let membership = Arc::new(StaticMembership::from_config(&config)?);
            let secret = *secrets
                .get(&details)
                .with_context(|| format!("no key for {details}"))?;
            let keys = Arc::new(StaticKeys::new(secret, public.clone()));
            let (outbox, receiver) = Outbox::channel(details);
            let events = EventBus::new(config.runtime.event_capacity);

            let mut subscription = events.subscribe();
            let sink = Arc::clone(&outputs);
            tasks.push(tokio::spawn(async move {
                while let Ok(output) = subscription.recv().await {
                    sink.lock().await.entry(details).or_default().push(output);
                }
            }));

            let node = DacssNode::new(membership, keys, outbox, events)?;
            nodes.insert(details, Arc::new(node));
            receivers.push(receiver);
        }

        let nodes = Arc::new(nodes);
        for receiver in receivers {
            tasks.push(tokio::spawn(pump(receiver, Arc::clone(&nodes), old, new)));
        }
        tracing::info!(old_n = old.n, new_n = new.n, active = nodes.len(), "local network started");

        Ok(Self {
            old,
            new,
            secrets,
            public,
            nodes,
            outputs,
            tasks,
        })
    }

    pub fn node(&self, details: NodeDetails) -> Option<&Arc<DacssNode<C>>> {
        self.nodes.get(&details)
    }

    /// Running members of a committee, in index order.
    pub fn active(&self, committee: CommitteeKind) -> Vec<NodeDetails> {
        let mut active: Vec<NodeDetails> = self
            .nodes
            .keys()
            .filter(|d| d.committee == committee)
            .copied()
            .collect();
        active.sort_by_key(|d| d.index);
        active
    }

    pub fn params(&self, committee: CommitteeKind) -> CommitteeParams {
        match committee {
            CommitteeKind::Old => self.old,
            CommitteeKind::New => self.new,
        }
    }

    /// Deliver `envelope` as if `from` had sent it, through the wire
    /// encoding.
    pub fn deliver(&self, from: NodeDetails, recipient: Recipient, envelope: Envelope) -> anyhow::Result<()> {
        let bytes = envelope.to_bytes()?;
        route(&self.nodes, self.old, self.new, from, recipient, Arc::new(bytes));
        Ok(())
    }

    pub async fn snapshot(&self, details: NodeDetails, round: &AcssRoundId) -> Option<RoundSnapshot<C>> {
        self.node(details)?.round_snapshot(round).await
    }

    /// Outputs a node has emitted so far.
    pub async fn outputs_of(&self, details: NodeDetails) -> Vec<DacssOutput<C>> {
        self.outputs
            .lock()
            .await
            .get(&details)
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until every node in `expected` has emitted an output for
    /// `round`.
    pub async fn wait_for_outputs(&self, round: AcssRoundId, expected: &[NodeDetails]) -> anyhow::Result<()> {
        wait_until(SCENARIO_TIMEOUT, &format!("outputs for {round}"), move || async move {
            let outputs = self.outputs.lock().await;
            let done = expected.iter().all(|details| {
                outputs
                    .get(details)
                    .is_some_and(|emitted| emitted.iter().any(|o| o.round == round))
            });
            done
        })
        .await
    }
}

impl<C: DacssCurve> Drop for LocalNetwork<C> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn members(committee: CommitteeKind, params: &CommitteeParams) -> impl Iterator<Item = NodeDetails> {
    (1..=params.n as u32).map(move |index| NodeDetails::new(index, committee))
}

fn node_config<C: DacssCurve>(details: NodeDetails, old: &CommitteeParams, new: &CommitteeParams) -> String {
    format!(
        r#"
        [node]
        index = {index}
        committee = "{committee}"
        curve = "{curve}"

        [old_committee]
        n = {old_n}
        t = {old_t}

        [new_committee]
        n = {new_n}
        t = {new_t}

        [runtime]
        event_capacity = 64
        log_level = "{log_level}"
        "#,
        index = details.index,
        committee = details.committee,
        curve = C::NAME,
        old_n = old.n,
        old_t = old.t,
        new_n = new.n,
        new_t = new.t,
        log_level = HARNESS_LOG_LEVEL,
    )
}

async fn pump<C: DacssCurve>(
    mut receiver: mpsc::UnboundedReceiver<Outbound>,
    nodes: Arc<HashMap<NodeDetails, Arc<DacssNode<C>>>>,
    old: CommitteeParams,
    new: CommitteeParams,
) {
    while let Some(outbound) = receiver.recv().await {
        match outbound.envelope.to_bytes() {
            Ok(bytes) => route(&nodes, old, new, outbound.from, outbound.recipient, Arc::new(bytes)),
            Err(e) => tracing::warn!(from = %outbound.from, error = %e, "unencodable envelope"),
        }
    }
}

fn route<C: DacssCurve>(
    nodes: &Arc<HashMap<NodeDetails, Arc<DacssNode<C>>>>,
    old: CommitteeParams,
    new: CommitteeParams,
    from: NodeDetails,
    recipient: Recipient,
    bytes: Arc<Vec<u8>>,
) {
    let targets: Vec<NodeDetails> = match recipient {
        Recipient::Node(details) => vec![details],
        Recipient::Committee(CommitteeKind::Old) => members(CommitteeKind::Old, &old).collect(),
        Recipient::Committee(CommitteeKind::New) => members(CommitteeKind::New, &new).collect(),
    };
    for target in targets {
        let Some(node) = nodes.get(&target).map(Arc::clone) else {
            continue;
        };
        let bytes = Arc::clone(&bytes);
        tokio::spawn(async move {
            node.handle_bytes(from, &bytes).await;
        });
    }
}
