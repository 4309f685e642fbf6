//! Node configuration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use dpss_types::{CommitteeKind, CommitteeParams, CurveName, NodeDetails, NodeIndex};

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DacssConfig {
    pub node: NodeConfig,
    pub old_committee: CommitteeConfig,
    pub new_committee: CommitteeConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// This node's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// 1-based index within `committee`.
    pub index: NodeIndex,
    /// "old" | "new".
    pub committee: CommitteeKind,
    /// "secp256k1" | "ed25519".
    #[serde(default = "default_curve")]
    pub curve: CurveName,
}

/// Size and fault tolerance of one committee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitteeConfig {
    pub n: usize,
    pub t: usize,
}

/// Runtime knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Buffer size of the output event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_curve() -> CurveName {
    CurveName::Secp256k1
}

fn default_event_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl CommitteeConfig {
    pub fn params(&self) -> dpss_types::Result<CommitteeParams> {
        CommitteeParams::new(self.n, self.t)
    }
}

impl DacssConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: DacssConfig = toml::from_str(content).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check committee parameters and that this node belongs to its committee.
    pub fn validate(&self) -> anyhow::Result<()> {
        let old = self.old_committee.params().context("old committee")?;
        let new = self.new_committee.params().context("new committee")?;
        let own = match self.node.committee {
            CommitteeKind::Old => old,
            CommitteeKind::New => new,
        };
        if !own.contains(self.node.index) {
            anyhow::bail!(
                "node index {} outside {} committee of {}",
                self.node.index,
                self.node.committee,
                own.n
            );
        }
        if self.runtime.event_capacity == 0 {
            anyhow::bail!("event_capacity must be positive");
        }
        self.runtime
            .log_level
            .parse::<tracing::Level>()
            .with_context(|| format!("invalid log_level {:?}", self.runtime.log_level))?;
        Ok(())
    }

    pub fn details(&self) -> NodeDetails {
        NodeDetails::new(self.node.index, self.node.committee)
    }
}
