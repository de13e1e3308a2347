//! Node configuration: a TOML file (`nxf.toml`) parsed once at startup,
//! with CLI flags (and the `NXF_*` environment variables `clap` binds
//! them to) taking precedence over whatever the file says.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nxf_core::constants::{CONSENSUS_INTERVAL_SECS, PROTOCOL_VERSION, SYNC_COOLDOWN_SECS};
use serde::{Deserialize, Serialize};

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_p2p_listen() -> String {
    "0.0.0.0:7777".into()
}

fn default_rpc_addr() -> SocketAddr {
    "127.0.0.1:8545".parse().expect("valid default rpc addr")
}

fn default_protocol_version() -> u32 {
    PROTOCOL_VERSION
}

fn default_consensus_interval_secs() -> u64 {
    CONSENSUS_INTERVAL_SECS
}

fn default_sync_cooldown_secs() -> f64 {
    SYNC_COOLDOWN_SECS
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

/// Immutable, process-wide node configuration, parsed once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_p2p_listen")]
    pub p2p_listen: String,

    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: SocketAddr,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    #[serde(default = "default_consensus_interval_secs")]
    pub consensus_interval_secs: u64,

    #[serde(default = "default_sync_cooldown_secs")]
    pub sync_cooldown_secs: f64,

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Other validators' Base58Check addresses making up this node's UNL.
    /// Empty means single-validator operation (consensus converges
    /// instantly on the local proposal).
    #[serde(default)]
    pub unl: Vec<String>,

    /// Path to the node's persisted identity keypair, relative to
    /// `data_dir` unless absolute.
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,

    /// Path to genesis parameters (JSON), only consulted on a fresh
    /// database.
    #[serde(default)]
    pub genesis_params: Option<PathBuf>,
}

fn default_identity_file() -> PathBuf {
    PathBuf::from("identity.json")
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            p2p_listen: default_p2p_listen(),
            bootstrap_peers: Vec::new(),
            rpc_addr: default_rpc_addr(),
            protocol_version: default_protocol_version(),
            consensus_interval_secs: default_consensus_interval_secs(),
            sync_cooldown_secs: default_sync_cooldown_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            unl: Vec::new(),
            identity_file: default_identity_file(),
            genesis_params: None,
        }
    }
}

impl NodeConfig {
    /// Load `path` if it exists, falling back to defaults otherwise — a
    /// missing config file is not an error, since `nxf-node` is usable
    /// with CLI flags alone for local development.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn identity_path(&self) -> PathBuf {
        if self.identity_file.is_absolute() {
            self.identity_file.clone()
        } else {
            self.data_dir.join(&self.identity_file)
        }
    }
}
