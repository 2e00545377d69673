// src/config.rs

//! Manages node configuration: loading the JSON config file, deriving the
//! cluster topology, validating, and publishing atomic snapshots.

use crate::core::cluster::{self, ClusterNode};
use anyhow::{Context, Result, anyhow};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing::info;

/// Listen settings for the HTTP admin surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub listen: String,
}

/// Listen settings for the plaintext RPC port agents submit metrics to.
/// Plaintext is an intra-datacenter transport; anything crossing networks
/// belongs on the TLS port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcConfig {
    pub enabled: bool,
    pub listen: String,
}

/// Listen settings for the TLS RPC port peer transfer nodes connect to
/// across untrusted networks. When `enabled`, both `crt_file` and
/// `key_file` must reference a loadable PEM pair at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTlsConfig {
    pub enabled: bool,
    pub listen: String,
    pub crt_file: String,
    pub key_file: String,
}

/// Listen settings for the legacy raw-socket intake.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketConfig {
    pub enabled: bool,
    pub listen: String,
    pub timeout: u64,
}

/// Client-pool and topology settings for a sharded downstream cluster.
/// Used for both the judge and graph backends, which share a shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub enabled: bool,
    pub batch: usize,
    pub conn_timeout: u64,
    pub call_timeout: u64,
    pub max_conns: usize,
    pub max_idle: usize,
    /// Hashing fan-out factor consumed by the router.
    pub replicas: usize,
    /// Human-edited form: logical node name to comma-joined address list.
    pub cluster: HashMap<String, String>,
    /// Derived from `cluster` at load time; has no representation in the
    /// config file itself.
    #[serde(skip)]
    pub cluster_list: HashMap<String, ClusterNode>,
}

/// Client settings for the OpenTSDB sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TsdbConfig {
    pub enabled: bool,
    pub batch: usize,
    pub conn_timeout: u64,
    pub call_timeout: u64,
    pub max_conns: usize,
    pub max_idle: usize,
    #[serde(rename = "retry")]
    pub max_retry: usize,
    pub address: String,
}

/// Client settings for forwarding to peer transfer nodes. `use_tls`
/// selects which of a peer's two ports the outbound pool dials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferConfig {
    pub enabled: bool,
    #[serde(rename = "useTLS")]
    pub use_tls: bool,
    pub batch: usize,
    pub conn_timeout: u64,
    pub call_timeout: u64,
    pub max_conns: usize,
    pub max_idle: usize,
    #[serde(rename = "retry")]
    pub max_retry: usize,
    pub cluster: HashMap<String, String>,
}

/// Client settings for the InfluxDB sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InfluxdbConfig {
    pub enabled: bool,
    pub batch: usize,
    #[serde(rename = "retry")]
    pub max_retry: usize,
    pub max_conns: usize,
    pub timeout: u64,
    pub address: String,
    #[serde(rename = "db")]
    pub database: String,
    pub username: String,
    pub password: String,
    pub precision: String,
}

/// The root configuration tree, immutable after load.
///
/// Every sub-config is optional: an absent section means the feature is
/// disabled, never a fault. A reload builds a whole new tree and swaps it
/// in through [`ConfigStore`]; nothing is patched in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub debug: bool,
    /// Smallest reporting period accepted from agents, in seconds.
    pub min_step: i64,
    pub http: Option<HttpConfig>,
    pub rpc: Option<RpcConfig>,
    #[serde(rename = "rpcWithTLS")]
    pub rpc_with_tls: Option<RpcTlsConfig>,
    pub socket: Option<SocketConfig>,
    pub judge: Option<BackendConfig>,
    pub graph: Option<BackendConfig>,
    pub tsdb: Option<TsdbConfig>,
    pub transfer: Option<TransferConfig>,
    pub influxdb: Option<InfluxdbConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            min_step: default_min_step(),
            http: None,
            rpc: None,
            rpc_with_tls: None,
            socket: None,
            judge: None,
            graph: None,
            tsdb: None,
            transfer: None,
            influxdb: None,
        }
    }
}

fn default_min_step() -> i64 {
    30
}

impl Config {
    /// Reads and parses the JSON configuration at `path`, then derives the
    /// queryable cluster topology for the judge and graph backends.
    ///
    /// Loading the same file twice yields semantically equal configs. Any
    /// failure here is a boot-time fatal: the node must not run with a
    /// missing or partial topology.
    pub fn from_file(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(anyhow!("no configuration file given"));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at '{path}'"))?;
        let mut config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON from '{path}'"))?;

        if let Some(judge) = config.judge.as_mut() {
            judge.cluster_list = cluster::normalize(&judge.cluster);
        }
        if let Some(graph) = config.graph.as_mut() {
            graph.cluster_list = cluster::normalize(&graph.cluster);
        }

        config.validate()?;
        info!("configuration loaded from {path}");
        Ok(config)
    }

    /// Validates the parsed configuration for logical consistency.
    fn validate(&self) -> Result<()> {
        if self.min_step <= 0 {
            return Err(anyhow!("minStep must be positive, got {}", self.min_step));
        }

        if let Some(http) = &self.http
            && http.enabled
            && http.listen.trim().is_empty()
        {
            return Err(anyhow!("http.listen cannot be empty when http is enabled"));
        }

        if let Some(rpc) = &self.rpc
            && rpc.enabled
            && rpc.listen.trim().is_empty()
        {
            return Err(anyhow!("rpc.listen cannot be empty when rpc is enabled"));
        }

        if let Some(tls) = &self.rpc_with_tls
            && tls.enabled
        {
            if tls.listen.trim().is_empty() {
                return Err(anyhow!(
                    "rpcWithTLS.listen cannot be empty when rpcWithTLS is enabled"
                ));
            }
            if tls.crt_file.trim().is_empty() {
                return Err(anyhow!(
                    "rpcWithTLS.crtFile cannot be empty when rpcWithTLS is enabled"
                ));
            }
            if tls.key_file.trim().is_empty() {
                return Err(anyhow!(
                    "rpcWithTLS.keyFile cannot be empty when rpcWithTLS is enabled"
                ));
            }
        }

        if let Some(socket) = &self.socket
            && socket.enabled
            && socket.listen.trim().is_empty()
        {
            return Err(anyhow!("socket.listen cannot be empty when socket is enabled"));
        }

        Ok(())
    }
}

/// Publishes the current configuration snapshot to every component.
///
/// Readers take a cheap `Arc` clone and never observe a partially built
/// tree: a reload parses, normalizes, and validates a complete new
/// [`Config`] first, then swaps the pointer. Snapshots already handed out
/// stay valid until dropped. There is no unload; the store lives as long
/// as the process.
pub struct ConfigStore {
    current: ArcSwap<Config>,
}

impl ConfigStore {
    /// Loads `path` and opens a store holding the result.
    pub fn open(path: &str) -> Result<Self> {
        let config = Config::from_file(path)?;
        Ok(Self {
            current: ArcSwap::from_pointee(config),
        })
    }

    /// Wraps an already-built configuration, mainly for tests and embedding.
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Replaces the snapshot with a freshly loaded one.
    pub fn reload(&self, path: &str) -> Result<()> {
        let config = Config::from_file(path)?;
        self.current.store(Arc::new(config));
        Ok(())
    }
}
