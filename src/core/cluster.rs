// src/core/cluster.rs

//! The cluster topology model: logical shard names mapped to ordered backend
//! address lists, derived from the flat comma-joined form in the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ordered backend addresses behind one logical cluster node.
///
/// Instances are built in one pass by [`normalize`] and replaced wholesale
/// when the configuration reloads; they are never mutated in place, so the
/// consistent-hashing router can hold a snapshot without locking.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterNode {
    pub addrs: Vec<String>,
}

impl ClusterNode {
    pub fn new(addrs: Vec<String>) -> Self {
        Self { addrs }
    }
}

/// Expands the flat cluster mapping (`"node" -> "host1, host2"`) into its
/// queryable form (`"node" -> ClusterNode { addrs: ["host1", "host2"] }`).
///
/// Tokens keep their split order and are individually trimmed. Nothing is
/// deduplicated or syntax-checked here; a malformed address surfaces later
/// as a connection error on whatever dials it. Note that splitting an empty
/// string still yields one token, so `"node" -> ""` produces a node with a
/// single empty address.
pub fn normalize(cluster: &HashMap<String, String>) -> HashMap<String, ClusterNode> {
    cluster
        .iter()
        .map(|(node, joined)| {
            let addrs = joined.split(',').map(|addr| addr.trim().to_string()).collect();
            (node.clone(), ClusterNode::new(addrs))
        })
        .collect()
}
