// src/core/model.rs

//! Boundary records exchanged with agents and peer transfer nodes.

use serde::{Deserialize, Serialize};

/// One raw metric report as submitted by an agent or forwarded by a peer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricValue {
    pub endpoint: String,
    pub metric: String,
    pub value: f64,
    /// Reporting period in seconds.
    pub step: i64,
    pub counter_type: String,
    pub tags: String,
    pub timestamp: i64,
}

/// The reply to a `Transfer.Update` batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferResponse {
    pub message: String,
    pub total: usize,
}
