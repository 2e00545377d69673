// src/core/handler/transfer.rs

//! The `Transfer` service: the single RPC object registered on both
//! ingestion ports.

use super::RpcService;
use crate::core::FluxgateError;
use crate::core::model::{MetricValue, TransferResponse};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Receives decoded metric batches from `Transfer.Update`. The pipeline
/// behind it owns validation, batching, and forwarding; the hand-off must
/// not block the connection that delivered the batch.
pub trait MetricSink: Send + Sync {
    fn push(&self, metrics: Vec<MetricValue>);
}

/// A sink that records batch arrival and drops the data. Stands in until a
/// forwarding pipeline is wired behind the node.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl MetricSink for LoggingSink {
    fn push(&self, metrics: Vec<MetricValue>) {
        debug!("received batch of {} metrics", metrics.len());
    }
}

/// The metric ingestion service.
pub struct Transfer {
    sink: Arc<dyn MetricSink>,
}

impl Transfer {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }

    fn update(&self, params: Value) -> Result<Value, FluxgateError> {
        // Some client libraries wrap the call's single argument in a
        // one-element array; accept both forms.
        let params = match params {
            Value::Array(ref items) if items.len() == 1 && items[0].is_array() => {
                items[0].clone()
            }
            other => other,
        };

        let metrics: Vec<MetricValue> = serde_json::from_value(params)
            .map_err(|e| FluxgateError::InvalidParams("Transfer.Update".into(), e.to_string()))?;
        let total = metrics.len();
        self.sink.push(metrics);

        let response = TransferResponse {
            message: "ok".into(),
            total,
        };
        Ok(serde_json::to_value(response)?)
    }
}

#[async_trait]
impl RpcService for Transfer {
    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, FluxgateError> {
        match method {
            "Transfer.Ping" => Ok(json!({ "code": 0 })),
            "Transfer.Update" => self.update(params),
            _ => Err(FluxgateError::UnknownMethod(method.to_string())),
        }
    }
}
