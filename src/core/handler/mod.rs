// src/core/handler/mod.rs

//! The dispatch seam between the ingestion listeners and the RPC methods
//! they serve.

mod transfer;

pub use transfer::{LoggingSink, MetricSink, Transfer};

use crate::core::FluxgateError;
use async_trait::async_trait;
use serde_json::Value;

/// A service object reachable from both ingestion ports. One instance is
/// shared by every connection, so implementations must be safe to call
/// concurrently.
#[async_trait]
pub trait RpcService: Send + Sync {
    /// Routes one call to the method it names and returns the result value.
    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, FluxgateError>;
}
