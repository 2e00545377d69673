// src/connection/handler.rs

//! Defines the `ConnectionHandler`, which owns one framed connection and
//! serves calls on it until the peer goes away.

use crate::core::FluxgateError;
use crate::core::handler::RpcService;
use crate::core::protocol::{JsonRpcCodec, RpcResponse};
use crate::server::RpcStream;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::codec::Framed;
use tracing::debug;

/// Manages the full lifecycle of one ingested connection.
pub struct ConnectionHandler {
    framed: Framed<RpcStream, JsonRpcCodec>,
    addr: SocketAddr,
    service: Arc<dyn RpcService>,
}

impl ConnectionHandler {
    pub fn new(stream: RpcStream, addr: SocketAddr, service: Arc<dyn RpcService>) -> Self {
        Self {
            framed: Framed::new(stream, JsonRpcCodec),
            addr,
            service,
        }
    }

    /// Reads calls until EOF or a transport/framing error. Calls on this
    /// connection are answered strictly in the order their frames arrive;
    /// a dispatch failure becomes an error reply, not a dropped link.
    pub async fn run(&mut self) -> Result<(), FluxgateError> {
        while let Some(result) = self.framed.next().await {
            let request = result?;
            debug!("{}: call {} (id {})", self.addr, request.method, request.id);

            let response = match self.service.dispatch(&request.method, request.params).await {
                Ok(value) => RpcResponse::result(request.id, value),
                Err(e) => RpcResponse::failure(request.id, e.to_string()),
            };
            self.framed.send(response).await?;
        }

        debug!("{}: connection closed by peer", self.addr);
        Ok(())
    }
}
