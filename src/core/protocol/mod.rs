// src/core/protocol/mod.rs

//! Wire protocol types for the RPC ingestion ports.

pub mod jsonrpc;

pub use jsonrpc::{JsonRpcCodec, RpcRequest, RpcResponse};
