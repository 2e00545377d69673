// src/core/protocol/jsonrpc.rs

//! Implements the line-delimited JSON-RPC framing spoken on both ingestion
//! ports, as `Encoder` and `Decoder` implementations for network
//! communication: one JSON object per newline-terminated line, each way.

use crate::core::FluxgateError;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

/// Hard cap on a single frame, so an unframed or hostile peer cannot grow
/// the read buffer without bound.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A single call frame as read off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// A single reply frame. `result` and `error` are always present on the
/// wire (`null` when unset) and `id` echoes the request being answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub result: Value,
    pub error: Value,
    pub id: Value,
}

impl RpcResponse {
    /// A successful reply carrying `result`.
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            result,
            error: Value::Null,
            id,
        }
    }

    /// A failed reply carrying a textual `error`.
    pub fn failure(id: Value, error: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Value::String(error.into()),
            id,
        }
    }
}

/// A `tokio_util::codec` implementation for newline-delimited JSON-RPC.
#[derive(Debug, Default)]
pub struct JsonRpcCodec;

impl Decoder for JsonRpcCodec {
    type Item = RpcRequest;
    type Error = FluxgateError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|&b| b == b'\n') else {
                // No full line yet. Refuse to buffer past the frame cap.
                if src.len() > MAX_LINE_BYTES {
                    return Err(FluxgateError::FrameTooLarge(MAX_LINE_BYTES));
                }
                return Ok(None);
            };
            if pos > MAX_LINE_BYTES {
                return Err(FluxgateError::FrameTooLarge(MAX_LINE_BYTES));
            }

            let line = src.split_to(pos + 1);
            let line = &line[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                // Blank lines carry no frame.
                continue;
            }

            let request = serde_json::from_slice(line)
                .map_err(|e| FluxgateError::InvalidRequest(e.to_string()))?;
            return Ok(Some(request));
        }
    }
}

impl Encoder<RpcResponse> for JsonRpcCodec {
    type Error = FluxgateError;

    fn encode(&mut self, item: RpcResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item)?;
        dst.reserve(body.len() + 1);
        dst.extend_from_slice(&body);
        dst.put_u8(b'\n');
        Ok(())
    }
}
