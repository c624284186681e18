//! JSON-RPC endpoint for miners
//!
//! Speaks the `eth_getWork` / `eth_submitWork` / `eth_submitHashrate`
//! subset of the Ethereum JSON-RPC API that mining software expects.

use crate::types::{BlockNonce, H256};
use crate::{Error, Result};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub mod service;

pub use service::PoolService;

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const SERVER_ERROR: i64 = -32000;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Router serving JSON-RPC on `/`
pub fn router(service: Arc<PoolService>) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serve the router until `shutdown` fires
pub async fn serve(
    addr: SocketAddr,
    service: Arc<PoolService>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Miner RPC listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Miner RPC stopped");
    Ok(())
}

async fn handle_rpc(
    State(service): State<Arc<PoolService>>,
    body: std::result::Result<Json<RpcRequest>, axum::extract::rejection::JsonRejection>,
) -> Json<RpcResponse> {
    let Json(request) = match body {
        Ok(request) => request,
        Err(rejection) => {
            return Json(RpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                rejection.body_text(),
            ))
        }
    };
    debug!(method = %request.method, "RPC request");

    let id = request.id.clone();
    let response = match dispatch(&service, &request).await {
        Ok(result) => RpcResponse::success(id, result),
        Err(RpcFailure::UnknownMethod) => RpcResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("method {} not found", request.method),
        ),
        Err(RpcFailure::Call(e)) => {
            let code = match e {
                Error::InvalidParams { .. } => INVALID_PARAMS,
                _ => SERVER_ERROR,
            };
            RpcResponse::failure(id, code, e.to_string())
        }
    };
    Json(response)
}

enum RpcFailure {
    UnknownMethod,
    Call(Error),
}

impl From<Error> for RpcFailure {
    fn from(e: Error) -> Self {
        RpcFailure::Call(e)
    }
}

async fn dispatch(service: &PoolService, request: &RpcRequest) -> std::result::Result<Value, RpcFailure> {
    match request.method.as_str() {
        "eth_getWork" => {
            let package = service.get_work().await?;
            Ok(serde_json::to_value(package).map_err(Error::from)?)
        }
        "eth_submitWork" => {
            let [nonce, pow_hash, mix_digest] = string_params::<3>(&request.params)?;
            let accepted = service
                .submit_work(
                    BlockNonce::from_str(&nonce)?,
                    H256::from_str(&pow_hash)?,
                    H256::from_str(&mix_digest)?,
                )
                .await?;
            Ok(Value::Bool(accepted))
        }
        "eth_submitHashrate" => {
            let [rate, id] = string_params::<2>(&request.params)?;
            let accepted = service
                .submit_hashrate(parse_quantity(&rate)?, H256::from_str(&id)?)
                .await?;
            Ok(Value::Bool(accepted))
        }
        _ => Err(RpcFailure::UnknownMethod),
    }
}

/// Positional parameters that must all be strings
fn string_params<const N: usize>(params: &Value) -> Result<[String; N]> {
    let values = params
        .as_array()
        .ok_or_else(|| Error::invalid_params("params must be an array"))?;
    if values.len() != N {
        return Err(Error::invalid_params(format!(
            "expected {} params, got {}",
            N,
            values.len()
        )));
    }
    let strings = values
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::invalid_params("params must be strings"))
        })
        .collect::<Result<Vec<_>>>()?;
    strings
        .try_into()
        .map_err(|_| Error::invalid_params("parameter count changed"))
}

/// `0x`-prefixed hex quantity
fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| Error::invalid_params(format!("quantity {} lacks 0x prefix", s)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::invalid_params(format!("invalid quantity {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_string_params() {
        let [a, b] = string_params::<2>(&json!(["0x1", "0x2"])).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("0x1", "0x2"));
        assert_matches!(
            string_params::<2>(&json!(["0x1"])),
            Err(Error::InvalidParams { .. })
        );
        assert_matches!(
            string_params::<1>(&json!([5])),
            Err(Error::InvalidParams { .. })
        );
        assert_matches!(
            string_params::<1>(&json!({"a": 1})),
            Err(Error::InvalidParams { .. })
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x500000").unwrap(), 0x50_0000);
        assert!(parse_quantity("500000").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(RpcResponse::success(json!(1), json!(true))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": true}));
        let err = serde_json::to_value(RpcResponse::failure(json!(2), METHOD_NOT_FOUND, "nope"))
            .unwrap();
        assert_eq!(err["error"]["code"], json!(-32601));
        assert!(err.get("result").is_none());
    }
}
