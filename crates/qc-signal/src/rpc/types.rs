//! JSON-RPC wire types for the signalling methods.

use serde::{Deserialize, Serialize};
use shared_types::{AppVersion, TxResult, ValidatorAddress};

use crate::domain::PendingUpgrade;

/// JSON-RPC 2.0 error codes used by the signalling endpoint
pub mod codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const SERVER_ERROR: i32 = -32000;
    pub const TRANSACTION_REJECTED: i32 = -32003;
}

pub const METHOD_VERSION_TALLY: &str = "signal_versionTally";
pub const METHOD_PENDING_UPGRADE: &str = "signal_pendingUpgrade";
pub const METHOD_SIGNAL_VERSION: &str = "signal_signalVersion";
pub const METHOD_TRY_UPGRADE: &str = "signal_tryUpgrade";

/// JSON-RPC request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest<T> {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: T,
    pub id: u64,
}

impl<T> JsonRpcRequest<T> {
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl<T> JsonRpcResponse<T> {
    pub fn success(id: u64, result: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC Error {}: {}", self.code, self.message)
    }
}

/// Params of `signal_versionTally`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTallyParams {
    pub version: AppVersion,
}

/// Result of `signal_pendingUpgrade` and `signal_tryUpgrade`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PendingUpgradeResponse {
    #[serde(default)]
    pub upgrade: Option<PendingUpgrade>,
}

/// Params of `signal_signalVersion`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVersionParams {
    pub validator: ValidatorAddress,
    pub version: AppVersion,
}

/// Params of `signal_tryUpgrade`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryUpgradeParams {
    pub signer: ValidatorAddress,
}

/// Outcome of a submitted signalling transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub code: u32,
    #[serde(default)]
    pub log: String,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == shared_types::CODE_OK
    }
}

impl From<TxResult> for TxResponse {
    fn from(result: TxResult) -> Self {
        Self {
            code: result.code,
            log: result.log,
        }
    }
}
