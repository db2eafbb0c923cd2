//! JSON-RPC client for the `signal_*` methods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qc_signal::rpc::{
    JsonRpcRequest, JsonRpcResponse, PendingUpgradeResponse, SignalVersionParams,
    TryUpgradeParams, TxResponse, VersionTallyParams, METHOD_PENDING_UPGRADE,
    METHOD_SIGNAL_VERSION, METHOD_TRY_UPGRADE, METHOD_VERSION_TALLY,
};
use qc_signal::{PendingUpgrade, VersionTally};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{AppVersion, ValidatorAddress};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when talking to a node.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON-RPC error: {0}")]
    Rpc(String),
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Upgrade operations a node exposes.
#[async_trait]
pub trait UpgradeApi: Send + Sync {
    async fn version_tally(&self, version: AppVersion) -> Result<VersionTally, ApiError>;

    async fn pending_upgrade(&self) -> Result<Option<PendingUpgrade>, ApiError>;

    async fn signal_version(
        &self,
        validator: ValidatorAddress,
        version: AppVersion,
    ) -> Result<TxResponse, ApiError>;

    async fn try_upgrade(&self, signer: ValidatorAddress) -> Result<TxResponse, ApiError>;
}

/// Upgrade API client.
pub struct UpgradeApiClient {
    client: Client,
    base_url: String,
    request_id: AtomicU64,
}

impl UpgradeApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, ApiError> {
        let request = JsonRpcRequest::new(method, params, self.next_id());
        debug!(method, id = request.id, "Sending JSON-RPC request");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ApiError::Connection(format!("Cannot connect to {}", self.base_url))
                } else {
                    ApiError::Http(e)
                }
            })?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        unwrap_response(rpc_response)
    }
}

fn unwrap_response<R>(response: JsonRpcResponse<R>) -> Result<R, ApiError> {
    if let Some(error) = response.error {
        return Err(ApiError::Rpc(error.to_string()));
    }
    response
        .result
        .ok_or_else(|| ApiError::Parse("Missing result in response".to_string()))
}

#[async_trait]
impl UpgradeApi for UpgradeApiClient {
    async fn version_tally(&self, version: AppVersion) -> Result<VersionTally, ApiError> {
        self.call(METHOD_VERSION_TALLY, VersionTallyParams { version })
            .await
    }

    async fn pending_upgrade(&self) -> Result<Option<PendingUpgrade>, ApiError> {
        let response: PendingUpgradeResponse = self.call(METHOD_PENDING_UPGRADE, ()).await?;
        Ok(response.upgrade)
    }

    async fn signal_version(
        &self,
        validator: ValidatorAddress,
        version: AppVersion,
    ) -> Result<TxResponse, ApiError> {
        self.call(
            METHOD_SIGNAL_VERSION,
            SignalVersionParams { validator, version },
        )
        .await
    }

    async fn try_upgrade(&self, signer: ValidatorAddress) -> Result<TxResponse, ApiError> {
        self.call(METHOD_TRY_UPGRADE, TryUpgradeParams { signer })
            .await
    }
}
