//! Dispatches `signal_*` JSON-RPC methods.
//!
//! Queries read the last committed snapshot. Write methods build the
//! signalling transaction and hand it to the node's transaction pipeline;
//! nothing here touches working state directly.
//!
//! There is no transport here. Hosts wire [`SignalRpcHandler::handle`] into
//! their own HTTP server.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_types::{SnapshotReader, Tx};
use tracing::{debug, warn};

use crate::domain::{MsgSignalVersion, MsgTryUpgrade, SignalMsg, SIGNAL_NAMESPACE};
use crate::ports::{TxSubmitter, UpgradeSignalApi, ValidatorSetProvider};
use crate::rpc::types::{
    codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PendingUpgradeResponse,
    SignalVersionParams, TryUpgradeParams, TxResponse, VersionTallyParams, METHOD_PENDING_UPGRADE,
    METHOD_SIGNAL_VERSION, METHOD_TRY_UPGRADE, METHOD_VERSION_TALLY,
};
use crate::service::UpgradeCoordinator;

pub struct SignalRpcHandler<V: ValidatorSetProvider, S: TxSubmitter> {
    coordinator: Arc<UpgradeCoordinator<V>>,
    snapshots: SnapshotReader,
    submitter: Arc<S>,
}

fn invalid_params(e: serde_json::Error) -> JsonRpcError {
    JsonRpcError::new(codes::INVALID_PARAMS, format!("Invalid params: {e}"))
}

fn server_error(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(codes::SERVER_ERROR, e.to_string())
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    // single-element positional params are accepted as well
    let params = match params {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };
    serde_json::from_value(params).map_err(invalid_params)
}

fn to_value<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(server_error)
}

impl<V: ValidatorSetProvider, S: TxSubmitter> SignalRpcHandler<V, S> {
    pub fn new(
        coordinator: Arc<UpgradeCoordinator<V>>,
        snapshots: SnapshotReader,
        submitter: Arc<S>,
    ) -> Self {
        Self {
            coordinator,
            snapshots,
            submitter,
        }
    }

    pub fn handle(&self, request: JsonRpcRequest<Value>) -> JsonRpcResponse<Value> {
        let id = request.id;
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::new(codes::INVALID_REQUEST, "Invalid request: jsonrpc must be 2.0"),
            );
        }
        debug!(method = %request.method, id, "Signal RPC request");
        match self.dispatch(&request.method, request.params) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(method = %request.method, code = error.code, "Signal RPC failed");
                JsonRpcResponse::failure(id, error)
            }
        }
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            METHOD_VERSION_TALLY => {
                let params: VersionTallyParams = parse(params)?;
                let snapshot = self.snapshots.latest();
                let tally = self
                    .coordinator
                    .version_tally(&snapshot.namespace(SIGNAL_NAMESPACE), params.version)
                    .map_err(server_error)?;
                to_value(tally)
            }
            METHOD_PENDING_UPGRADE => {
                let snapshot = self.snapshots.latest();
                let upgrade = self
                    .coordinator
                    .pending_upgrade(&snapshot.namespace(SIGNAL_NAMESPACE))
                    .map_err(server_error)?;
                to_value(PendingUpgradeResponse { upgrade })
            }
            METHOD_SIGNAL_VERSION => {
                let params: SignalVersionParams = parse(params)?;
                self.submit(SignalMsg::SignalVersion(MsgSignalVersion {
                    validator: params.validator,
                    version: params.version,
                }))
            }
            METHOD_TRY_UPGRADE => {
                let params: TryUpgradeParams = parse(params)?;
                self.submit(SignalMsg::TryUpgrade(MsgTryUpgrade {
                    signer: params.signer,
                }))
            }
            other => Err(JsonRpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn submit(&self, msg: SignalMsg) -> Result<Value, JsonRpcError> {
        let tx: Tx = msg.to_tx().map_err(invalid_tx)?;
        let result = self.submitter.submit(tx).map_err(|reason| {
            warn!(%reason, type_url = msg.type_url(), "Transaction submission failed");
            JsonRpcError::new(codes::TRANSACTION_REJECTED, reason)
        })?;
        to_value(TxResponse::from(result))
    }
}

fn invalid_tx(e: crate::error::SignalError) -> JsonRpcError {
    JsonRpcError::new(codes::INVALID_PARAMS, e.to_string())
}
