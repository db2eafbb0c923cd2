//! Signalling transactions and their wire encoding.

use serde::{Deserialize, Serialize};
use shared_types::{AppVersion, Tx, ValidatorAddress};

use crate::error::{SignalError, SignalResult};

pub const MSG_SIGNAL_VERSION: &str = "/qc.signal.MsgSignalVersion";
pub const MSG_TRY_UPGRADE: &str = "/qc.signal.MsgTryUpgrade";

/// A validator's vote for the version it is ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSignalVersion {
    pub validator: ValidatorAddress,
    pub version: AppVersion,
}

/// Ask the chain to tally signals and schedule an upgrade on quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTryUpgrade {
    pub signer: ValidatorAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMsg {
    SignalVersion(MsgSignalVersion),
    TryUpgrade(MsgTryUpgrade),
}

impl SignalMsg {
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::SignalVersion(_) => MSG_SIGNAL_VERSION,
            Self::TryUpgrade(_) => MSG_TRY_UPGRADE,
        }
    }

    pub fn to_tx(&self) -> SignalResult<Tx> {
        let payload = match self {
            Self::SignalVersion(msg) => bincode::serialize(msg),
            Self::TryUpgrade(msg) => bincode::serialize(msg),
        }
        .map_err(|e| SignalError::InvalidMessage(e.to_string()))?;
        Ok(Tx::new(self.type_url(), payload))
    }

    pub fn decode(type_url: &str, payload: &[u8]) -> SignalResult<Self> {
        let invalid = |e: bincode::Error| SignalError::InvalidMessage(e.to_string());
        match type_url {
            MSG_SIGNAL_VERSION => Ok(Self::SignalVersion(
                bincode::deserialize(payload).map_err(invalid)?,
            )),
            MSG_TRY_UPGRADE => Ok(Self::TryUpgrade(
                bincode::deserialize(payload).map_err(invalid)?,
            )),
            other => Err(SignalError::InvalidMessage(format!(
                "unknown message type {other}"
            ))),
        }
    }
}
