//! # Core Domain Entities
//!
//! Chain primitives shared by the upgrade control plane.
//!
//! ## Clusters
//!
//! - **Versioning**: `AppVersion`, `ConsensusVersion`
//! - **Chain**: `Height`, `BlockHeader`, `Tx`, `TxResult`
//! - **Validators**: `ValidatorAddress`, `ValidatorUpdate`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes, DeserializeFromStr, SerializeDisplay};

use crate::errors::AddressParseError;

// =============================================================================
// CLUSTER A: VERSIONING
// =============================================================================

/// Global discriminator for which state machine is active.
///
/// Starts at 1 and never decreases over the network's lifetime.
pub type AppVersion = u64;

/// A single module's own schema version, independent of [`AppVersion`].
pub type ConsensusVersion = u64;

/// Block height.
pub type Height = u64;

/// A 32-byte SHA-256 digest over committed state.
pub type AppHash = [u8; 32];

/// Raw per-module genesis payloads keyed by module name.
pub type GenesisState = BTreeMap<String, Vec<u8>>;

// =============================================================================
// CLUSTER B: VALIDATORS
// =============================================================================

/// Length of a validator operator address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte validator operator address.
///
/// Ordering is by raw bytes, which is the canonical order used for every
/// deterministic iteration over validators.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, SerializeDisplay, DeserializeFromStr,
)]
pub struct ValidatorAddress(pub [u8; ADDRESS_LEN]);

impl ValidatorAddress {
    /// Build an address from a raw store key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressParseError> {
        let raw: [u8; ADDRESS_LEN] =
            bytes.try_into().map_err(|_| AddressParseError::InvalidLength {
                expected: ADDRESS_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ValidatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ValidatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorAddress({})", self)
    }
}

impl FromStr for ValidatorAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// A change to a validator's voting power emitted by a module.
///
/// Only one module may be the authority for validator updates in a given
/// block (or at genesis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub address: ValidatorAddress,
    pub power: u64,
}

// =============================================================================
// CLUSTER C: THE CHAIN
// =============================================================================

/// The subset of an agreed block header the upgrade path consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: Height,
    /// App version the header was produced under.
    pub app_version: AppVersion,
    /// Unix timestamp (seconds).
    pub time: u64,
}

/// An already-authenticated message delivered by the transaction pipeline.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    /// Fully qualified message type, e.g. `/qc.signal.MsgSignalVersion`.
    pub type_url: String,
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
}

impl Tx {
    pub fn new(type_url: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            payload,
        }
    }
}

/// Result code returned when a transaction succeeds.
pub const CODE_OK: u32 = 0;

/// Outcome of delivering a single transaction.
///
/// A non-zero `code` means the transaction failed and left state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
    pub data: Vec<u8>,
}

impl TxResult {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            code: CODE_OK,
            log: String::new(),
            data,
        }
    }

    pub fn failed(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
            data: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}
