//! API client module for the node's `signal_*` JSON-RPC methods.

mod client;

pub use client::{ApiError, UpgradeApi, UpgradeApiClient};
