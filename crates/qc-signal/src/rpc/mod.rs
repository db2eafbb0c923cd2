//! JSON-RPC surface of the upgrade coordinator.

pub mod handler;
pub mod types;

pub use handler::SignalRpcHandler;
pub use types::*;
