//! Multiplexer domain: version bindings and persisted cutover state.

pub mod state;
pub mod versions;

pub use state::{
    read_app_version, write_app_version, BlockOutcome, MultiplexerStatus, APP_VERSION_KEY,
    MULTIPLEXER_NAMESPACE,
};
pub use versions::{VersionRange, Versions};
