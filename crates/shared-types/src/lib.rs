//! # Shared Types Crate
//!
//! Chain primitives and the replicated key-value state consumed by every
//! upgrade-path subsystem (module registry, upgrade signalling, multiplexer).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cross-subsystem types are defined here.
//! - **One namespace per module**: Every module owns exactly one key-value
//!   namespace inside the [`StateStore`].
//! - **Snapshot isolation**: Readers only ever observe a committed
//!   [`StateSnapshot`]; in-block writes are invisible until `commit`.

pub mod entities;
pub mod errors;
pub mod store;

pub use entities::*;
pub use errors::*;
pub use store::{
    decode_u64, encode_u64, ExecContext, KvRead, KvStore, NamespaceMut, NamespaceView,
    SnapshotReader, StateCheckpoint, StateSnapshot, StateStore,
};
