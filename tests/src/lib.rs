//! # Quantum-Chain Test Suite
//!
//! Cross-crate scenarios for the upgrade path: module registry, signalling
//! and the multiplexer driven together the way a node drives them.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs      # Test chain: validator + ledger modules, replica builder
//!     ├── upgrade_flow.rs  # Quorum signalling through cutover
//!     ├── determinism.rs   # Independent replicas agree on every app hash
//!     └── restart.rs       # Resume from a committed snapshot
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::upgrade_flow::
//! ```

pub mod integration;
