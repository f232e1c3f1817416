//! Data persistence
//!
//! This module handles the on-disk ledger snapshot consumed and produced
//! at the node boundary.

pub mod snapshot;

pub use snapshot::Snapshot;
