//! Utility functions and helpers
//!
//! This module contains cryptographic utilities, canonical serialization,
//! and other helper functions used throughout the node.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest, sha256_hexdigest};
pub use serialization::{canonical_json, hash_object};
