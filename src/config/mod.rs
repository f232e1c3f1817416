//! Configuration management
//!
//! This module handles basic configuration settings for a ledger node:
//! its name, the UDP port and the snapshot file location.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
