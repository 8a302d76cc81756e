//! Shared building blocks for the gateway crates: logging setup and the
//! small response types every binary exposes.

pub mod types;
pub mod utils;
