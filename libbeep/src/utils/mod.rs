//! Utilities for libbeep: small, reusable helpers used across the crate.
//!
//! Hex helpers for key/block display and parsing, and firmware version
//! comparison used by session detection.

pub mod hex;
pub mod version;

pub use hex::*;
pub use version::*;
