// libbeep/src/constants.rs
//! Common protocol constants used across the crate

/// Size of a Mifare Classic data block in bytes
pub const MFC_BLOCK_SIZE: usize = 16;

/// Size of a Mifare Classic sector key in bytes
pub const MFC_KEY_SIZE: usize = 6;

/// Number of addressable blocks (block numbers are `0..256`)
pub const MFC_BLOCK_COUNT: usize = 256;

/// Largest barcode batch a device may announce
pub const MAX_BARCODE_BATCH: usize = 64;

/// Oldest device firmware the session accepts
pub const DEFAULT_MIN_FIRMWARE_VERSION: &str = "1.0.4-beta";

/// Default `log` target for session/NFC/payment components
pub const DEFAULT_LOG_TARGET: &str = "libbeep";
