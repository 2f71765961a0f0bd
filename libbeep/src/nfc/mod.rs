// libbeep/src/nfc/mod.rs

//! NFC card presence tracking and Mifare Classic block access.

pub mod detector;
pub mod mifare;

pub use detector::NfcCardDetector;
pub use mifare::{MfcReadResult, MfcWriteResult, MifareClassicChannel, MifareObserver};
