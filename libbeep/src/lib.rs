// libbeep/src/lib.rs

//! libbeep
//!
//! Session, NFC and payment core for Bluetooth point-of-sale beacons that
//! exchange loyalty barcodes and payment tokens with a paired phone.

#![warn(missing_docs)]

pub mod config;
pub mod console;
pub mod constants;
pub mod device;
pub mod error;
pub mod logging;
pub mod nfc;
pub mod payment;
pub mod prelude;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

// Errors and value types live at the crate root; the prelude adds the
// session, NFC and payment entry points.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
