// libbeep/src/device/mod.rs

//! Device session, barcode batching and observer callbacks.

pub mod assembler;
pub mod builder;
pub mod observer;
pub mod session;

pub use assembler::{AssemblyOutcome, BarcodeAssembler, BarcodeBatch};
pub use builder::DeviceSessionBuilder;
pub use observer::SessionObserver;
pub use session::{DeviceInfo, DeviceSession};
