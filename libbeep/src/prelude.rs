// libbeep/src/prelude.rs

//! Common imports for applications driving a device and a payment backend.

pub use crate::config::{Environment, PaymentConfig, SessionConfig};
pub use crate::device::{DeviceSession, DeviceSessionBuilder, SessionObserver};
pub use crate::logging::{LogConfig, Logger};
pub use crate::nfc::{MifareClassicChannel, MifareObserver, NfcCardDetector};
pub use crate::payment::{
    PaymentClient, PaymentObserver, PaymentRequest, PaymentResult, PaymentStatus, RefundRequest,
    RefundResult, RefundTarget, StatusQuery, StatusResult,
};
pub use crate::transport::{DeviceTransport, MifareTransport, PaymentTransport, TransportEvent};
pub use crate::{
    Barcode, BarcodeType, CardInfo, CardType, DetectionError, DetectionEvent, DeviceState, Error,
    MfcBlockData, MfcKey, MfcKeyType, MfcOperationError, PaymentError, PaymentMetadata,
    PaymentToken, Result,
};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex_spaced, parse_hex};
