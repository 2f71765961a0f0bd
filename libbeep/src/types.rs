// libbeep/src/types.rs

//! Value types shared by the session, NFC and payment layers.

use std::collections::BTreeMap;

use derive_more::Display;
use thiserror::Error;

use crate::constants::{MFC_BLOCK_COUNT, MFC_BLOCK_SIZE, MFC_KEY_SIZE};
use crate::{Result, ValidationError};

/// Lifecycle state of the device as last reported (or expected) by a
/// `DeviceSession`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    /// No usable device.
    #[default]
    Invalid,
    /// A device was found but its firmware is too old.
    FirmwareVersionNotSupported,
    /// A session with the phone is open.
    SessionOpened,
    /// Device ready, no session open.
    SessionClosed,
    /// Barcodes requested from the phone.
    WaitingForBarcodes,
    /// Payment token requested from the phone.
    WaitingForPaymentToken,
    /// Device-side payment in progress.
    WaitingForPaymentResult,
    /// Payment succeeded and awaits confirmation.
    WaitingForConfirmation,
}

impl DeviceState {
    /// Map a wire code to a state. Unknown codes collapse to `Invalid`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::FirmwareVersionNotSupported,
            2 => Self::SessionOpened,
            3 => Self::SessionClosed,
            4 => Self::WaitingForBarcodes,
            5 => Self::WaitingForPaymentResult,
            6 => Self::WaitingForConfirmation,
            7 => Self::WaitingForPaymentToken,
            _ => Self::Invalid,
        }
    }

    /// Wire code of this state.
    pub fn code(&self) -> i32 {
        match self {
            Self::Invalid => 0,
            Self::FirmwareVersionNotSupported => 1,
            Self::SessionOpened => 2,
            Self::SessionClosed => 3,
            Self::WaitingForBarcodes => 4,
            Self::WaitingForPaymentResult => 5,
            Self::WaitingForConfirmation => 6,
            Self::WaitingForPaymentToken => 7,
        }
    }

    /// True once a device has been detected and initialized.
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Invalid | Self::FirmwareVersionNotSupported)
    }
}

/// Barcode symbology reported by the device. Variants are named after the
/// symbologies in the device's wire code table.
#[allow(missing_docs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeType {
    Unknown,
    Upca,
    Upce,
    EanJan8,
    EanJan13,
    Tf,
    Itf,
    Codabar,
    Code39,
    Code93,
    Code128,
    Upcas,
    Upces,
    Upcd1,
    Upcd2,
    Upcd4,
    Upcd5,
    Ean8S,
    Ean13S,
    Ean128,
    Ocra,
    Ocrb,
    Code128Parsed,
    Gs1DataBar,
    Rss14,
    Gs1DataBarExpanded,
    RssExpanded,
    Gs1DataBarStackedOmnidirectional,
    Gs1DataBarExpandedStacked,
    Cca,
    Ccb,
    Ccc,
    Pdf417,
    Maxicode,
    DataMatrix,
    QrCode,
    MicroQrCode,
    Aztec,
    MicroPdf417,
    Other,
}

/// Wire code table for barcode symbologies. Code 15 is deliberately absent.
pub const BARCODE_TYPE_TABLE: [(i32, BarcodeType); 40] = [
    (0, BarcodeType::Unknown),
    (1, BarcodeType::Upca),
    (2, BarcodeType::Upce),
    (3, BarcodeType::EanJan8),
    (4, BarcodeType::EanJan13),
    (5, BarcodeType::Tf),
    (6, BarcodeType::Itf),
    (7, BarcodeType::Codabar),
    (8, BarcodeType::Code39),
    (9, BarcodeType::Code93),
    (10, BarcodeType::Code128),
    (11, BarcodeType::Upcas),
    (12, BarcodeType::Upces),
    (13, BarcodeType::Upcd1),
    (14, BarcodeType::Upcd2),
    (16, BarcodeType::Upcd4),
    (17, BarcodeType::Upcd5),
    (18, BarcodeType::Ean8S),
    (19, BarcodeType::Ean13S),
    (20, BarcodeType::Ean128),
    (21, BarcodeType::Ocra),
    (22, BarcodeType::Ocrb),
    (23, BarcodeType::Code128Parsed),
    (24, BarcodeType::Gs1DataBar),
    (25, BarcodeType::Rss14),
    (26, BarcodeType::Gs1DataBarExpanded),
    (27, BarcodeType::RssExpanded),
    (28, BarcodeType::Gs1DataBarStackedOmnidirectional),
    (29, BarcodeType::Gs1DataBarExpandedStacked),
    (30, BarcodeType::Cca),
    (31, BarcodeType::Ccb),
    (32, BarcodeType::Ccc),
    (33, BarcodeType::Pdf417),
    (34, BarcodeType::Maxicode),
    (35, BarcodeType::DataMatrix),
    (36, BarcodeType::QrCode),
    (37, BarcodeType::MicroQrCode),
    (38, BarcodeType::Aztec),
    (39, BarcodeType::MicroPdf417),
    (40, BarcodeType::Other),
];

impl BarcodeType {
    /// Resolve a wire code. Codes missing from the table yield `Unknown`.
    pub fn from_code(code: i32) -> Self {
        BARCODE_TYPE_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, t)| *t)
            .unwrap_or(BarcodeType::Unknown)
    }

    /// Wire code; `0` for `Unknown`.
    pub fn code(&self) -> i32 {
        BARCODE_TYPE_TABLE
            .iter()
            .find(|(_, t)| t == self)
            .map(|(c, _)| *c)
            .unwrap_or(0)
    }
}

impl Default for BarcodeType {
    fn default() -> Self {
        BarcodeType::Unknown
    }
}

/// A single scanned barcode.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode {
    /// Decoded content.
    pub value: String,
    /// Symbology.
    pub barcode_type: BarcodeType,
}

impl Barcode {
    /// Barcode of a known symbology.
    pub fn new(value: impl Into<String>, barcode_type: BarcodeType) -> Self {
        Self {
            value: value.into(),
            barcode_type,
        }
    }

    /// Build a barcode from its raw wire representation.
    pub fn from_wire(value: impl Into<String>, code: i32) -> Self {
        Self::new(value, BarcodeType::from_code(code))
    }
}

/// Payment metadata for split ("partial") payments. Keys are kept sorted so
/// the map iterates deterministically.
pub type PaymentMetadata = BTreeMap<String, String>;

/// Charge parameters sent to the device when asking the phone for a
/// payment token or a device-side payment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChargeRequest {
    /// Amount in the smallest currency unit.
    pub amount_in_coins: u64,
    /// Merchant transaction id.
    pub transaction_id: String,
    /// Cashier, may be empty.
    pub cashier_id: String,
    /// Split payment metadata.
    pub metadata: PaymentMetadata,
}

impl ChargeRequest {
    /// Charge without cashier or metadata.
    pub fn new(amount_in_coins: u64, transaction_id: impl Into<String>) -> Self {
        Self {
            amount_in_coins,
            transaction_id: transaction_id.into(),
            cashier_id: String::new(),
            metadata: PaymentMetadata::new(),
        }
    }

    /// Set the cashier.
    pub fn with_cashier_id(mut self, cashier_id: impl Into<String>) -> Self {
        self.cashier_id = cashier_id.into();
        self
    }

    /// Set split payment metadata.
    pub fn with_metadata(mut self, metadata: PaymentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// A charge carrying metadata is settled through the partial flow.
    pub fn is_partial(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Reject a zero amount or an empty transaction id.
    pub fn validate(&self) -> Result<()> {
        if self.amount_in_coins == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        if self.transaction_id.is_empty() {
            return Err(ValidationError::EmptyField("transaction_id").into());
        }
        Ok(())
    }
}

/// Payment token produced by the phone, together with the charge it was
/// requested for.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentToken {
    /// Opaque token for the backend.
    pub token: String,
    /// Charge the token was requested for.
    pub charge: ChargeRequest,
}

/// Payment failure reported by the device for the device-side payment flow.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentError {
    /// No network on the phone.
    Network,
    /// The backend did not answer in time.
    Timeout,
    /// The backend refused the payment.
    Server,
    /// The phone failed a security check.
    Security,
    /// The withdrawal was declined.
    Withdrawal,
    /// The customer discarded the payment.
    Discarded,
    /// Unmapped failure code.
    Unknown,
    /// Wrong PIN entered.
    InvalidPin,
}

impl PaymentError {
    /// Map a wire code. Unmapped codes are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Network,
            1 => Self::Timeout,
            2 => Self::Server,
            3 => Self::Security,
            4 => Self::Withdrawal,
            5 => Self::Discarded,
            7 => Self::InvalidPin,
            _ => Self::Unknown,
        }
    }
}

/// NFC card classification.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardType {
    /// Unrecognized card.
    #[default]
    Unknown,
    /// EMV bank card.
    EmvCard,
    /// Mifare Classic 1K.
    MifareClassic1k,
    /// Mifare Classic 4K.
    MifareClassic4k,
    /// Mifare Plus 2K.
    MifarePlus2k,
    /// Mifare Plus 4K.
    MifarePlus4k,
    /// Mifare DESFire 2K.
    MifareDesfire2k,
    /// Mifare DESFire 4K.
    MifareDesfire4k,
    /// Mifare DESFire 8K.
    MifareDesfire8k,
}

impl CardType {
    /// Map a wire code. Unmapped codes are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::EmvCard,
            2 => Self::MifareClassic1k,
            3 => Self::MifareClassic4k,
            4 => Self::MifarePlus2k,
            5 => Self::MifarePlus4k,
            6 => Self::MifareDesfire2k,
            7 => Self::MifareDesfire4k,
            8 => Self::MifareDesfire8k,
            _ => Self::Unknown,
        }
    }

    /// Mifare Classic 1K or 4K.
    pub fn is_mifare_classic(&self) -> bool {
        matches!(self, Self::MifareClassic1k | Self::MifareClassic4k)
    }
}

/// Detected card. `meta` is the PAN for EMV cards, the UID/NUID otherwise.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardInfo {
    /// Classification.
    pub card_type: CardType,
    /// PAN or UID.
    pub meta: String,
}

impl CardInfo {
    /// Card of `card_type` identified by `meta`.
    pub fn new(card_type: CardType, meta: impl Into<String>) -> Self {
        Self {
            card_type,
            meta: meta.into(),
        }
    }
}

/// Change in NFC field presence.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionEvent {
    /// A card entered the field.
    Detected {
        /// The card that appeared.
        card_info: CardInfo,
    },
    /// The card left the field.
    Removed,
}

/// Classification failure. Never affects card presence tracking.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionError {
    /// Unmapped failure code.
    Unknown,
    /// More than one card in the field.
    MultipleCards,
    /// The card type is not supported.
    Unsupported,
}

impl DetectionError {
    /// Map a wire code. Unmapped codes are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::MultipleCards,
            2 => Self::Unsupported,
            _ => Self::Unknown,
        }
    }
}

/// Mifare Classic sector key type.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MfcKeyType {
    /// No key; rejected by block operations.
    None = 0,
    /// Sector key A.
    KeyA = 1,
    /// Sector key B.
    KeyB = 2,
}

/// Mifare Classic sector key (6 バイト)
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MfcKey {
    key_type: MfcKeyType,
    value: [u8; MFC_KEY_SIZE],
}

impl MfcKey {
    /// Key from exactly six bytes.
    pub fn new(key_type: MfcKeyType, value: &[u8]) -> Result<Self> {
        if value.len() != MFC_KEY_SIZE {
            return Err(ValidationError::InvalidSize {
                expected: MFC_KEY_SIZE,
                actual: value.len(),
            }
            .into());
        }
        let mut arr = [0u8; MFC_KEY_SIZE];
        arr.copy_from_slice(value);
        Ok(Self {
            key_type,
            value: arr,
        })
    }

    /// Transport key shipped on blank cards (`FF FF FF FF FF FF`).
    pub fn factory_default(key_type: MfcKeyType) -> Self {
        Self {
            key_type,
            value: [0xFF; MFC_KEY_SIZE],
        }
    }

    /// Which sector key this is.
    pub fn key_type(&self) -> MfcKeyType {
        self.key_type
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; MFC_KEY_SIZE] {
        &self.value
    }
}

/// Mifare Classic block content (16 バイト)
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MfcBlockData {
    block_no: u8,
    value: [u8; MFC_BLOCK_SIZE],
}

impl MfcBlockData {
    /// Validates the block number first, then the content length.
    pub fn new(block_no: i32, value: &[u8]) -> Result<Self> {
        let block_no = Self::check_block_no(block_no)?;
        if value.len() != MFC_BLOCK_SIZE {
            return Err(ValidationError::InvalidSize {
                expected: MFC_BLOCK_SIZE,
                actual: value.len(),
            }
            .into());
        }
        let mut arr = [0u8; MFC_BLOCK_SIZE];
        arr.copy_from_slice(value);
        Ok(Self {
            block_no,
            value: arr,
        })
    }

    /// A zero-filled block.
    pub fn empty(block_no: i32) -> Result<Self> {
        Self::new(block_no, &[0u8; MFC_BLOCK_SIZE])
    }

    fn check_block_no(block_no: i32) -> Result<u8> {
        if block_no < 0 || block_no as usize >= MFC_BLOCK_COUNT {
            return Err(ValidationError::OutOfRange {
                value: block_no as i64,
                min: 0,
                max: MFC_BLOCK_COUNT as i64,
            }
            .into());
        }
        Ok(block_no as u8)
    }

    /// Block number on the card.
    pub fn block_no(&self) -> u8 {
        self.block_no
    }

    /// Raw block bytes.
    pub fn as_bytes(&self) -> &[u8; MFC_BLOCK_SIZE] {
        &self.value
    }

    /// Space separated hex dump.
    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex_spaced(self.as_bytes())
    }

    /// Printable ASCII with `.` for everything else.
    pub fn to_ascii_safe(&self) -> String {
        self.value
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

/// Closed taxonomy of Mifare Classic block operation failures.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MfcOperationError {
    /// Unmapped status code.
    #[error("Mifare unknown error")]
    Unknown,
    /// Authentication with the sector key failed.
    #[error("Invalid Mifare sector key")]
    AuthError,
    /// The card left the field mid-operation.
    #[error("Card removed before operation completed")]
    CardRemoved,
    /// The card in the field is not Mifare Classic.
    #[error("Card type is not Mifare Classic")]
    UnsupportedCardType,
    /// The block did not hold 16 bytes.
    #[error("Invalid content data size")]
    DataSize,
    /// The reader dropped the request.
    #[error("IO command interrupted")]
    Interrupted,
    /// The key is unusable, e.g. typed `None`.
    #[error("Invalid key format")]
    KeyParamInvalid,
    /// The reader rejected the block number.
    #[error("Block number is out of bounds")]
    ParamsInvalid,
}

impl MfcOperationError {
    /// Map a wire status code. Anything unmapped is `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::CardRemoved,
            2 => Self::UnsupportedCardType,
            3 => Self::AuthError,
            4 => Self::Interrupted,
            5 => Self::KeyParamInvalid,
            6 => Self::ParamsInvalid,
            7 => Self::DataSize,
            _ => Self::Unknown,
        }
    }

    /// Map a textual status name such as `"AUTH_ERROR"`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "CARD_REMOVED" => Self::CardRemoved,
            "UNSUPPORTED_CARD_TYPE" => Self::UnsupportedCardType,
            "AUTH_ERROR" => Self::AuthError,
            "INTERRUPTED" => Self::Interrupted,
            "KEY_PARAM_INVALID" => Self::KeyParamInvalid,
            "PARAMS_INVALID" => Self::ParamsInvalid,
            "DATA_SIZE" => Self::DataSize,
            _ => Self::Unknown,
        }
    }

    /// Wire name, e.g. `AUTH_ERROR`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::CardRemoved => "CARD_REMOVED",
            Self::UnsupportedCardType => "UNSUPPORTED_CARD_TYPE",
            Self::AuthError => "AUTH_ERROR",
            Self::Interrupted => "INTERRUPTED",
            Self::KeyParamInvalid => "KEY_PARAM_INVALID",
            Self::ParamsInvalid => "PARAMS_INVALID",
            Self::DataSize => "DATA_SIZE",
        }
    }
}
