// libbeep/src/payment/request.rs

//! Payment and refund requests, backend responses and their results.

use derive_more::Display;

use crate::types::{PaymentMetadata, PaymentToken};
use crate::{Result, ValidationError};

/// Backend payment request.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Merchant-unique transaction id.
    pub transaction_id: String,
    /// Token obtained from the phone.
    pub payment_token: String,
    /// Charge in the smallest currency unit.
    pub amount_in_coins: u64,
    /// Optional cashier reference; empty when not set.
    pub cashier_id: String,
    /// Non-empty metadata selects the partial payment flow.
    pub metadata: PaymentMetadata,
    /// Device the token was obtained through.
    pub device_id: u64,
}

impl PaymentRequest {
    /// Request without cashier id or metadata.
    pub fn new(
        payment_token: impl Into<String>,
        amount_in_coins: u64,
        transaction_id: impl Into<String>,
        device_id: u64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            payment_token: payment_token.into(),
            amount_in_coins,
            cashier_id: String::new(),
            metadata: PaymentMetadata::new(),
            device_id,
        }
    }

    /// Build a request from a token received through a device session. The
    /// token carries the charge it was requested for.
    pub fn from_token(token: &PaymentToken, device_id: u64) -> Self {
        Self {
            transaction_id: token.charge.transaction_id.clone(),
            payment_token: token.token.clone(),
            amount_in_coins: token.charge.amount_in_coins,
            cashier_id: token.charge.cashier_id.clone(),
            metadata: token.charge.metadata.clone(),
            device_id,
        }
    }

    /// Set the cashier id.
    pub fn with_cashier_id(mut self, cashier_id: impl Into<String>) -> Self {
        self.cashier_id = cashier_id.into();
        self
    }

    /// Set the metadata; non-empty metadata makes this a partial payment.
    pub fn with_metadata(mut self, metadata: PaymentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// True when the request goes through the partial payment flow.
    pub fn is_partial(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Reject empty ids, an empty token and a zero amount.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.is_empty() {
            return Err(ValidationError::EmptyField("transaction_id").into());
        }
        if self.payment_token.is_empty() {
            return Err(ValidationError::EmptyField("payment_token").into());
        }
        if self.amount_in_coins == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        Ok(())
    }
}

/// Backend operation a payment request is sent through.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentOperation {
    /// Whole amount to one merchant.
    Simple,
    /// Amount split according to the metadata.
    Partial,
}

impl PaymentOperation {
    /// Depends on nothing but whether the metadata is empty.
    pub fn for_request(request: &PaymentRequest) -> Self {
        if request.metadata.is_empty() {
            PaymentOperation::Simple
        } else {
            PaymentOperation::Partial
        }
    }
}

/// What a refund refers to. Must match the flow the payment went through:
/// simple payments are refunded by backend transaction id, partial ones by
/// payment request uid.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefundTarget {
    /// Backend transaction id of a simple payment.
    BackendTransaction(u64),
    /// Payment request uid of a partial payment.
    PaymentRequestUid(String),
}

/// Backend refund request.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    /// Payment being refunded.
    pub target: RefundTarget,
    /// Amount to give back.
    pub amount_in_coins: u64,
    /// Device the refund is made for.
    pub device_id: u64,
}

impl RefundRequest {
    /// Refund of `amount_in_coins` against `target`.
    pub fn new(target: RefundTarget, amount_in_coins: u64, device_id: u64) -> Self {
        Self {
            target,
            amount_in_coins,
            device_id,
        }
    }

    /// Refund of a simple payment.
    pub fn by_transaction(backend_transaction_id: u64, amount_in_coins: u64, device_id: u64) -> Self {
        Self::new(
            RefundTarget::BackendTransaction(backend_transaction_id),
            amount_in_coins,
            device_id,
        )
    }

    /// Refund of a partial payment.
    pub fn by_uid(payment_request_uid: impl Into<String>, amount_in_coins: u64, device_id: u64) -> Self {
        Self::new(
            RefundTarget::PaymentRequestUid(payment_request_uid.into()),
            amount_in_coins,
            device_id,
        )
    }

    /// Reject an empty uid and a zero amount.
    pub fn validate(&self) -> Result<()> {
        if let RefundTarget::PaymentRequestUid(uid) = &self.target {
            if uid.is_empty() {
                return Err(ValidationError::EmptyField("payment_request_uid").into());
            }
        }
        if self.amount_in_coins == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        Ok(())
    }
}

/// Lookup of a payment by the merchant's own transaction id.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    /// Merchant transaction id the payment was made under.
    pub transaction_id: String,
    /// Amount of that payment.
    pub amount_in_coins: u64,
    /// Device the payment was made through.
    pub device_id: u64,
}

impl StatusQuery {
    /// Query for the payment `transaction_id` of `amount_in_coins`.
    pub fn new(transaction_id: impl Into<String>, amount_in_coins: u64, device_id: u64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount_in_coins,
            device_id,
        }
    }

    /// Reject an empty transaction id and a zero amount.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.is_empty() {
            return Err(ValidationError::EmptyField("transaction_id").into());
        }
        if self.amount_in_coins == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        Ok(())
    }
}

/// Processing status the backend keeps for a payment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaymentStatus {
    /// Unknown or not reported.
    #[default]
    None,
    /// Registered, not yet processed.
    Inserted,
    /// Paid.
    Accepted,
    /// Refused by the bank or the customer.
    Declined,
    /// Withdrawn before completion.
    Deleted,
    /// Being processed.
    InProcess,
    /// Funds held, awaiting capture.
    Hold,
    /// Created, waiting for the customer.
    Created,
}

impl PaymentStatus {
    const TABLE: [PaymentStatus; 8] = [
        PaymentStatus::None,
        PaymentStatus::Inserted,
        PaymentStatus::Accepted,
        PaymentStatus::Declined,
        PaymentStatus::Deleted,
        PaymentStatus::InProcess,
        PaymentStatus::Hold,
        PaymentStatus::Created,
    ];

    /// Unknown codes map to [`PaymentStatus::None`].
    pub fn from_code(code: i32) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::TABLE.get(i).copied())
            .unwrap_or(PaymentStatus::None)
    }

    /// Integer code, `0..8`.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parse the backend's status name; unknown names map to `None`.
    pub fn from_name(name: &str) -> Self {
        Self::TABLE
            .iter()
            .copied()
            .find(|s| s.to_string() == name)
            .unwrap_or(PaymentStatus::None)
    }
}

/// Raw backend answer. The presence of `error` alone decides failure.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendResponse {
    /// Backend error text; `Some` means the request failed.
    pub error: Option<String>,
    /// Backend transaction id.
    pub transaction_id: u64,
    /// Set by partial payments.
    pub payment_request_uid: Option<String>,
    /// Processing status, when the backend reports one.
    pub status: PaymentStatus,
}

impl BackendResponse {
    /// Successful answer carrying `transaction_id`.
    pub fn ok(transaction_id: u64) -> Self {
        Self {
            transaction_id,
            ..Self::default()
        }
    }

    /// Failed answer carrying the backend's message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attach the uid a partial payment is refunded by.
    pub fn with_payment_request_uid(mut self, uid: impl Into<String>) -> Self {
        self.payment_request_uid = Some(uid.into());
        self
    }

    /// Attach a processing status.
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }
}

/// Outcome of a payment as reported to [`PaymentObserver`](crate::payment::PaymentObserver).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    /// The backend accepted the payment.
    Ok {
        /// Id to refund simple payments by.
        backend_transaction_id: u64,
        /// Only set for partial payments; needed to refund them.
        payment_request_uid: Option<String>,
    },
    /// The backend, or the transport on the way to it, refused the payment.
    Failed {
        /// Backend or transport error text.
        message: String,
    },
}

impl PaymentResult {
    /// Interpret a backend answer for a payment sent through `operation`.
    pub fn from_backend(operation: PaymentOperation, response: BackendResponse) -> Self {
        if let Some(message) = response.error {
            return PaymentResult::Failed { message };
        }
        let payment_request_uid = match operation {
            PaymentOperation::Partial => response.payment_request_uid,
            PaymentOperation::Simple => None,
        };
        PaymentResult::Ok {
            backend_transaction_id: response.transaction_id,
            payment_request_uid,
        }
    }

    /// True for [`PaymentResult::Ok`].
    pub fn is_ok(&self) -> bool {
        matches!(self, PaymentResult::Ok { .. })
    }
}

/// Outcome of a refund.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundResult {
    /// The backend accepted the refund.
    Ok,
    /// The refund was refused.
    Failed {
        /// Backend or transport error text.
        message: String,
    },
}

impl RefundResult {
    /// Interpret a backend answer to a refund.
    pub fn from_backend(response: BackendResponse) -> Self {
        match response.error {
            Some(message) => RefundResult::Failed { message },
            None => RefundResult::Ok,
        }
    }

    /// True for [`RefundResult::Ok`].
    pub fn is_ok(&self) -> bool {
        matches!(self, RefundResult::Ok)
    }
}

/// Outcome of a [`StatusQuery`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusResult {
    /// The backend knows the payment.
    Ok {
        /// Where the payment stands.
        status: PaymentStatus,
        /// Id to refund the payment by.
        backend_transaction_id: u64,
    },
    /// The lookup itself failed.
    Failed {
        /// Backend or transport error text.
        message: String,
    },
}

impl StatusResult {
    /// Interpret a backend answer to a status query.
    pub fn from_backend(response: BackendResponse) -> Self {
        match response.error {
            Some(message) => StatusResult::Failed { message },
            None => StatusResult::Ok {
                status: response.status,
                backend_transaction_id: response.transaction_id,
            },
        }
    }

    /// The reported status; `None` for failed lookups.
    pub fn status(&self) -> PaymentStatus {
        match self {
            StatusResult::Ok { status, .. } => *status,
            StatusResult::Failed { .. } => PaymentStatus::None,
        }
    }
}
