// libbeep/src/payment/mod.rs

//! Payments, refunds and status lookups against the payment backend.

/// Tokio adapter for async payment backends.
#[cfg(feature = "async")]
pub mod async_backend;
pub mod client;
pub mod request;

#[cfg(feature = "async")]
pub use async_backend::{AsyncPaymentBackend, TokioPaymentTransport};
pub use client::{PaymentClient, PaymentObserver};
pub use request::{
    BackendResponse, PaymentOperation, PaymentRequest, PaymentResult, PaymentStatus, RefundRequest,
    RefundResult, RefundTarget, StatusQuery, StatusResult,
};
