// libbeep/src/payment/async_backend.rs

//! Adapter running an async payment backend on a tokio runtime.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::config::PaymentConfig;
use crate::payment::request::{BackendResponse, PaymentRequest, RefundRequest, StatusQuery};
use crate::transport::{PaymentTransport, Reply, TransportResource};
use crate::Result;

/// Async payment backend, e.g. an HTTP client. An `Err` is reported to the
/// caller as a failed result carrying the error text.
#[async_trait]
pub trait AsyncPaymentBackend: Send + Sync + 'static {
    /// Accept the environment and merchant credential.
    fn bind(&self, _config: &PaymentConfig) -> Result<()> {
        Ok(())
    }

    /// Simple payment.
    async fn make_payment(&self, request: &PaymentRequest) -> Result<BackendResponse>;

    /// Payment split by its metadata.
    async fn make_partial_payment(&self, request: &PaymentRequest) -> Result<BackendResponse>;

    /// Refund by backend transaction id.
    async fn make_refund(&self, request: &RefundRequest) -> Result<BackendResponse>;

    /// Refund by payment request uid.
    async fn make_partial_refund(&self, request: &RefundRequest) -> Result<BackendResponse>;

    /// Processing status of an earlier payment.
    async fn get_payment_status(&self, query: &StatusQuery) -> Result<BackendResponse>;
}

#[derive(Debug, Clone, Copy)]
enum Call {
    Payment,
    PartialPayment,
}

#[derive(Debug, Clone, Copy)]
enum RefundCall {
    Refund,
    PartialRefund,
}

/// [`PaymentTransport`] that spawns every request onto a tokio runtime and
/// completes the reply from the spawned task.
pub struct TokioPaymentTransport<B: AsyncPaymentBackend> {
    backend: Arc<B>,
    runtime: Handle,
}

impl<B: AsyncPaymentBackend> TokioPaymentTransport<B> {
    /// Run `backend` on `runtime`.
    pub fn new(backend: B, runtime: Handle) -> Self {
        Self {
            backend: Arc::new(backend),
            runtime,
        }
    }

    /// Use the runtime of the calling context. Panics outside a runtime,
    /// like `Handle::current`.
    pub fn on_current_runtime(backend: B) -> Self {
        Self::new(backend, Handle::current())
    }

    fn spawn_payment(&self, call: Call, request: &PaymentRequest, reply: Reply<BackendResponse>) {
        let backend = self.backend.clone();
        let request = request.clone();
        self.runtime.spawn(async move {
            let response = match call {
                Call::Payment => backend.make_payment(&request).await,
                Call::PartialPayment => backend.make_partial_payment(&request).await,
            };
            reply.complete(response.unwrap_or_else(|e| BackendResponse::failed(e.to_string())));
        });
    }

    fn spawn_refund(&self, call: RefundCall, request: &RefundRequest, reply: Reply<BackendResponse>) {
        let backend = self.backend.clone();
        let request = request.clone();
        self.runtime.spawn(async move {
            let response = match call {
                RefundCall::Refund => backend.make_refund(&request).await,
                RefundCall::PartialRefund => backend.make_partial_refund(&request).await,
            };
            reply.complete(response.unwrap_or_else(|e| BackendResponse::failed(e.to_string())));
        });
    }
}

impl<B: AsyncPaymentBackend> TransportResource for TokioPaymentTransport<B> {}

impl<B: AsyncPaymentBackend> PaymentTransport for TokioPaymentTransport<B> {
    fn bind(&mut self, config: &PaymentConfig) -> Result<()> {
        self.backend.bind(config)
    }

    fn submit_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.spawn_payment(Call::Payment, request, reply);
        Ok(())
    }

    fn submit_partial_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.spawn_payment(Call::PartialPayment, request, reply);
        Ok(())
    }

    fn submit_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.spawn_refund(RefundCall::Refund, request, reply);
        Ok(())
    }

    fn submit_partial_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.spawn_refund(RefundCall::PartialRefund, request, reply);
        Ok(())
    }

    fn submit_status_query(
        &mut self,
        query: &StatusQuery,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        let backend = self.backend.clone();
        let query = query.clone();
        self.runtime.spawn(async move {
            let response = backend.get_payment_status(&query).await;
            reply.complete(response.unwrap_or_else(|e| BackendResponse::failed(e.to_string())));
        });
        Ok(())
    }
}
