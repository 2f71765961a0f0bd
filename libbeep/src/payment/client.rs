// libbeep/src/payment/client.rs

//! Backend payment client.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Environment, PaymentConfig};
use crate::logging::{Logger, info, warn};
use crate::payment::request::{
    BackendResponse, PaymentOperation, PaymentRequest, PaymentResult, RefundRequest, RefundResult,
    RefundTarget, StatusQuery, StatusResult,
};
use crate::transport::{PaymentTransport, Reply, TransportHandle};
use crate::Result;

/// Receives backend results. Failures are results, not errors.
pub trait PaymentObserver: Send + Sync {
    /// Answer to [`PaymentClient::pay`], keyed by merchant transaction id.
    fn on_payment_result(&self, _transaction_id: &str, _result: &PaymentResult) {}
    /// Answer to [`PaymentClient::refund`].
    fn on_refund_result(&self, _target: &RefundTarget, _result: &RefundResult) {}
    /// Answer to [`PaymentClient::payment_status`].
    fn on_status_result(&self, _transaction_id: &str, _result: &StatusResult) {}
}

type ObserverSlot = Arc<RwLock<Option<Arc<dyn PaymentObserver>>>>;

/// Forwards payments and refunds to the payment backend. No retries: every
/// result reaches the observer exactly as the backend reported it.
pub struct PaymentClient {
    transport: Mutex<TransportHandle<dyn PaymentTransport>>,
    observer: ObserverSlot,
    environment: Environment,
    logger: Logger,
}

impl PaymentClient {
    /// Binds `config` to the transport. Fails if the transport refuses it.
    pub fn new(transport: Box<dyn PaymentTransport>, config: PaymentConfig) -> Result<Self> {
        let logger = config.log.logger("payment");
        let mut transport = TransportHandle::new(transport);
        transport.bind(&config)?;
        info!(logger, "payment client bound to {}", config.environment);
        Ok(Self {
            transport: Mutex::new(transport),
            observer: Arc::new(RwLock::new(None)),
            environment: config.environment,
            logger,
        })
    }

    /// Environment the client was bound to.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Replace the observer. Results arriving afterwards go to the new one.
    pub fn set_observer(&self, observer: Arc<dyn PaymentObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Drop the observer; later results are discarded.
    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Submit a payment. Requests with metadata go through the partial
    /// operation, all others through the simple one.
    pub fn pay(&self, request: &PaymentRequest) -> Result<()> {
        request.validate()?;
        let operation = PaymentOperation::for_request(request);
        info!(
            self.logger,
            "payment {} ({:?}) for {} coins",
            request.transaction_id,
            operation,
            request.amount_in_coins
        );

        let reply = {
            let observer = self.observer.clone();
            let logger = self.logger.clone();
            let transaction_id = request.transaction_id.clone();
            Reply::new(move |response: BackendResponse| {
                let result = PaymentResult::from_backend(operation, response);
                if let PaymentResult::Failed { message } = &result {
                    warn!(logger, "payment {} failed: {}", transaction_id, message);
                }
                publish(&observer, |o| o.on_payment_result(&transaction_id, &result));
            })
        };

        let submitted = {
            let mut transport = self.transport.lock();
            match operation {
                PaymentOperation::Simple => transport.submit_payment(request, reply),
                PaymentOperation::Partial => transport.submit_partial_payment(request, reply),
            }
        };

        if let Err(e) = submitted {
            warn!(self.logger, "payment {} not submitted: {}", request.transaction_id, e);
            let result = PaymentResult::Failed {
                message: e.to_string(),
            };
            publish(&self.observer, |o| {
                o.on_payment_result(&request.transaction_id, &result)
            });
        }
        Ok(())
    }

    /// Submit a refund through the operation its target names.
    pub fn refund(&self, request: &RefundRequest) -> Result<()> {
        request.validate()?;
        info!(
            self.logger,
            "refund {:?} for {} coins",
            request.target,
            request.amount_in_coins
        );

        let reply = {
            let observer = self.observer.clone();
            let target = request.target.clone();
            Reply::new(move |response: BackendResponse| {
                let result = RefundResult::from_backend(response);
                publish(&observer, |o| o.on_refund_result(&target, &result));
            })
        };

        let submitted = {
            let mut transport = self.transport.lock();
            match request.target {
                RefundTarget::BackendTransaction(_) => transport.submit_refund(request, reply),
                RefundTarget::PaymentRequestUid(_) => {
                    transport.submit_partial_refund(request, reply)
                }
            }
        };

        if let Err(e) = submitted {
            warn!(self.logger, "refund {:?} not submitted: {}", request.target, e);
            let result = RefundResult::Failed {
                message: e.to_string(),
            };
            publish(&self.observer, |o| o.on_refund_result(&request.target, &result));
        }
        Ok(())
    }

    /// Ask the backend where an earlier payment stands. The answer goes to
    /// [`PaymentObserver::on_status_result`].
    pub fn payment_status(&self, query: &StatusQuery) -> Result<()> {
        query.validate()?;
        info!(self.logger, "status of payment {}", query.transaction_id);

        let reply = {
            let observer = self.observer.clone();
            let transaction_id = query.transaction_id.clone();
            Reply::new(move |response: BackendResponse| {
                let result = StatusResult::from_backend(response);
                publish(&observer, |o| o.on_status_result(&transaction_id, &result));
            })
        };

        let submitted = self.transport.lock().submit_status_query(query, reply);
        if let Err(e) = submitted {
            warn!(self.logger, "status query {} not submitted: {}", query.transaction_id, e);
            let result = StatusResult::Failed {
                message: e.to_string(),
            };
            publish(&self.observer, |o| {
                o.on_status_result(&query.transaction_id, &result)
            });
        }
        Ok(())
    }

    /// Release the backend transport now.
    pub fn shutdown(self) {
        drop(self)
    }
}

fn publish(slot: &ObserverSlot, f: impl FnOnce(&dyn PaymentObserver)) {
    let observer = slot.read().clone();
    if let Some(observer) = observer {
        f(observer.as_ref());
    }
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("environment", &self.environment)
            .finish()
    }
}
