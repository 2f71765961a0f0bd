#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use libbeep::payment::BackendResponse;
use libbeep::test_support::RecordingPaymentObserver;
use libbeep::transport::mock::PaymentCall;
use libbeep::transport::MockPaymentTransport;
use libbeep::{
    Environment, PaymentClient, PaymentConfig, PaymentRequest, PaymentResult, RefundRequest,
    RefundResult, RefundTarget,
};

use common::fixtures::split_metadata;

#[test]
fn refunds_follow_the_payment_flow() -> anyhow::Result<()> {
    common::helpers::init_logging();
    let backend = MockPaymentTransport::new();
    let client = PaymentClient::new(
        Box::new(backend.clone()),
        PaymentConfig::new(Environment::Production, "k"),
    )?;
    let observer = Arc::new(RecordingPaymentObserver::default());
    client.set_observer(observer.clone());

    // simple payment, refunded by backend transaction id
    client.pay(&PaymentRequest::new("T1", 105, "tx1", 1))?;
    backend.respond(BackendResponse::ok(999));
    // partial payment, refunded by uid
    client.pay(&PaymentRequest::new("T2", 80, "tx2", 1).with_metadata(split_metadata()))?;
    backend.respond(BackendResponse::ok(1000).with_payment_request_uid("c0ffee"));

    let payments = observer.payments();
    let refund_targets: Vec<RefundTarget> = payments
        .iter()
        .map(|(_, result)| match result {
            PaymentResult::Ok {
                payment_request_uid: Some(uid),
                ..
            } => RefundTarget::PaymentRequestUid(uid.clone()),
            PaymentResult::Ok {
                backend_transaction_id,
                ..
            } => RefundTarget::BackendTransaction(*backend_transaction_id),
            PaymentResult::Failed { message } => panic!("payment failed: {}", message),
        })
        .collect();
    assert_eq!(
        refund_targets,
        vec![
            RefundTarget::BackendTransaction(999),
            RefundTarget::PaymentRequestUid("c0ffee".into()),
        ]
    );

    for (target, amount) in refund_targets.into_iter().zip([105, 80]) {
        client.refund(&RefundRequest::new(target, amount, 1))?;
    }
    let calls = backend.calls();
    assert!(matches!(calls[2], PaymentCall::Refund(ref r) if r.amount_in_coins == 105));
    assert!(matches!(calls[3], PaymentCall::PartialRefund(ref r) if r.amount_in_coins == 80));

    backend.respond(BackendResponse::ok(0));
    backend.respond(BackendResponse::ok(0));
    assert!(observer.refunds().iter().all(|(_, r)| *r == RefundResult::Ok));
    Ok(())
}

#[test]
fn rejected_refund_is_failed_result() -> anyhow::Result<()> {
    let backend = MockPaymentTransport::new();
    let client = PaymentClient::new(Box::new(backend.clone()), PaymentConfig::default())?;
    let observer = Arc::new(RecordingPaymentObserver::default());
    client.set_observer(observer.clone());

    backend.set_failures(1);
    client.refund(&RefundRequest::by_transaction(5, 10, 1))?;
    let refunds = observer.refunds();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].0, RefundTarget::BackendTransaction(5));
    assert!(!refunds[0].1.is_ok());
    assert_eq!(backend.pending(), 0);
    Ok(())
}

#[test]
fn bind_failure_stops_construction() {
    let backend = MockPaymentTransport::new();
    backend.set_failures(1);
    assert!(PaymentClient::new(Box::new(backend.clone()), PaymentConfig::default()).is_err());
    assert_eq!(backend.release_count(), 1);
}
