#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use libbeep::payment::BackendResponse;
use libbeep::test_support::RecordingPaymentObserver;
use libbeep::transport::mock::PaymentCall;
use libbeep::transport::{MockPaymentTransport, TransportEvent};
use libbeep::{Environment, PaymentClient, PaymentConfig, PaymentMetadata, PaymentRequest, PaymentResult};

use common::fixtures::split_metadata;

fn client() -> anyhow::Result<(PaymentClient, MockPaymentTransport, Arc<RecordingPaymentObserver>)> {
    let backend = MockPaymentTransport::new();
    let client = PaymentClient::new(
        Box::new(backend.clone()),
        PaymentConfig::new(Environment::Development, "merchant-secret"),
    )?;
    let observer = Arc::new(RecordingPaymentObserver::default());
    client.set_observer(observer.clone());
    Ok((client, backend, observer))
}

#[test]
fn token_to_backend_payment() -> anyhow::Result<()> {
    let (session, device, session_observer) = common::helpers::opened_session()?;
    let (client, backend, observer) = client()?;

    session.create_payment_token(105, "tx1", "", PaymentMetadata::new())?;
    device.emit(TransportEvent::PaymentTokenReceived("TOK".into()));
    let token = session_observer.tokens().pop().expect("token published");

    let device_id = session.device_id().expect("device detected");
    let request = PaymentRequest::from_token(&token, device_id);
    client.pay(&request)?;

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        PaymentCall::Payment(sent) => {
            assert_eq!(sent.amount_in_coins, 105);
            assert_eq!(sent.transaction_id, "tx1");
            assert_eq!(sent.payment_token, "TOK");
            assert_eq!(sent.device_id, device_id);
        }
        other => panic!("expected simple payment, got {:?}", other),
    }

    backend.respond(BackendResponse::ok(999));
    assert_eq!(
        observer.payments(),
        vec![(
            "tx1".to_string(),
            PaymentResult::Ok {
                backend_transaction_id: 999,
                payment_request_uid: None
            }
        )]
    );
    Ok(())
}

#[test]
fn metadata_selects_partial_flow() -> anyhow::Result<()> {
    let (client, backend, observer) = client()?;
    let request = PaymentRequest::new("TOK", 105, "tx2", 1).with_metadata(split_metadata());
    client.pay(&request)?;
    assert_eq!(backend.calls(), vec![PaymentCall::PartialPayment(request)]);

    backend.respond(BackendResponse::failed("insufficient funds"));
    assert_eq!(
        observer.payments(),
        vec![(
            "tx2".to_string(),
            PaymentResult::Failed {
                message: "insufficient funds".into()
            }
        )]
    );
    Ok(())
}

#[test]
fn each_payment_answered_once_in_order() -> anyhow::Result<()> {
    let (client, backend, observer) = client()?;
    client.pay(&PaymentRequest::new("A", 1, "tx-a", 1))?;
    client.pay(&PaymentRequest::new("B", 2, "tx-b", 1))?;
    assert_eq!(backend.pending(), 2);

    assert!(backend.respond(BackendResponse::ok(1)));
    assert!(backend.respond(BackendResponse::ok(2)));
    assert!(!backend.respond(BackendResponse::ok(3)));

    let ids: Vec<String> = observer.payments().into_iter().map(|(tx, _)| tx).collect();
    assert_eq!(ids, vec!["tx-a".to_string(), "tx-b".to_string()]);
    Ok(())
}

#[test]
fn missing_observer_drops_results_quietly() -> anyhow::Result<()> {
    let (client, backend, observer) = client()?;
    client.clear_observer();
    client.pay(&PaymentRequest::new("A", 1, "tx-a", 1))?;
    assert!(backend.respond(BackendResponse::ok(1)));
    assert!(observer.payments().is_empty());
    Ok(())
}
