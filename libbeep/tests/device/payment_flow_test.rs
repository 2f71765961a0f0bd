#[path = "../common/mod.rs"]
mod common;

use libbeep::test_support::SessionRecord;
use libbeep::transport::mock::DeviceCall;
use libbeep::transport::TransportEvent;
use libbeep::{ChargeRequest, DeviceState, PaymentError, PaymentMetadata, PaymentToken};

use common::fixtures::split_metadata;

#[test]
fn token_carries_the_requested_charge() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.create_payment_token(105, "tx1", "cashier-7", split_metadata())?;
    assert_eq!(session.state(), DeviceState::WaitingForPaymentToken);

    let charge = ChargeRequest::new(105, "tx1")
        .with_cashier_id("cashier-7")
        .with_metadata(split_metadata());
    assert_eq!(
        mock.calls(),
        vec![DeviceCall::SendPaymentTokenRequest(charge.clone())]
    );

    mock.emit(TransportEvent::PaymentTokenReceived("TOK".into()));
    assert_eq!(
        observer.tokens(),
        vec![PaymentToken {
            token: "TOK".into(),
            charge
        }]
    );
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}

#[test]
fn stale_token_after_cancel_is_discarded() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.create_payment_token(105, "tx1", "", PaymentMetadata::new())?;
    session.cancel_payment()?;
    assert_eq!(session.state(), DeviceState::SessionOpened);

    mock.emit(TransportEvent::PaymentTokenReceived("LATE".into()));
    assert!(observer.tokens().is_empty());
    assert_eq!(session.state(), DeviceState::SessionOpened);

    // the next exchange starts clean
    session.create_payment_token(50, "tx2", "", PaymentMetadata::new())?;
    mock.emit(TransportEvent::PaymentTokenReceived("TOK2".into()));
    let tokens = observer.tokens();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, "TOK2");
    assert_eq!(tokens[0].charge.transaction_id, "tx2");
    assert_eq!(tokens[0].charge.amount_in_coins, 50);
    Ok(())
}

#[test]
fn device_side_payment_then_confirm() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.create_payment(300, "tx9", "", PaymentMetadata::new())?;
    assert_eq!(session.state(), DeviceState::WaitingForPaymentResult);

    mock.emit(TransportEvent::PaymentSucceeded);
    assert_eq!(session.state(), DeviceState::WaitingForConfirmation);

    session.confirm_payment()?;
    assert_eq!(session.state(), DeviceState::SessionClosed);
    assert_eq!(
        observer.records(),
        vec![
            SessionRecord::State(DeviceState::WaitingForPaymentResult),
            SessionRecord::State(DeviceState::WaitingForConfirmation),
            SessionRecord::PaymentSuccess,
            SessionRecord::State(DeviceState::SessionClosed),
        ]
    );
    assert_eq!(mock.last_call(), Some(DeviceCall::ConfirmPayment));
    Ok(())
}

#[test]
fn payment_failure_reaches_observer() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.create_payment(300, "tx9", "", PaymentMetadata::new())?;
    mock.emit(TransportEvent::PaymentFailed(PaymentError::InvalidPin));
    mock.emit(TransportEvent::StateChanged(DeviceState::SessionOpened));

    assert!(observer
        .records()
        .contains(&SessionRecord::PaymentError(PaymentError::InvalidPin)));
    assert_eq!(session.state(), DeviceState::SessionOpened);

    // success outside the payment exchange is ignored
    mock.emit(TransportEvent::PaymentSucceeded);
    assert!(!observer.records().contains(&SessionRecord::PaymentSuccess));
    Ok(())
}
