#[path = "../common/mod.rs"]
mod common;

use libbeep::test_support::{started_mock_session, SessionRecord};
use libbeep::transport::mock::DeviceCall;
use libbeep::transport::TransportEvent;
use libbeep::{DeviceState, Error, PaymentMetadata};

#[test]
fn mobile_connection_reported_on_change_only() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    mock.emit(TransportEvent::MobileConnectionChanged(true));
    mock.emit(TransportEvent::MobileConnectionChanged(true));
    assert!(session.is_mobile_connected());
    mock.emit(TransportEvent::MobileConnectionChanged(false));
    assert!(!session.is_mobile_connected());

    assert_eq!(
        observer.records(),
        vec![
            SessionRecord::MobileConnection(true),
            SessionRecord::MobileConnection(false),
        ]
    );
    Ok(())
}

#[test]
fn device_lost_mid_exchange() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    mock.emit(TransportEvent::MobileConnectionChanged(true));
    session.create_payment_token(105, "tx1", "", PaymentMetadata::new())?;
    observer.clear();

    mock.emit(TransportEvent::DeviceLost);
    assert_eq!(session.state(), DeviceState::Invalid);
    assert_eq!(session.device_id(), None);
    assert!(!session.is_mobile_connected());
    assert_eq!(
        observer.records(),
        vec![
            SessionRecord::MobileConnection(false),
            SessionRecord::State(DeviceState::Invalid),
        ]
    );

    // the device comes back; the old token request is gone
    mock.detect_device(common::helpers::SUPPORTED_FIRMWARE, 2);
    assert_eq!(session.state(), DeviceState::SessionClosed);
    assert_eq!(session.device_id(), Some(2));
    mock.emit(TransportEvent::PaymentTokenReceived("TOK".into()));
    assert!(observer.tokens().is_empty());
    Ok(())
}

#[test]
fn device_fault_reports_error() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    mock.emit(TransportEvent::DeviceFault("link dropped".into()));
    assert_eq!(session.state(), DeviceState::Invalid);
    assert_eq!(
        observer.errors(),
        vec![Error::Transport("link dropped".into())]
    );
    assert!(session.is_started());
    Ok(())
}

#[test]
fn additional_device_is_ignored() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    mock.detect_device("2.0.0", 77);
    assert_eq!(session.device_id(), Some(1));
    assert_eq!(session.state(), DeviceState::SessionOpened);
    assert!(observer.records().is_empty());
    Ok(())
}

#[test]
fn firmware_minimum_is_configurable() -> anyhow::Result<()> {
    common::helpers::init_logging();
    let mock = libbeep::transport::MockDeviceTransport::new();
    let session = libbeep::DeviceSessionBuilder::default()
        .with_transport(Box::new(mock.clone()))
        .with_config(libbeep::SessionConfig::default().with_min_firmware_version("2.1.0"))
        .build()?;
    session.start()?;
    mock.detect_device("2.0.9", 3);
    assert_eq!(session.state(), DeviceState::FirmwareVersionNotSupported);
    assert_eq!(session.version().as_deref(), Some("2.0.9"));
    Ok(())
}

#[test]
fn stop_and_restart() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.stop()?;
    assert!(!session.is_started());
    assert_eq!(session.state(), DeviceState::Invalid);
    assert!(!mock.is_detecting());
    assert_eq!(observer.states(), vec![DeviceState::Invalid]);

    session.start()?;
    assert!(mock.detect_device(common::helpers::SUPPORTED_FIRMWARE, 1));
    assert_eq!(session.state(), DeviceState::SessionClosed);
    assert_eq!(
        mock.calls(),
        vec![DeviceCall::Teardown, DeviceCall::Detect]
    );
    Ok(())
}

#[test]
fn rejected_start_leaves_session_stopped() -> anyhow::Result<()> {
    common::helpers::init_logging();
    let mock = libbeep::transport::MockDeviceTransport::new();
    mock.set_failures(1);
    let session = libbeep::DeviceSession::new(Box::new(mock.clone()), Default::default());
    let observer = std::sync::Arc::new(libbeep::test_support::RecordingObserver::default());
    session.set_observer(observer.clone());

    session.start()?;
    assert!(!session.is_started());
    assert_eq!(observer.errors().len(), 1);

    session.start()?;
    assert!(session.is_started());
    Ok(())
}

#[test]
fn drop_releases_transport_once() -> anyhow::Result<()> {
    let (session, mock, _) = started_mock_session(Some(common::helpers::SUPPORTED_FIRMWARE))?;
    drop(session);
    assert_eq!(mock.release_count(), 1);
    assert_eq!(mock.last_call(), Some(DeviceCall::Teardown));
    assert!(!mock.emit(TransportEvent::DeviceLost));
    Ok(())
}
