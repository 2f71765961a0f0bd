#[path = "../common/mod.rs"]
mod common;

use libbeep::test_support::SessionRecord;
use libbeep::transport::TransportEvent;
use libbeep::{DetectionError, DetectionEvent};

use common::fixtures::{detected, emv_card, mifare_card, removed};

#[test]
fn detection_is_tracked_and_republished() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    assert!(session.nfc_card_info().unwrap_err().is_invalid_state());

    mock.emit(detected(emv_card()));
    assert_eq!(session.nfc_card_info()?, emv_card());
    assert!(!session.detector().is_mifare_classic_present());

    mock.emit(removed());
    assert!(!session.detector().is_card_present());
    assert_eq!(
        observer.records(),
        vec![
            SessionRecord::Nfc(DetectionEvent::Detected {
                card_info: emv_card()
            }),
            SessionRecord::Nfc(DetectionEvent::Removed),
        ]
    );
    Ok(())
}

#[test]
fn new_card_replaces_old_one() -> anyhow::Result<()> {
    let (session, mock, _) = common::helpers::detected_session()?;
    mock.emit(detected(emv_card()));
    mock.emit(detected(mifare_card()));
    assert_eq!(session.nfc_card_info()?, mifare_card());
    assert!(session.detector().is_mifare_classic_present());
    Ok(())
}

#[test]
fn detection_error_leaves_presence_alone() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::detected_session()?;
    mock.emit(detected(mifare_card()));
    mock.emit(TransportEvent::NfcDetectionError(DetectionError::MultipleCards));

    assert_eq!(session.nfc_card_info()?, mifare_card());
    assert_eq!(
        session.detector().last_error(),
        Some(DetectionError::MultipleCards)
    );
    assert!(observer
        .records()
        .contains(&SessionRecord::NfcError(DetectionError::MultipleCards)));
    Ok(())
}

#[test]
fn device_lost_forgets_card() -> anyhow::Result<()> {
    let (session, mock, _) = common::helpers::detected_session()?;
    let detector = session.detector();
    mock.emit(detected(mifare_card()));
    assert!(detector.is_card_present());

    mock.emit(TransportEvent::DeviceLost);
    assert!(!detector.is_card_present());
    assert!(session.nfc_card_info().is_err());
    Ok(())
}
