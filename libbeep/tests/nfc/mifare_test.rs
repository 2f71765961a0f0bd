#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use libbeep::test_support::RecordingMifareObserver;
use libbeep::transport::mock::MifareCall;
use libbeep::transport::{MfcCompletion, MockMifareTransport, TransportEvent};
use libbeep::{Error, MfcKey, MfcKeyType, MfcOperationError, MifareClassicChannel};

use common::fixtures::{detected, emv_card, mifare_card, removed, sample_block, sample_block_bytes, sample_key};

fn channel_with_card() -> anyhow::Result<(
    libbeep::DeviceSession,
    libbeep::transport::MockDeviceTransport,
    MifareClassicChannel,
    MockMifareTransport,
    Arc<RecordingMifareObserver>,
)> {
    let (session, device, _) = common::helpers::detected_session()?;
    device.emit(detected(mifare_card()));
    let reader = MockMifareTransport::new();
    let channel = session.mifare_channel(Box::new(reader.clone()))?;
    let observer = Arc::new(RecordingMifareObserver::default());
    channel.set_observer(observer.clone());
    Ok((session, device, channel, reader, observer))
}

#[test]
fn channel_needs_mifare_card() -> anyhow::Result<()> {
    let (session, device, _) = common::helpers::detected_session()?;
    let err = session
        .mifare_channel(Box::new(MockMifareTransport::new()))
        .unwrap_err();
    assert!(err.is_invalid_state());

    device.emit(detected(emv_card()));
    assert!(session
        .mifare_channel(Box::new(MockMifareTransport::new()))
        .is_err());
    Ok(())
}

#[test]
fn second_read_while_busy_is_refused() -> anyhow::Result<()> {
    let (_session, _device, channel, reader, observer) = channel_with_card()?;
    let key = sample_key();

    channel.read_block(61, &key)?;
    assert!(channel.is_busy());
    let err = channel.read_block(61, &key).unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(
        reader.calls(),
        vec![MifareCall::Read { block_no: 61, key }]
    );

    reader.complete(MfcCompletion::Read {
        data: sample_block_bytes(0x5A),
    });
    assert!(!channel.is_busy());
    assert_eq!(observer.reads(), vec![(61, Ok(sample_block(61, 0x5A)))]);

    // free again
    channel.read_block(62, &key)?;
    assert_eq!(reader.calls().len(), 2);
    Ok(())
}

#[test]
fn completion_routed_through_session() -> anyhow::Result<()> {
    let (_session, device, channel, _reader, observer) = channel_with_card()?;
    let block = sample_block(8, 0x11);
    channel.write_block(&block, &sample_key())?;

    device.emit(TransportEvent::MifareOperationComplete(MfcCompletion::Written));
    assert_eq!(observer.writes(), vec![(8, Ok(()))]);
    assert!(!channel.is_busy());
    Ok(())
}

#[test]
fn failure_codes_and_short_reads() -> anyhow::Result<()> {
    let (_session, _device, channel, reader, observer) = channel_with_card()?;
    let key = sample_key();

    channel.read_block(4, &key)?;
    reader.complete(MfcCompletion::Failed { code: 3 });
    channel.read_block(5, &key)?;
    reader.complete(MfcCompletion::Read { data: vec![0; 15] });

    assert_eq!(
        observer.reads(),
        vec![
            (4, Err(MfcOperationError::AuthError)),
            (5, Err(MfcOperationError::DataSize)),
        ]
    );
    Ok(())
}

#[test]
fn card_removed_blocks_new_operations() -> anyhow::Result<()> {
    let (_session, device, channel, reader, _observer) = channel_with_card()?;
    device.emit(removed());
    let err = channel.read_block(1, &sample_key()).unwrap_err();
    assert!(err.is_invalid_state());
    assert!(reader.calls().is_empty());
    Ok(())
}

#[test]
fn key_without_type_is_refused() -> anyhow::Result<()> {
    let (_session, _device, channel, reader, _observer) = channel_with_card()?;
    let key = MfcKey::new(MfcKeyType::None, &[0xFF; 6])?;
    assert_eq!(
        channel.read_block(1, &key).unwrap_err(),
        Error::MifareOperation(MfcOperationError::KeyParamInvalid)
    );
    assert!(reader.calls().is_empty());
    assert!(!channel.is_busy());
    Ok(())
}

#[test]
fn rejected_request_is_interrupted() -> anyhow::Result<()> {
    let (_session, _device, channel, reader, observer) = channel_with_card()?;
    reader.set_failures(1);
    channel.write_block(&sample_block(9, 0), &sample_key())?;
    assert_eq!(
        observer.writes(),
        vec![(9, Err(MfcOperationError::Interrupted))]
    );
    assert!(!channel.is_busy());
    Ok(())
}

#[test]
fn dropping_channel_releases_reader() -> anyhow::Result<()> {
    let (_session, device, channel, reader, _observer) = channel_with_card()?;
    channel.shutdown();
    assert_eq!(reader.release_count(), 1);
    // nothing left to route to
    assert!(device.emit(TransportEvent::MifareOperationComplete(MfcCompletion::Written)));
    Ok(())
}
