#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use libbeep::test_support::SessionRecord;
use libbeep::transport::{MockDeviceTransport, TransportEvent};
use libbeep::{DeviceSession, DeviceState, PaymentMetadata};

use common::fixtures::{barcode_batch_events, coupon_barcode, loyalty_barcode};
use common::helpers::SUPPORTED_FIRMWARE;

const ROUNDS: usize = 200;

const DEVICE_STATES: [DeviceState; 5] = [
    DeviceState::SessionOpened,
    DeviceState::WaitingForBarcodes,
    DeviceState::SessionClosed,
    DeviceState::WaitingForPaymentToken,
    DeviceState::WaitingForPaymentResult,
];

/// One round of device chatter: a phone toggling, a reported state, a
/// barcode batch and, now and then, a fault followed by re-detection.
fn device_chatter(mock: &MockDeviceTransport, round: usize) {
    mock.emit(TransportEvent::MobileConnectionChanged(round % 2 == 0));
    mock.emit(TransportEvent::StateChanged(
        DEVICE_STATES[round % DEVICE_STATES.len()],
    ));
    for event in barcode_batch_events(&[loyalty_barcode(), coupon_barcode()], &[1, 0]) {
        mock.emit(event);
    }
    if round % 50 == 49 {
        mock.emit(TransportEvent::DeviceFault("link dropped".into()));
        mock.detect_device(SUPPORTED_FIRMWARE, 1);
    }
}

/// Every command a cashier could hit; most are refused in whatever state
/// the device happens to be in.
fn cashier_command(session: &DeviceSession, round: usize) {
    let _ = match round % 6 {
        0 => session.open_session(),
        1 => session.request_barcodes(),
        2 => session.cancel_barcodes(),
        3 => session.create_payment_token(105, "tx1", "", PaymentMetadata::new()),
        4 => session.cancel_payment(),
        _ => session.close_session(),
    };
    let _ = session.state();
}

fn published_states(records: &[SessionRecord]) -> Vec<DeviceState> {
    records
        .iter()
        .filter_map(|record| match record {
            SessionRecord::State(state) => Some(*state),
            _ => None,
        })
        .collect()
}

#[test]
fn last_device_event_defines_final_state() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::detected_session()?;
    let barrier = Arc::new(Barrier::new(2));

    let emitter = {
        let mock = mock.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            for round in 0..ROUNDS {
                device_chatter(&mock, round);
            }
            // the cashier is done; the device has the last word
            barrier.wait();
            mock.emit(TransportEvent::StateChanged(
                DeviceState::WaitingForPaymentToken,
            ));
        })
    };

    for round in 0..ROUNDS {
        cashier_command(&session, round);
    }
    barrier.wait();
    emitter.join().expect("emitter panicked");

    assert_eq!(session.state(), DeviceState::WaitingForPaymentToken);
    let states = published_states(&observer.records());
    assert_eq!(states.last(), Some(&session.state()));
    // callbacks are serialized: no state is ever published twice in a row
    for pair in states.windows(2) {
        assert_ne!(pair[0], pair[1], "{:?}", states);
    }
    Ok(())
}

#[test]
fn no_callback_after_stop_returns() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::detected_session()?;
    let running = Arc::new(AtomicBool::new(true));

    let emitter = {
        let mock = mock.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut round = 0;
            while running.load(Ordering::SeqCst) {
                device_chatter(&mock, round);
                round += 1;
            }
            round
        })
    };

    let mut round = 0;
    while observer.records().len() < 20 {
        cashier_command(&session, round);
        round += 1;
    }
    session.stop()?;
    let seen = observer.records().len();

    running.store(false, Ordering::SeqCst);
    let rounds = emitter.join().expect("emitter panicked");
    assert!(rounds > 0);

    assert_eq!(observer.records().len(), seen);
    assert_eq!(session.state(), DeviceState::Invalid);
    assert!(!session.is_started());
    assert_eq!(
        published_states(&observer.records()).last(),
        Some(&DeviceState::Invalid)
    );
    Ok(())
}

#[test]
fn commands_race_device_loss() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::detected_session()?;

    let emitter = {
        let mock = mock.clone();
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                mock.emit(TransportEvent::DeviceLost);
                mock.detect_device(SUPPORTED_FIRMWARE, 7);
            }
            mock.emit(TransportEvent::DeviceLost);
        })
    };

    for round in 0..ROUNDS {
        cashier_command(&session, round);
    }
    emitter.join().expect("emitter panicked");

    assert_eq!(session.state(), DeviceState::Invalid);
    assert_eq!(session.device_id(), None);
    assert!(!session.is_mobile_connected());
    assert_eq!(
        published_states(&observer.records()).last(),
        Some(&DeviceState::Invalid)
    );
    Ok(())
}
