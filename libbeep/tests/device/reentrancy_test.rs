#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use libbeep::transport::mock::DeviceCall;
use libbeep::transport::{MockDeviceTransport, TransportEvent};
use libbeep::{Barcode, DeviceSession, DeviceState, SessionObserver};

use common::fixtures::{barcode_batch_events, loyalty_barcode};

/// Observer that drives the session from inside its callbacks.
#[derive(Default)]
struct Cashier {
    session: OnceLock<Arc<DeviceSession>>,
    seen_states: Mutex<Vec<DeviceState>>,
}

impl SessionObserver for Cashier {
    fn on_state_changed(&self, _state: DeviceState) {
        if let Some(session) = self.session.get() {
            self.seen_states.lock().push(session.state());
        }
    }

    fn on_barcodes(&self, _barcodes: Vec<Barcode>) {
        if let Some(session) = self.session.get() {
            session.close_session().unwrap();
        }
    }
}

#[test]
fn observer_may_call_back_into_session() -> anyhow::Result<()> {
    common::helpers::init_logging();
    let mock = MockDeviceTransport::new();
    let session = Arc::new(DeviceSession::new(
        Box::new(mock.clone()),
        Default::default(),
    ));
    let cashier = Arc::new(Cashier::default());
    let _ = cashier.session.set(session.clone());
    session.set_observer(cashier.clone());

    session.start()?;
    mock.detect_device(common::helpers::SUPPORTED_FIRMWARE, 1);
    session.open_session()?;
    session.request_barcodes()?;
    for event in barcode_batch_events(&[loyalty_barcode()], &[0]) {
        mock.emit(event);
    }

    assert_eq!(session.state(), DeviceState::SessionClosed);
    assert_eq!(mock.last_call(), Some(DeviceCall::CloseSession));
    assert!(!cashier.seen_states.lock().is_empty());

    // break the session -> observer -> session cycle
    session.clear_observer();
    Ok(())
}

#[test]
fn observer_can_be_replaced_while_running() -> anyhow::Result<()> {
    let (session, mock, first) = common::helpers::detected_session()?;
    let second = Arc::new(libbeep::test_support::RecordingObserver::default());
    session.set_observer(second.clone());
    mock.emit(TransportEvent::MobileConnectionChanged(true));

    assert_eq!(
        first.records(),
        vec![libbeep::test_support::SessionRecord::State(
            DeviceState::SessionClosed
        )]
    );
    assert_eq!(second.records().len(), 1);

    session.clear_observer();
    mock.emit(TransportEvent::MobileConnectionChanged(false));
    assert_eq!(second.records().len(), 1);
    assert!(!session.is_mobile_connected());
    Ok(())
}
