//! Test support helpers intended for use by unit and integration tests.
//!
//! Recording observers that collect every callback so tests across the
//! crate and the tests/ directory can assert on what was published, plus
//! a helper that wires a session to a mock transport.
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::device::{DeviceSession, SessionObserver};
use crate::nfc::{MfcReadResult, MfcWriteResult, MifareObserver};
use crate::payment::{PaymentObserver, PaymentResult, RefundResult, RefundTarget, StatusResult};
use crate::transport::mock::MockDeviceTransport;
use crate::types::{Barcode, DetectionError, DetectionEvent, DeviceState, PaymentError, PaymentToken};
use crate::{Error, Result};

/// One published session callback.
#[doc(hidden)]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRecord {
    State(DeviceState),
    Barcodes(Vec<Barcode>),
    PaymentToken(PaymentToken),
    PaymentSuccess,
    PaymentError(PaymentError),
    MobileConnection(bool),
    Nfc(DetectionEvent),
    NfcError(DetectionError),
    Error(Error),
}

/// Session observer that records every callback.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<SessionRecord>>,
}

impl RecordingObserver {
    /// Every callback so far, in order.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().clone()
    }

    /// Forget recorded callbacks.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Published states, in order.
    pub fn states(&self) -> Vec<DeviceState> {
        self.filter(|r| match r {
            SessionRecord::State(s) => Some(*s),
            _ => None,
        })
    }

    /// Delivered barcode batches.
    pub fn barcodes(&self) -> Vec<Vec<Barcode>> {
        self.filter(|r| match r {
            SessionRecord::Barcodes(b) => Some(b.clone()),
            _ => None,
        })
    }

    /// Delivered payment tokens.
    pub fn tokens(&self) -> Vec<PaymentToken> {
        self.filter(|r| match r {
            SessionRecord::PaymentToken(t) => Some(t.clone()),
            _ => None,
        })
    }

    /// Errors passed to `on_error`.
    pub fn errors(&self) -> Vec<Error> {
        self.filter(|r| match r {
            SessionRecord::Error(e) => Some(e.clone()),
            _ => None,
        })
    }

    fn filter<T>(&self, f: impl Fn(&SessionRecord) -> Option<T>) -> Vec<T> {
        self.records.lock().iter().filter_map(f).collect()
    }

    fn push(&self, record: SessionRecord) {
        self.records.lock().push(record);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_changed(&self, state: DeviceState) {
        self.push(SessionRecord::State(state));
    }

    fn on_barcodes(&self, barcodes: Vec<Barcode>) {
        self.push(SessionRecord::Barcodes(barcodes));
    }

    fn on_payment_token(&self, token: PaymentToken) {
        self.push(SessionRecord::PaymentToken(token));
    }

    fn on_payment_success(&self) {
        self.push(SessionRecord::PaymentSuccess);
    }

    fn on_payment_error(&self, error: PaymentError) {
        self.push(SessionRecord::PaymentError(error));
    }

    fn on_mobile_connection_changed(&self, connected: bool) {
        self.push(SessionRecord::MobileConnection(connected));
    }

    fn on_nfc_event(&self, event: DetectionEvent) {
        self.push(SessionRecord::Nfc(event));
    }

    fn on_nfc_detection_error(&self, error: DetectionError) {
        self.push(SessionRecord::NfcError(error));
    }

    fn on_error(&self, error: Error) {
        self.push(SessionRecord::Error(error));
    }
}

/// Mifare observer that records every outcome.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingMifareObserver {
    reads: Mutex<Vec<(u8, MfcReadResult)>>,
    writes: Mutex<Vec<(u8, MfcWriteResult)>>,
}

impl RecordingMifareObserver {
    /// Read outcomes, in order.
    pub fn reads(&self) -> Vec<(u8, MfcReadResult)> {
        self.reads.lock().clone()
    }

    /// Write outcomes, in order.
    pub fn writes(&self) -> Vec<(u8, MfcWriteResult)> {
        self.writes.lock().clone()
    }
}

impl MifareObserver for RecordingMifareObserver {
    fn on_read_result(&self, block_no: u8, result: MfcReadResult) {
        self.reads.lock().push((block_no, result));
    }

    fn on_write_result(&self, block_no: u8, result: MfcWriteResult) {
        self.writes.lock().push((block_no, result));
    }
}

/// Payment observer that records every result.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingPaymentObserver {
    payments: Mutex<Vec<(String, PaymentResult)>>,
    refunds: Mutex<Vec<(RefundTarget, RefundResult)>>,
    statuses: Mutex<Vec<(String, StatusResult)>>,
}

impl RecordingPaymentObserver {
    /// Payment results by transaction id.
    pub fn payments(&self) -> Vec<(String, PaymentResult)> {
        self.payments.lock().clone()
    }

    /// Refund results.
    pub fn refunds(&self) -> Vec<(RefundTarget, RefundResult)> {
        self.refunds.lock().clone()
    }

    /// Status query results by transaction id.
    pub fn statuses(&self) -> Vec<(String, StatusResult)> {
        self.statuses.lock().clone()
    }
}

impl PaymentObserver for RecordingPaymentObserver {
    fn on_payment_result(&self, transaction_id: &str, result: &PaymentResult) {
        self.payments
            .lock()
            .push((transaction_id.to_string(), result.clone()));
    }

    fn on_refund_result(&self, target: &RefundTarget, result: &RefundResult) {
        self.refunds.lock().push((target.clone(), result.clone()));
    }

    fn on_status_result(&self, transaction_id: &str, result: &StatusResult) {
        self.statuses
            .lock()
            .push((transaction_id.to_string(), result.clone()));
    }
}

/// Convenience: a started session on a mock transport with a recording
/// observer attached. When `detect` carries a firmware version the mock
/// reports a device with id 1 running it.
#[doc(hidden)]
pub fn started_mock_session(
    detect: Option<&str>,
) -> Result<(DeviceSession, MockDeviceTransport, Arc<RecordingObserver>)> {
    let mock = MockDeviceTransport::new();
    let session = DeviceSession::new(Box::new(mock.clone()), SessionConfig::default());
    let observer = Arc::new(RecordingObserver::default());
    session.set_observer(observer.clone());
    session.start()?;
    if let Some(version) = detect {
        mock.detect_device(version, 1);
    }
    Ok((session, mock, observer))
}
