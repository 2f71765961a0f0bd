// libbeep/src/device/observer.rs

//! Session observer callbacks.

use crate::Error;
use crate::types::{Barcode, DetectionError, DetectionEvent, DeviceState, PaymentError, PaymentToken};

/// Callbacks published by a [`DeviceSession`](crate::device::DeviceSession).
///
/// Callbacks are serialized and arrive in the order the changes were made.
/// They run on whichever thread is driving the session at the time: the
/// transport's delivery thread, or the caller's thread when the transport
/// answers from inside a request. The session lock is never held, so an
/// observer may call back into the session.
pub trait SessionObserver: Send + Sync {
    /// The published state changed.
    fn on_state_changed(&self, _state: DeviceState) {}

    /// A complete barcode batch, in slot order.
    fn on_barcodes(&self, _barcodes: Vec<Barcode>) {}

    /// The phone produced a payment token.
    fn on_payment_token(&self, _token: PaymentToken) {}

    /// Device-side payment went through and awaits confirmation.
    fn on_payment_success(&self) {}

    /// Device-side payment failed.
    fn on_payment_error(&self, _error: PaymentError) {}

    /// A phone connected or disconnected.
    fn on_mobile_connection_changed(&self, _connected: bool) {}

    /// A card entered or left the field.
    fn on_nfc_event(&self, _event: DetectionEvent) {}

    /// Card classification failed.
    fn on_nfc_detection_error(&self, _error: DetectionError) {}

    /// Failures only known asynchronously: transport rejections, device
    /// faults, rejected or incomplete barcode batches, and
    /// [`Error::Cancelled`] for exchanges the caller abandoned.
    fn on_error(&self, _error: Error) {}
}

/// Queued callback, dispatched once the session lock is released.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Notification {
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

impl Notification {
    pub(crate) fn dispatch(self, observer: &dyn SessionObserver) {
        match self {
            Notification::State(s) => observer.on_state_changed(s),
            Notification::Barcodes(b) => observer.on_barcodes(b),
            Notification::PaymentToken(t) => observer.on_payment_token(t),
            Notification::PaymentSuccess => observer.on_payment_success(),
            Notification::PaymentError(e) => observer.on_payment_error(e),
            Notification::MobileConnection(c) => observer.on_mobile_connection_changed(c),
            Notification::Nfc(e) => observer.on_nfc_event(e),
            Notification::NfcError(e) => observer.on_nfc_detection_error(e),
            Notification::Error(e) => observer.on_error(e),
        }
    }
}
