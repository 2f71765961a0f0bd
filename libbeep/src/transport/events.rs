// libbeep/src/transport/events.rs

//! Inbound event types and the sinks transports deliver them through.

use std::sync::{Arc, Weak};

use crate::types::{Barcode, DetectionError, DetectionEvent, DeviceState, PaymentError};

/// Everything a device transport can report asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A device was found and answered the version/id queries.
    DeviceDetected {
        /// Firmware version string.
        version: String,
        /// Device id.
        device_id: u64,
    },
    /// The device disappeared from the system.
    DeviceLost,
    /// The transport detected a device fault.
    DeviceFault(String),
    /// The device reports its own state.
    StateChanged(DeviceState),
    /// A batch of `count` barcodes follows.
    BarcodesBegin {
        /// Slots in the batch.
        count: usize,
    },
    /// One slot of the current batch.
    BarcodeSlot {
        /// Zero-based slot.
        index: usize,
        /// Content of the slot.
        barcode: Barcode,
    },
    /// The current batch is finished.
    BarcodesComplete,
    /// The phone produced a payment token.
    PaymentTokenReceived(String),
    /// A device-side payment went through.
    PaymentSucceeded,
    /// A device-side payment failed.
    PaymentFailed(PaymentError),
    /// A phone connected or disconnected.
    MobileConnectionChanged(bool),
    /// A card entered or left the field.
    NfcDetection(DetectionEvent),
    /// Card classification failed.
    NfcDetectionError(DetectionError),
    /// A Mifare block operation finished.
    MifareOperationComplete(MfcCompletion),
}

/// Completion of one Mifare Classic block operation, as reported by the
/// transport. Failure codes are mapped by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfcCompletion {
    /// A read returned `data`.
    Read {
        /// Block content as read.
        data: Vec<u8>,
    },
    /// A write was stored.
    Written,
    /// The reader reported failure `code`.
    Failed {
        /// Reader status code.
        code: i32,
    },
}

/// Receiving end of a sink. Implemented by the components that own state.
pub trait EventReceiver<E>: Send + Sync {
    /// Handle one delivered event.
    fn receive(&self, event: E);
}

/// Cloneable handle a transport uses to push events into a component from
/// any thread. Holds only a weak reference: once the component is dropped,
/// deliveries are discarded.
pub struct Sink<E> {
    target: Weak<dyn EventReceiver<E>>,
}

impl<E> Sink<E> {
    /// Sink delivering to `target` while it lives.
    pub fn new(target: Weak<dyn EventReceiver<E>>) -> Self {
        Self { target }
    }

    /// Deliver one event. Returns `false` when the receiver is gone.
    pub fn deliver(&self, event: E) -> bool {
        match self.target.upgrade() {
            Some(receiver) => {
                receiver.receive(event);
                true
            }
            None => false,
        }
    }

    /// Whether the receiver is still alive.
    pub fn is_connected(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl<E> Clone for Sink<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Sink<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<E, R> From<&Arc<R>> for Sink<E>
where
    R: EventReceiver<E> + 'static,
{
    fn from(receiver: &Arc<R>) -> Self {
        let weak: Weak<R> = Arc::downgrade(receiver);
        let target: Weak<dyn EventReceiver<E>> = weak;
        Self { target }
    }
}

/// One-shot completion handed to a transport together with a request.
/// Consumed by [`Reply::complete`], so a transport can answer at most once.
pub struct Reply<T> {
    callback: Box<dyn FnOnce(T) + Send>,
}

impl<T> Reply<T> {
    /// Reply that runs `callback` on completion.
    pub fn new(callback: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Answer the request.
    pub fn complete(self, value: T) {
        (self.callback)(value)
    }
}

impl<T> std::fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Reply")
    }
}

/// Sink for device transport events.
pub type EventSink = Sink<TransportEvent>;

/// Sink for Mifare block operation completions.
pub type MfcCompletionSink = Sink<MfcCompletion>;
