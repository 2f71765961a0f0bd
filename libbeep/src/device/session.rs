// libbeep/src/device/session.rs

//! Device session state machine.
//!
//! Commands check their precondition, forward a request to the transport
//! and optimistically move to the expected state. Transport events always
//! have the last word on the published state.
//!
//! Events are queued on arrival and folded in arrival order by whichever
//! thread next holds the session, so a transport may deliver from inside a
//! request. Folding and observer dispatch are serialized: callbacks see
//! changes in the order they were made, and none fire once `stop` returns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::config::SessionConfig;
use crate::device::assembler::{AssemblyOutcome, BarcodeAssembler};
use crate::device::observer::{Notification, SessionObserver};
use crate::logging::{Logger, debug, error, info, warn};
use crate::nfc::{MifareClassicChannel, NfcCardDetector};
use crate::transport::{
    DeviceTransport, EventReceiver, EventSink, MfcCompletion, MfcCompletionSink, MifareTransport,
    TransportEvent, TransportHandle,
};
use crate::types::{CardInfo, ChargeRequest, DeviceState, PaymentMetadata, PaymentToken};
use crate::utils::is_firmware_supported;
use crate::{Error, Result};

/// Identity reported by a detected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version string, e.g. `1.4.2`.
    pub version: String,
    /// Device id, also passed to the payment backend.
    pub device_id: u64,
}

struct Inner {
    started: bool,
    state: DeviceState,
    transport: TransportHandle<dyn DeviceTransport>,
    assembler: BarcodeAssembler,
    detector: NfcCardDetector,
    mobile_connected: bool,
    device: Option<DeviceInfo>,
    pending_charge: Option<ChargeRequest>,
    mifare_route: Option<MfcCompletionSink>,
    logger: Logger,
}

impl Inner {
    /// Precondition shared by every command after `start`.
    fn require(&self, operation: &'static str, allowed: impl Fn(DeviceState) -> bool) -> Result<()> {
        if !self.started {
            return Err(Error::invalid_state(operation, "session not started"));
        }
        if !allowed(self.state) {
            return Err(Error::invalid_state(operation, self.state));
        }
        Ok(())
    }

    /// Forward a request. On success move to `next`; on a synchronous
    /// rejection keep the current state and queue the error for the
    /// observer. Returns whether the transport accepted the request.
    fn send(
        &mut self,
        operation: &'static str,
        next: Option<DeviceState>,
        notes: &mut Vec<Notification>,
        request: impl FnOnce(&mut dyn DeviceTransport) -> Result<()>,
    ) -> bool {
        match request(&mut *self.transport) {
            Ok(()) => {
                if let Some(next) = next {
                    self.transition(next, notes);
                }
                true
            }
            Err(e) => {
                warn!(self.logger, "{} rejected by transport: {}", operation, e);
                notes.push(Notification::Error(e));
                false
            }
        }
    }

    fn transition(&mut self, next: DeviceState, notes: &mut Vec<Notification>) {
        if self.state != next {
            debug!(self.logger, "state {} -> {}", self.state, next);
            self.state = next;
            notes.push(Notification::State(next));
        }
    }

    fn set_mobile_connected(&mut self, connected: bool, notes: &mut Vec<Notification>) {
        if self.mobile_connected != connected {
            self.mobile_connected = connected;
            notes.push(Notification::MobileConnection(connected));
        }
    }

    /// Forget the device and every exchange in flight.
    fn drop_device(&mut self, notes: &mut Vec<Notification>) {
        self.assembler.reset();
        self.pending_charge = None;
        self.device = None;
        self.detector.reset();
        self.set_mobile_connected(false, notes);
        self.transition(DeviceState::Invalid, notes);
    }
}

/// A Mifare completion on its way to the channel that asked for it.
type Routed = (MfcCompletionSink, MfcCompletion);

/// Clears the dispatching flag even if an observer panics.
struct Dispatching<'a>(&'a AtomicBool);

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Shared {
    inner: Mutex<Inner>,
    /// Held while touching `inner` or dispatching. Reentrant so observers
    /// may call back into the session.
    gate: ReentrantMutex<()>,
    /// Set while the gate holder dispatches; nested frames only queue.
    dispatching: AtomicBool,
    inbox: Mutex<VecDeque<TransportEvent>>,
    outbox: Mutex<VecDeque<(u64, Notification)>>,
    /// Bumped by `stop`; notifications queued before it are dropped.
    epoch: AtomicU64,
    observer: RwLock<Option<Arc<dyn SessionObserver>>>,
    min_firmware_version: String,
    logger: Logger,
}

impl Shared {
    /// Run `f` under the session lock, then publish what it queued along
    /// with every event that arrived meanwhile.
    fn locked<R>(&self, f: impl FnOnce(&mut Inner, &mut Vec<Notification>) -> R) -> R {
        let result = {
            let _gate = self.gate.lock();
            debug_assert!(
                !self.inner.is_locked(),
                "session called from inside one of its own transport requests"
            );
            let mut notes = Vec::new();
            let result = f(&mut *self.inner.lock(), &mut notes);
            self.post(notes);
            self.flush();
            result
        };
        self.drain();
        result
    }

    fn post(&self, notes: Vec<Notification>) {
        if notes.is_empty() {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.outbox
            .lock()
            .extend(notes.into_iter().map(|note| (epoch, note)));
    }

    /// Dispatch queued notifications and fold queued events until both
    /// queues are empty. The caller holds the gate but not `inner`.
    fn flush(&self) {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            return;
        }
        let _dispatching = Dispatching(&self.dispatching);
        loop {
            let next = self.outbox.lock().pop_front();
            if let Some((epoch, note)) = next {
                if epoch == self.epoch.load(Ordering::SeqCst) {
                    let observer = self.observer.read().clone();
                    if let Some(observer) = observer {
                        note.dispatch(observer.as_ref());
                    }
                }
                continue;
            }

            let Some(event) = self.inbox.lock().pop_front() else {
                break;
            };
            let mut notes = Vec::new();
            let routed = self.fold(&mut *self.inner.lock(), event, &mut notes);
            self.post(notes);
            if let Some((sink, completion)) = routed {
                if !sink.deliver(completion) {
                    debug!(self.logger, "mifare channel gone, completion discarded");
                }
            }
        }
    }

    /// Fold queued events unless another frame will: a thread holding the
    /// gate, or this thread inside a request or a callback.
    fn drain(&self) {
        loop {
            {
                let Some(_gate) = self.gate.try_lock() else {
                    return;
                };
                if self.inner.is_locked() || self.dispatching.load(Ordering::SeqCst) {
                    return;
                }
                self.flush();
            }
            if self.inbox.lock().is_empty() {
                return;
            }
        }
    }

    fn fold(&self, inner: &mut Inner, event: TransportEvent, notes: &mut Vec<Notification>) -> Option<Routed> {
        if !inner.started {
            debug!(self.logger, "session stopped, discarding {:?}", event);
            return None;
        }

        match event {
            TransportEvent::DeviceDetected { version, device_id } => {
                if inner.state.is_operational() {
                    warn!(self.logger, "ignoring additional device {} ({})", device_id, version);
                    return None;
                }
                let next = if is_firmware_supported(&version, &self.min_firmware_version) {
                    DeviceState::SessionClosed
                } else {
                    warn!(
                        self.logger,
                        "device {} firmware {} below minimum {}",
                        device_id,
                        version,
                        self.min_firmware_version
                    );
                    DeviceState::FirmwareVersionNotSupported
                };
                info!(self.logger, "device {} detected, firmware {}", device_id, version);
                inner.device = Some(DeviceInfo { version, device_id });
                inner.transition(next, notes);
            }
            TransportEvent::DeviceLost => {
                info!(self.logger, "device lost");
                inner.drop_device(notes);
            }
            TransportEvent::DeviceFault(reason) => {
                error!(self.logger, "device fault: {}", reason);
                inner.drop_device(notes);
                notes.push(Notification::Error(Error::Transport(reason)));
            }
            TransportEvent::StateChanged(state) => {
                inner.transition(state, notes);
            }
            TransportEvent::BarcodesBegin { count } => {
                if let Err(e) = inner.assembler.begin(count) {
                    warn!(self.logger, "rejecting barcode batch of {}: {}", count, e);
                    notes.push(Notification::Error(e));
                }
            }
            TransportEvent::BarcodeSlot { index, barcode } => {
                if let Err(e) = inner.assembler.set_at(index, barcode) {
                    warn!(self.logger, "dropping barcode slot {}: {}", index, e);
                }
            }
            TransportEvent::BarcodesComplete => {
                let outcome = inner.assembler.end();
                if inner.state != DeviceState::WaitingForBarcodes {
                    if outcome != AssemblyOutcome::Idle {
                        debug!(self.logger, "barcode batch arrived in state {}, discarded", inner.state);
                    }
                    return None;
                }
                match outcome {
                    AssemblyOutcome::Complete(barcodes) => {
                        notes.push(Notification::Barcodes(barcodes));
                        inner.transition(DeviceState::SessionOpened, notes);
                    }
                    AssemblyOutcome::Partial { expected, received } => {
                        notes.push(Notification::Error(Error::IncompleteBarcodeBatch {
                            expected,
                            received: received.len(),
                        }));
                        inner.transition(DeviceState::SessionOpened, notes);
                    }
                    AssemblyOutcome::Idle => {
                        warn!(self.logger, "barcodes complete without a batch");
                    }
                }
            }
            TransportEvent::PaymentTokenReceived(token) => {
                if inner.state != DeviceState::WaitingForPaymentToken {
                    debug!(self.logger, "stale payment token in state {}, discarded", inner.state);
                    return None;
                }
                let charge = inner.pending_charge.take().unwrap_or_default();
                notes.push(Notification::PaymentToken(PaymentToken { token, charge }));
                inner.transition(DeviceState::SessionOpened, notes);
            }
            TransportEvent::PaymentSucceeded => {
                if inner.state != DeviceState::WaitingForPaymentResult {
                    debug!(self.logger, "payment success in state {}, discarded", inner.state);
                    return None;
                }
                inner.pending_charge = None;
                inner.transition(DeviceState::WaitingForConfirmation, notes);
                notes.push(Notification::PaymentSuccess);
            }
            TransportEvent::PaymentFailed(error) => {
                warn!(self.logger, "payment failed: {}", error);
                inner.pending_charge = None;
                notes.push(Notification::PaymentError(error));
            }
            TransportEvent::MobileConnectionChanged(connected) => {
                inner.set_mobile_connected(connected, notes);
            }
            TransportEvent::NfcDetection(event) => {
                inner.detector.handle_event(&event);
                notes.push(Notification::Nfc(event));
            }
            TransportEvent::NfcDetectionError(error) => {
                inner.detector.handle_error(error);
                notes.push(Notification::NfcError(error));
            }
            TransportEvent::MifareOperationComplete(completion) => match inner.mifare_route.clone() {
                Some(sink) => return Some((sink, completion)),
                None => debug!(self.logger, "no mifare channel for completion, discarded"),
            },
        }
        None
    }
}

impl EventReceiver<TransportEvent> for Shared {
    fn receive(&self, event: TransportEvent) {
        self.inbox.lock().push_back(event);
        self.drain();
    }
}

/// Session with one point-of-sale device.
///
/// All methods take `&self`; the session is safe to share between the
/// caller's threads and the transport's delivery thread. The transport is
/// torn down and released when the session is dropped or [`shutdown`].
///
/// [`shutdown`]: DeviceSession::shutdown
pub struct DeviceSession {
    shared: Arc<Shared>,
}

impl DeviceSession {
    /// Stopped session owning `transport`. Nothing reaches the transport
    /// before [`start`](DeviceSession::start).
    pub fn new(transport: Box<dyn DeviceTransport>, config: SessionConfig) -> Self {
        let logger = config.log.logger("session");
        let inner = Inner {
            started: false,
            state: DeviceState::Invalid,
            transport: TransportHandle::new(transport),
            assembler: BarcodeAssembler::new(config.log.logger("barcodes")),
            detector: NfcCardDetector::new(config.log.logger("nfc")),
            mobile_connected: false,
            device: None,
            pending_charge: None,
            mifare_route: None,
            logger: logger.clone(),
        };
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                gate: ReentrantMutex::new(()),
                dispatching: AtomicBool::new(false),
                inbox: Mutex::new(VecDeque::new()),
                outbox: Mutex::new(VecDeque::new()),
                epoch: AtomicU64::new(0),
                observer: RwLock::new(None),
                min_firmware_version: config.min_firmware_version,
                logger,
            }),
        }
    }

    /// Replace the observer. Takes effect for the next callback.
    pub fn set_observer(&self, observer: Arc<dyn SessionObserver>) {
        *self.shared.observer.write() = Some(observer);
    }

    /// Drop the observer; later callbacks are discarded.
    pub fn clear_observer(&self) {
        *self.shared.observer.write() = None;
    }

    fn run(&self, f: impl FnOnce(&mut Inner, &mut Vec<Notification>) -> Result<()>) -> Result<()> {
        self.shared.locked(f)
    }

    /// Begin watching for a device. Fails if already started.
    pub fn start(&self) -> Result<()> {
        let sink = EventSink::from(&self.shared);
        self.run(|inner, notes| {
            if inner.started {
                return Err(Error::invalid_state("start", "session already started"));
            }
            info!(inner.logger, "starting device detection");
            inner.started = inner.send("start", None, notes, |t| t.detect(sink));
            Ok(())
        })
    }

    /// Tear down the transport watch. The session becomes inert (`Invalid`)
    /// until started again, and no callback fires after this returns.
    pub fn stop(&self) -> Result<()> {
        let epoch = &self.shared.epoch;
        self.run(|inner, notes| {
            if !inner.started {
                return Err(Error::invalid_state("stop", "session not started"));
            }
            inner.send("stop", None, notes, |t| t.teardown());
            epoch.fetch_add(1, Ordering::SeqCst);
            inner.drop_device(notes);
            inner.started = false;
            info!(inner.logger, "session stopped");
            Ok(())
        })
    }

    /// Open a session with the detected device (`SessionClosed` only).
    pub fn open_session(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("open_session", |s| s == DeviceState::SessionClosed)?;
            inner.send(
                "open_session",
                Some(DeviceState::SessionOpened),
                notes,
                |t| t.open_session(),
            );
            Ok(())
        })
    }

    /// Close the open session (`SessionOpened` only).
    pub fn close_session(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("close_session", |s| s == DeviceState::SessionOpened)?;
            inner.send(
                "close_session",
                Some(DeviceState::SessionClosed),
                notes,
                |t| t.close_session(),
            );
            Ok(())
        })
    }

    /// Ask the phone for its loyalty barcodes. The batch arrives through
    /// [`SessionObserver::on_barcodes`].
    pub fn request_barcodes(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("request_barcodes", |s| s == DeviceState::SessionOpened)?;
            if inner.send(
                "request_barcodes",
                Some(DeviceState::WaitingForBarcodes),
                notes,
                |t| t.request_barcodes(),
            ) {
                inner.assembler.reset();
            }
            Ok(())
        })
    }

    /// Abandon the barcode request. The observer gets
    /// [`Error::Cancelled`] for it; slots still in flight are discarded.
    pub fn cancel_barcodes(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("cancel_barcodes", |s| s == DeviceState::WaitingForBarcodes)?;
            if inner.send(
                "cancel_barcodes",
                Some(DeviceState::SessionOpened),
                notes,
                |t| t.cancel_barcodes(),
            ) {
                inner.assembler.reset();
                notes.push(Notification::Error(Error::Cancelled {
                    operation: "request_barcodes",
                }));
            }
            Ok(())
        })
    }

    /// Ask the phone for a payment token. The state is checked before the
    /// charge parameters are validated.
    pub fn create_payment_token(
        &self,
        amount_in_coins: u64,
        transaction_id: &str,
        cashier_id: &str,
        metadata: PaymentMetadata,
    ) -> Result<()> {
        let charge = ChargeRequest::new(amount_in_coins, transaction_id)
            .with_cashier_id(cashier_id)
            .with_metadata(metadata);
        self.run(|inner, notes| {
            inner.require("create_payment_token", |s| s == DeviceState::SessionOpened)?;
            charge.validate()?;
            if inner.send(
                "create_payment_token",
                Some(DeviceState::WaitingForPaymentToken),
                notes,
                |t| t.send_payment_token_request(&charge),
            ) {
                inner.pending_charge = Some(charge);
            }
            Ok(())
        })
    }

    /// Device-side payment: the device talks to the backend itself and
    /// reports `PaymentSucceeded`/`PaymentFailed`.
    pub fn create_payment(
        &self,
        amount_in_coins: u64,
        transaction_id: &str,
        cashier_id: &str,
        metadata: PaymentMetadata,
    ) -> Result<()> {
        let charge = ChargeRequest::new(amount_in_coins, transaction_id)
            .with_cashier_id(cashier_id)
            .with_metadata(metadata);
        self.run(|inner, notes| {
            inner.require("create_payment", |s| s == DeviceState::SessionOpened)?;
            charge.validate()?;
            if inner.send(
                "create_payment",
                Some(DeviceState::WaitingForPaymentResult),
                notes,
                |t| t.create_payment(&charge),
            ) {
                inner.pending_charge = Some(charge);
            }
            Ok(())
        })
    }

    /// Acknowledge a successful payment (`WaitingForConfirmation` only).
    pub fn confirm_payment(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("confirm_payment", |s| s == DeviceState::WaitingForConfirmation)?;
            inner.send(
                "confirm_payment",
                Some(DeviceState::SessionClosed),
                notes,
                |t| t.confirm_payment(),
            );
            Ok(())
        })
    }

    /// Abandon the payment exchange in flight. The observer gets
    /// [`Error::Cancelled`] for it; late results are discarded.
    pub fn cancel_payment(&self) -> Result<()> {
        self.run(|inner, notes| {
            inner.require("cancel_payment", |s| {
                matches!(
                    s,
                    DeviceState::WaitingForPaymentToken
                        | DeviceState::WaitingForPaymentResult
                        | DeviceState::WaitingForConfirmation
                )
            })?;
            let token_flow = inner.state == DeviceState::WaitingForPaymentToken;
            if inner.send(
                "cancel_payment",
                Some(DeviceState::SessionOpened),
                notes,
                |t| {
                    if token_flow {
                        t.cancel_payment_token_request()
                    } else {
                        t.cancel_payment()
                    }
                },
            ) {
                inner.pending_charge = None;
                let operation = if token_flow {
                    "create_payment_token"
                } else {
                    "create_payment"
                };
                notes.push(Notification::Error(Error::Cancelled { operation }));
            }
            Ok(())
        })
    }

    fn radio(&self, operation: &'static str, request: impl FnOnce(&mut dyn DeviceTransport) -> Result<()>) -> Result<()> {
        self.run(|inner, notes| {
            inner.require(operation, |s| {
                s != DeviceState::Invalid && s != DeviceState::SessionOpened
            })?;
            inner.send(operation, None, notes, request);
            Ok(())
        })
    }

    /// Turn the device's NFC reader on.
    pub fn enable_nfc(&self) -> Result<()> {
        self.radio("enable_nfc", |t| t.set_nfc_enabled(true))
    }

    /// Turn the device's NFC reader off.
    pub fn disable_nfc(&self) -> Result<()> {
        self.radio("disable_nfc", |t| t.set_nfc_enabled(false))
    }

    /// Turn the device's Bluetooth radio on.
    pub fn enable_bluetooth(&self) -> Result<()> {
        self.radio("enable_bluetooth", |t| t.set_bluetooth_enabled(true))
    }

    /// Turn the device's Bluetooth radio off.
    pub fn disable_bluetooth(&self) -> Result<()> {
        self.radio("disable_bluetooth", |t| t.set_bluetooth_enabled(false))
    }

    /// Current published state.
    pub fn state(&self) -> DeviceState {
        self.shared.locked(|inner, _| inner.state)
    }

    /// Whether `start` succeeded and `stop` has not been called since.
    pub fn is_started(&self) -> bool {
        self.shared.locked(|inner, _| inner.started)
    }

    /// Whether a phone is connected to the device.
    pub fn is_mobile_connected(&self) -> bool {
        self.shared.locked(|inner, _| inner.mobile_connected)
    }

    /// `None` until a device has been detected.
    pub fn device_id(&self) -> Option<u64> {
        self.shared
            .locked(|inner, _| inner.device.as_ref().map(|d| d.device_id))
    }

    /// Firmware version; `None` until a device has been detected.
    pub fn version(&self) -> Option<String> {
        self.shared
            .locked(|inner, _| inner.device.as_ref().map(|d| d.version.clone()))
    }

    /// Identity of the detected device.
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.shared.locked(|inner, _| inner.device.clone())
    }

    /// Handle on the NFC detector fed by this session.
    pub fn detector(&self) -> NfcCardDetector {
        self.shared.locked(|inner, _| inner.detector.clone())
    }

    /// The card currently in the NFC field.
    pub fn nfc_card_info(&self) -> Result<CardInfo> {
        self.detector()
            .card()
            .ok_or_else(|| Error::invalid_state("nfc_card_info", "no card detected"))
    }

    /// Open a block channel to the Mifare Classic card in the field.
    /// Completions the device reports through this session are routed to
    /// the most recently created channel.
    pub fn mifare_channel(&self, transport: Box<dyn MifareTransport>) -> Result<MifareClassicChannel> {
        self.shared.locked(|inner, _| {
            if !inner.detector.is_mifare_classic_present() {
                return Err(Error::invalid_state(
                    "mifare_channel",
                    "no Mifare Classic card detected",
                ));
            }
            let channel = MifareClassicChannel::new(
                transport,
                inner.detector.clone(),
                inner.logger.clone(),
            );
            inner.mifare_route = Some(channel.completion_sink());
            Ok(channel)
        })
    }

    /// Stop (if started) and release the transport now.
    pub fn shutdown(self) {
        drop(self)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        let epoch = &self.shared.epoch;
        self.shared.locked(|inner, _| {
            if inner.started {
                inner.started = false;
                epoch.fetch_add(1, Ordering::SeqCst);
                if let Err(e) = inner.transport.teardown() {
                    warn!(inner.logger, "teardown on drop failed: {}", e);
                }
            }
        });
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.shared.locked(|inner, _| {
            f.debug_struct("DeviceSession")
                .field("started", &inner.started)
                .field("state", &inner.state)
                .field("device", &inner.device)
                .finish()
        })
    }
}
