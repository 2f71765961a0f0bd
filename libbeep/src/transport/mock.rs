// libbeep/src/transport/mock.rs

//! In-memory transports for tests and demos. Each mock is a cheap clone
//! over shared state, so a test can hand one copy to a component and keep
//! another to inspect recorded calls and inject events.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PaymentConfig;
use crate::payment::{BackendResponse, PaymentRequest, RefundRequest, StatusQuery};
use crate::transport::events::{EventSink, MfcCompletion, MfcCompletionSink, Reply, TransportEvent};
use crate::transport::traits::{DeviceTransport, MifareTransport, PaymentTransport, TransportResource};
use crate::types::{ChargeRequest, MfcBlockData, MfcKey};
use crate::{Error, Result};

/// A request recorded by [`MockDeviceTransport`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Detect,
    Teardown,
    OpenSession,
    CloseSession,
    RequestBarcodes,
    CancelBarcodes,
    SendPaymentTokenRequest(ChargeRequest),
    CancelPaymentTokenRequest,
    CreatePayment(ChargeRequest),
    ConfirmPayment,
    CancelPayment,
    SetNfcEnabled(bool),
    SetBluetoothEnabled(bool),
}

#[derive(Debug, Default)]
struct DeviceLog {
    calls: Vec<DeviceCall>,
    sink: Option<EventSink>,
    inline: VecDeque<TransportEvent>,
    failures: usize,
    released: usize,
}

/// Mock device transport. Records requests and forwards injected events to
/// the sink captured by `detect`.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceTransport {
    log: Arc<Mutex<DeviceLog>>,
}

impl MockDeviceTransport {
    /// Fresh mock with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` requests fail synchronously (for tests).
    pub fn set_failures(&self, n: usize) {
        self.log.lock().failures = n;
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.log.lock().calls.clone()
    }

    /// Most recent request.
    pub fn last_call(&self) -> Option<DeviceCall> {
        self.log.lock().calls.last().cloned()
    }

    /// Forget recorded requests.
    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }

    /// How often the mock was released.
    pub fn release_count(&self) -> usize {
        self.log.lock().released
    }

    /// True while a sink from `detect` is held and its receiver is alive.
    pub fn is_detecting(&self) -> bool {
        self.log
            .lock()
            .sink
            .as_ref()
            .map(|s| s.is_connected())
            .unwrap_or(false)
    }

    /// Deliver an event as if it came from the device. Returns `false` when
    /// nobody is listening.
    pub fn emit(&self, event: TransportEvent) -> bool {
        // deliver outside our own lock: the receiver may call back into us
        let sink = self.log.lock().sink.clone();
        match sink {
            Some(sink) => sink.deliver(event),
            None => false,
        }
    }

    /// Emit `DeviceDetected` for a device.
    pub fn detect_device(&self, version: &str, device_id: u64) -> bool {
        self.emit(TransportEvent::DeviceDetected {
            version: version.to_string(),
            device_id,
        })
    }

    /// Queue an event that the next accepted request delivers from the
    /// caller's thread before it returns, like a link that reports an
    /// already attached device from inside `detect`.
    pub fn deliver_inline(&self, event: TransportEvent) {
        self.log.lock().inline.push_back(event);
    }

    fn flush_inline(&self) {
        let (sink, events) = {
            let mut log = self.log.lock();
            (log.sink.clone(), std::mem::take(&mut log.inline))
        };
        if let Some(sink) = sink {
            for event in events {
                sink.deliver(event);
            }
        }
    }

    fn accept(&self, call: DeviceCall) -> Result<()> {
        self.record(call)?;
        self.flush_inline();
        Ok(())
    }

    fn record(&self, call: DeviceCall) -> Result<()> {
        let mut log = self.log.lock();
        log.calls.push(call);
        if log.failures > 0 {
            log.failures -= 1;
            return Err(Error::Transport("mock device rejected request".into()));
        }
        Ok(())
    }
}

impl TransportResource for MockDeviceTransport {
    fn release(&mut self) {
        let mut log = self.log.lock();
        log.released += 1;
        log.sink = None;
    }
}

impl DeviceTransport for MockDeviceTransport {
    fn detect(&mut self, events: EventSink) -> Result<()> {
        self.record(DeviceCall::Detect)?;
        self.log.lock().sink = Some(events);
        self.flush_inline();
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        let result = self.accept(DeviceCall::Teardown);
        self.log.lock().sink = None;
        result
    }

    fn open_session(&mut self) -> Result<()> {
        self.accept(DeviceCall::OpenSession)
    }

    fn close_session(&mut self) -> Result<()> {
        self.accept(DeviceCall::CloseSession)
    }

    fn request_barcodes(&mut self) -> Result<()> {
        self.accept(DeviceCall::RequestBarcodes)
    }

    fn cancel_barcodes(&mut self) -> Result<()> {
        self.accept(DeviceCall::CancelBarcodes)
    }

    fn send_payment_token_request(&mut self, charge: &ChargeRequest) -> Result<()> {
        self.accept(DeviceCall::SendPaymentTokenRequest(charge.clone()))
    }

    fn cancel_payment_token_request(&mut self) -> Result<()> {
        self.accept(DeviceCall::CancelPaymentTokenRequest)
    }

    fn create_payment(&mut self, charge: &ChargeRequest) -> Result<()> {
        self.accept(DeviceCall::CreatePayment(charge.clone()))
    }

    fn confirm_payment(&mut self) -> Result<()> {
        self.accept(DeviceCall::ConfirmPayment)
    }

    fn cancel_payment(&mut self) -> Result<()> {
        self.accept(DeviceCall::CancelPayment)
    }

    fn set_nfc_enabled(&mut self, enabled: bool) -> Result<()> {
        self.accept(DeviceCall::SetNfcEnabled(enabled))
    }

    fn set_bluetooth_enabled(&mut self, enabled: bool) -> Result<()> {
        self.accept(DeviceCall::SetBluetoothEnabled(enabled))
    }
}

/// A request recorded by [`MockMifareTransport`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MifareCall {
    Read { block_no: u8, key: MfcKey },
    Write { data: MfcBlockData, key: MfcKey },
}

#[derive(Debug, Default)]
struct MifareLog {
    calls: Vec<MifareCall>,
    sink: Option<MfcCompletionSink>,
    inline: Option<MfcCompletion>,
    failures: usize,
    released: usize,
}

/// Mock Mifare transport. Completions are injected with [`complete`].
///
/// [`complete`]: MockMifareTransport::complete
#[derive(Debug, Clone, Default)]
pub struct MockMifareTransport {
    log: Arc<Mutex<MifareLog>>,
}

impl MockMifareTransport {
    /// Fresh mock with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` requests fail synchronously.
    pub fn set_failures(&self, n: usize) {
        self.log.lock().failures = n;
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<MifareCall> {
        self.log.lock().calls.clone()
    }

    /// How often the mock was released.
    pub fn release_count(&self) -> usize {
        self.log.lock().released
    }

    /// Report completion of the outstanding block operation.
    pub fn complete(&self, completion: MfcCompletion) -> bool {
        let sink = self.log.lock().sink.clone();
        match sink {
            Some(sink) => sink.deliver(completion),
            None => false,
        }
    }

    /// Complete the next accepted operation from inside the request itself.
    pub fn complete_inline(&self, completion: MfcCompletion) {
        self.log.lock().inline = Some(completion);
    }

    fn record(&self, call: MifareCall) -> Result<()> {
        let inline = {
            let mut log = self.log.lock();
            log.calls.push(call);
            if log.failures > 0 {
                log.failures -= 1;
                return Err(Error::Transport("mock reader rejected request".into()));
            }
            log.inline.take()
        };
        if let Some(completion) = inline {
            self.complete(completion);
        }
        Ok(())
    }
}

impl TransportResource for MockMifareTransport {
    fn release(&mut self) {
        let mut log = self.log.lock();
        log.released += 1;
        log.sink = None;
    }
}

impl MifareTransport for MockMifareTransport {
    fn attach(&mut self, completions: MfcCompletionSink) {
        self.log.lock().sink = Some(completions);
    }

    fn read_block(&mut self, block_no: u8, key: &MfcKey) -> Result<()> {
        self.record(MifareCall::Read {
            block_no,
            key: *key,
        })
    }

    fn write_block(&mut self, data: &MfcBlockData, key: &MfcKey) -> Result<()> {
        self.record(MifareCall::Write {
            data: *data,
            key: *key,
        })
    }
}

/// A request recorded by [`MockPaymentTransport`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCall {
    Payment(PaymentRequest),
    PartialPayment(PaymentRequest),
    Refund(RefundRequest),
    PartialRefund(RefundRequest),
    StatusQuery(StatusQuery),
}

#[derive(Debug, Default)]
struct PaymentLog {
    bound: Option<PaymentConfig>,
    calls: Vec<PaymentCall>,
    pending: VecDeque<Reply<BackendResponse>>,
    failures: usize,
    released: usize,
}

/// Mock payment backend. Replies are queued in submission order and
/// answered with [`respond`].
///
/// [`respond`]: MockPaymentTransport::respond
#[derive(Debug, Clone, Default)]
pub struct MockPaymentTransport {
    log: Arc<Mutex<PaymentLog>>,
}

impl MockPaymentTransport {
    /// Fresh mock with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` requests fail synchronously.
    pub fn set_failures(&self, n: usize) {
        self.log.lock().failures = n;
    }

    /// Config passed to `bind`.
    pub fn bound_config(&self) -> Option<PaymentConfig> {
        self.log.lock().bound.clone()
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<PaymentCall> {
        self.log.lock().calls.clone()
    }

    /// Requests still waiting for a response.
    pub fn pending(&self) -> usize {
        self.log.lock().pending.len()
    }

    /// How often the mock was released.
    pub fn release_count(&self) -> usize {
        self.log.lock().released
    }

    /// Answer the oldest outstanding request. Returns `false` if none.
    pub fn respond(&self, response: BackendResponse) -> bool {
        let reply = self.log.lock().pending.pop_front();
        match reply {
            Some(reply) => {
                reply.complete(response);
                true
            }
            None => false,
        }
    }

    fn record(&self, call: PaymentCall, reply: Reply<BackendResponse>) -> Result<()> {
        let mut log = self.log.lock();
        log.calls.push(call);
        if log.failures > 0 {
            log.failures -= 1;
            return Err(Error::Transport("mock backend unreachable".into()));
        }
        log.pending.push_back(reply);
        Ok(())
    }
}

impl TransportResource for MockPaymentTransport {
    fn release(&mut self) {
        let mut log = self.log.lock();
        log.released += 1;
        log.pending.clear();
    }
}

impl PaymentTransport for MockPaymentTransport {
    fn bind(&mut self, config: &PaymentConfig) -> Result<()> {
        let mut log = self.log.lock();
        if log.failures > 0 {
            log.failures -= 1;
            return Err(Error::Transport("mock backend refused credentials".into()));
        }
        log.bound = Some(config.clone());
        Ok(())
    }

    fn submit_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.record(PaymentCall::Payment(request.clone()), reply)
    }

    fn submit_partial_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.record(PaymentCall::PartialPayment(request.clone()), reply)
    }

    fn submit_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.record(PaymentCall::Refund(request.clone()), reply)
    }

    fn submit_partial_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.record(PaymentCall::PartialRefund(request.clone()), reply)
    }

    fn submit_status_query(
        &mut self,
        query: &StatusQuery,
        reply: Reply<BackendResponse>,
    ) -> Result<()> {
        self.record(PaymentCall::StatusQuery(query.clone()), reply)
    }
}
