// libbeep/src/transport/traits.rs

//! Traits implemented by platform transports.

use crate::config::PaymentConfig;
use crate::payment::{BackendResponse, PaymentRequest, RefundRequest, StatusQuery};
use crate::transport::events::{EventSink, MfcCompletionSink, Reply};
use crate::types::{ChargeRequest, MfcBlockData, MfcKey};
use crate::{Error, Result};

/// Common resource behaviour of every transport: an owned native handle
/// that must be released exactly once. See
/// [`TransportHandle`](crate::transport::TransportHandle).
pub trait TransportResource: Send {
    /// Release the underlying handle. Called once by the owning handle.
    fn release(&mut self) {}
}

/// Device transport abstracts the Bluetooth/HID link away from the session
/// state machine. Every method is a non-blocking request; results come back
/// as [`TransportEvent`](crate::transport::TransportEvent)s through the sink
/// given to [`detect`](DeviceTransport::detect).
///
/// Events may be delivered from any thread, including from inside one of
/// these methods before it returns; the session queues them and folds them
/// once the request is done. A transport must not call back into the
/// session itself from inside a request.
pub trait DeviceTransport: TransportResource {
    /// Start watching for devices. Events are delivered through `events`.
    fn detect(&mut self, events: EventSink) -> Result<()>;

    /// Stop watching and drop any connection.
    fn teardown(&mut self) -> Result<()>;

    /// Open a session with the phone.
    fn open_session(&mut self) -> Result<()>;

    /// Close the phone session.
    fn close_session(&mut self) -> Result<()>;

    /// Ask the phone for its barcodes.
    fn request_barcodes(&mut self) -> Result<()>;

    /// Abandon the barcode request.
    fn cancel_barcodes(&mut self) -> Result<()>;

    /// Ask the phone for a payment token for `charge`.
    fn send_payment_token_request(&mut self, charge: &ChargeRequest) -> Result<()>;

    /// Abandon the token request.
    fn cancel_payment_token_request(&mut self) -> Result<()>;

    /// Device-side payment. Transports without it reject the request.
    fn create_payment(&mut self, _charge: &ChargeRequest) -> Result<()> {
        Err(Error::Transport("device-side payment not supported".into()))
    }

    /// Acknowledge a device-side payment.
    fn confirm_payment(&mut self) -> Result<()> {
        Err(Error::Transport("device-side payment not supported".into()))
    }

    /// Abandon whatever payment exchange is in flight. Defaults to the
    /// token-request cancellation.
    fn cancel_payment(&mut self) -> Result<()> {
        self.cancel_payment_token_request()
    }

    /// Switch the NFC reader.
    fn set_nfc_enabled(&mut self, _enabled: bool) -> Result<()> {
        Err(Error::Transport("NFC control not supported".into()))
    }

    /// Switch the Bluetooth radio.
    fn set_bluetooth_enabled(&mut self, _enabled: bool) -> Result<()> {
        Err(Error::Transport("bluetooth control not supported".into()))
    }
}

/// Block-level access to a Mifare Classic card in the reader field.
pub trait MifareTransport: TransportResource {
    /// Called once when the owning channel is built. Transports that report
    /// completions on their own (rather than through the device event
    /// stream) keep the sink.
    fn attach(&mut self, _completions: MfcCompletionSink) {}

    /// Start reading one block.
    fn read_block(&mut self, block_no: u8, key: &MfcKey) -> Result<()>;

    /// Start writing one block.
    fn write_block(&mut self, data: &MfcBlockData, key: &MfcKey) -> Result<()>;
}

/// Payment backend. Requests are answered later through the given reply.
pub trait PaymentTransport: TransportResource {
    /// Hand the environment and merchant credential to the backend.
    fn bind(&mut self, _config: &PaymentConfig) -> Result<()> {
        Ok(())
    }

    /// Simple payment.
    fn submit_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()>;

    /// Payment split by its metadata.
    fn submit_partial_payment(
        &mut self,
        request: &PaymentRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()>;

    /// Refund by backend transaction id.
    fn submit_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()>;

    /// Refund by payment request uid (partial payments only).
    fn submit_partial_refund(
        &mut self,
        request: &RefundRequest,
        reply: Reply<BackendResponse>,
    ) -> Result<()>;

    /// Look up the processing status of an earlier payment. The answer
    /// carries the status in [`BackendResponse::status`].
    fn submit_status_query(
        &mut self,
        _query: &StatusQuery,
        _reply: Reply<BackendResponse>,
    ) -> Result<()> {
        Err(Error::Transport("payment status query not supported".into()))
    }
}
