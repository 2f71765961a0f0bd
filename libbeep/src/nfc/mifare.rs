// libbeep/src/nfc/mifare.rs

//! Block operations on Mifare Classic cards.
//!
//! The reader is half-duplex per card: a channel carries at most one
//! outstanding operation and rejects a second one instead of queueing it.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::constants::MFC_BLOCK_SIZE;
use crate::logging::{Logger, debug, warn};
use crate::nfc::NfcCardDetector;
use crate::transport::{EventReceiver, MfcCompletion, MfcCompletionSink, MifareTransport, TransportHandle};
use crate::types::{MfcBlockData, MfcKey, MfcKeyType, MfcOperationError};
use crate::{Error, Result};

/// Outcome of a block read.
pub type MfcReadResult = std::result::Result<MfcBlockData, MfcOperationError>;
/// Outcome of a block write.
pub type MfcWriteResult = std::result::Result<(), MfcOperationError>;

/// Receives the outcome of every accepted block operation, exactly once.
/// May be called on the thread that issued the operation.
pub trait MifareObserver: Send + Sync {
    /// A read finished.
    fn on_read_result(&self, _block_no: u8, _result: MfcReadResult) {}
    /// A write finished.
    fn on_write_result(&self, _block_no: u8, _result: MfcWriteResult) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Read { block_no: u8 },
    Write { block_no: u8 },
}

#[derive(Debug)]
enum Outcome {
    Read(u8, MfcReadResult),
    Write(u8, MfcWriteResult),
}

impl Outcome {
    fn failed(op: PendingOp, error: MfcOperationError) -> Self {
        match op {
            PendingOp::Read { block_no } => Outcome::Read(block_no, Err(error)),
            PendingOp::Write { block_no } => Outcome::Write(block_no, Err(error)),
        }
    }

    /// Map a transport completion onto the pending operation.
    fn resolve(op: PendingOp, completion: MfcCompletion) -> Self {
        match (op, completion) {
            (PendingOp::Read { block_no }, MfcCompletion::Read { data }) => {
                if data.len() != MFC_BLOCK_SIZE {
                    return Outcome::Read(block_no, Err(MfcOperationError::DataSize));
                }
                let block = MfcBlockData::new(i32::from(block_no), &data)
                    .map_err(|_| MfcOperationError::DataSize);
                Outcome::Read(block_no, block)
            }
            (PendingOp::Write { block_no }, MfcCompletion::Written) => {
                Outcome::Write(block_no, Ok(()))
            }
            (op, MfcCompletion::Failed { code }) => {
                Outcome::failed(op, MfcOperationError::from_code(code))
            }
            (op, _) => Outcome::failed(op, MfcOperationError::Unknown),
        }
    }

    fn dispatch(self, observer: &dyn MifareObserver) {
        match self {
            Outcome::Read(block_no, result) => observer.on_read_result(block_no, result),
            Outcome::Write(block_no, result) => observer.on_write_result(block_no, result),
        }
    }
}

struct ChannelShared {
    /// Never held while publishing, so completions may arrive from inside
    /// a request.
    transport: Mutex<TransportHandle<dyn MifareTransport>>,
    pending: Mutex<Option<PendingOp>>,
    observer: RwLock<Option<Arc<dyn MifareObserver>>>,
    detector: NfcCardDetector,
    logger: Logger,
}

impl ChannelShared {
    fn publish(&self, outcome: Outcome) {
        let observer = self.observer.read().clone();
        match observer {
            Some(observer) => outcome.dispatch(observer.as_ref()),
            None => debug!(self.logger, "no mifare observer for {:?}", outcome),
        }
    }
}

impl EventReceiver<MfcCompletion> for ChannelShared {
    fn receive(&self, completion: MfcCompletion) {
        let Some(op) = self.pending.lock().take() else {
            debug!(self.logger, "mifare completion with nothing pending, discarded");
            return;
        };
        self.publish(Outcome::resolve(op, completion));
    }
}

/// Block channel to the Mifare Classic card currently in the field.
/// Owns its transport; released when the channel is dropped or
/// [`shutdown`](MifareClassicChannel::shutdown).
pub struct MifareClassicChannel {
    shared: Arc<ChannelShared>,
}

impl MifareClassicChannel {
    /// Channel over `transport`, gated on `detector` seeing a Mifare
    /// Classic card.
    pub fn new(transport: Box<dyn MifareTransport>, detector: NfcCardDetector, logger: Logger) -> Self {
        let shared = Arc::new(ChannelShared {
            transport: Mutex::new(TransportHandle::new(transport)),
            pending: Mutex::new(None),
            observer: RwLock::new(None),
            detector,
            logger,
        });
        let sink = MfcCompletionSink::from(&shared);
        shared.transport.lock().attach(sink);
        Self { shared }
    }

    /// Replace the observer.
    pub fn set_observer(&self, observer: Arc<dyn MifareObserver>) {
        *self.shared.observer.write() = Some(observer);
    }

    /// Drop the observer; later outcomes are only logged.
    pub fn clear_observer(&self) {
        *self.shared.observer.write() = None;
    }

    /// Sink for completions that arrive through another component.
    pub fn completion_sink(&self) -> MfcCompletionSink {
        MfcCompletionSink::from(&self.shared)
    }

    /// Whether an operation is outstanding.
    pub fn is_busy(&self) -> bool {
        self.shared.pending.lock().is_some()
    }

    /// Read one 16-byte block. The result arrives through
    /// [`MifareObserver::on_read_result`].
    pub fn read_block(&self, block_no: u8, key: &MfcKey) -> Result<()> {
        self.issue("read_block", PendingOp::Read { block_no }, key, |t| {
            t.read_block(block_no, key)
        })
    }

    /// Write one block. The result arrives through
    /// [`MifareObserver::on_write_result`].
    pub fn write_block(&self, data: &MfcBlockData, key: &MfcKey) -> Result<()> {
        let op = PendingOp::Write {
            block_no: data.block_no(),
        };
        self.issue("write_block", op, key, |t| t.write_block(data, key))
    }

    fn issue(
        &self,
        operation: &'static str,
        op: PendingOp,
        key: &MfcKey,
        request: impl FnOnce(&mut dyn MifareTransport) -> Result<()>,
    ) -> Result<()> {
        if !self.shared.detector.is_mifare_classic_present() {
            return Err(Error::invalid_state(
                operation,
                "no Mifare Classic card detected",
            ));
        }
        if key.key_type() == MfcKeyType::None {
            return Err(MfcOperationError::KeyParamInvalid.into());
        }

        {
            let mut pending = self.shared.pending.lock();
            if pending.is_some() {
                return Err(Error::invalid_state(operation, "operation already pending"));
            }
            *pending = Some(op);
        }

        let result = request(&mut **self.shared.transport.lock());
        if let Err(e) = result {
            warn!(self.shared.logger, "{} rejected by reader: {}", operation, e);
            let cleared = {
                let mut pending = self.shared.pending.lock();
                let ours = *pending == Some(op);
                if ours {
                    *pending = None;
                }
                ours
            };
            if cleared {
                self.shared
                    .publish(Outcome::failed(op, MfcOperationError::Interrupted));
            }
        }
        Ok(())
    }

    /// Release the reader transport now.
    pub fn shutdown(self) {
        drop(self)
    }
}

impl std::fmt::Debug for MifareClassicChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MifareClassicChannel")
            .field("busy", &self.is_busy())
            .finish()
    }
}
