// libbeep/src/device/assembler.rs

//! Reassembly of barcode batches delivered slot by slot.

use crate::constants::MAX_BARCODE_BATCH;
use crate::logging::{Logger, debug, warn};
use crate::types::Barcode;
use crate::{Error, Result, ValidationError};

/// Fixed-length batch filled one slot at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeBatch {
    slots: Vec<Option<Barcode>>,
}

impl BarcodeBatch {
    /// Empty batch of `size` slots. Sizes above [`MAX_BARCODE_BATCH`] are
    /// rejected before anything is allocated.
    pub fn new(size: usize) -> Result<Self> {
        if size > MAX_BARCODE_BATCH {
            return Err(ValidationError::OutOfRange {
                value: i64::try_from(size).unwrap_or(i64::MAX),
                min: 0,
                max: MAX_BARCODE_BATCH as i64 + 1,
            }
            .into());
        }
        Ok(Self {
            slots: vec![None; size],
        })
    }

    /// Number of slots, filled or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True for a zero-slot batch.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fill slot `index`, replacing whatever it held.
    pub fn set_at(&mut self, index: usize, barcode: Barcode) -> Result<()> {
        let size = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(barcode);
                Ok(())
            }
            None => Err(ValidationError::IndexOutOfRange { index, size }.into()),
        }
    }

    /// Number of slots filled so far.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True once every slot is filled.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The barcodes in index order, once every slot is filled.
    pub fn complete(&self) -> Result<Vec<Barcode>> {
        if !self.is_complete() {
            return Err(Error::IncompleteBarcodeBatch {
                expected: self.len(),
                received: self.filled(),
            });
        }
        Ok(self.slots.iter().flatten().cloned().collect())
    }

    /// Only the slots actually filled, in index order.
    pub fn received(&self) -> Vec<Barcode> {
        self.slots.iter().flatten().cloned().collect()
    }
}

/// Result of closing a batch with [`BarcodeAssembler::end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// Every slot was filled.
    Complete(Vec<Barcode>),
    /// The batch ended early. `received` never contains invented entries.
    Partial {
        /// Slot count announced by `begin`.
        expected: usize,
        /// Filled slots in index order.
        received: Vec<Barcode>,
    },
    /// `end` without a matching `begin`.
    Idle,
}

impl AssemblyOutcome {
    /// True for [`AssemblyOutcome::Complete`].
    pub fn is_success(&self) -> bool {
        matches!(self, AssemblyOutcome::Complete(_))
    }
}

/// Holds at most one in-flight [`BarcodeBatch`].
#[derive(Debug, Default)]
pub struct BarcodeAssembler {
    batch: Option<BarcodeBatch>,
    logger: Logger,
}

impl BarcodeAssembler {
    /// Idle assembler logging through `logger`.
    pub fn new(logger: Logger) -> Self {
        Self {
            batch: None,
            logger,
        }
    }

    /// Start a batch of `count` slots, discarding any unfinished one. An
    /// oversized count leaves the assembler idle.
    pub fn begin(&mut self, count: usize) -> Result<()> {
        if let Some(old) = self.batch.take() {
            warn!(
                self.logger,
                "discarding unfinished barcode batch ({}/{} slots)",
                old.filled(),
                old.len()
            );
        }
        let batch = BarcodeBatch::new(count)?;
        debug!(self.logger, "barcode batch started, expecting {}", count);
        self.batch = Some(batch);
        Ok(())
    }

    /// Fill a slot of the batch in flight.
    pub fn set_at(&mut self, index: usize, barcode: Barcode) -> Result<()> {
        match self.batch.as_mut() {
            Some(batch) => batch.set_at(index, barcode),
            None => Err(Error::invalid_state("set_at", "no barcode batch in flight")),
        }
    }

    /// Close the current batch and clear the assembler.
    pub fn end(&mut self) -> AssemblyOutcome {
        let Some(batch) = self.batch.take() else {
            return AssemblyOutcome::Idle;
        };

        match batch.complete() {
            Ok(barcodes) => {
                debug!(self.logger, "barcode batch complete: {} barcodes", barcodes.len());
                AssemblyOutcome::Complete(barcodes)
            }
            Err(_) => {
                let received = batch.received();
                warn!(
                    self.logger,
                    "barcode batch ended early: expected {}, got {}",
                    batch.len(),
                    received.len()
                );
                AssemblyOutcome::Partial {
                    expected: batch.len(),
                    received,
                }
            }
        }
    }

    /// Drop the batch in flight, if any.
    pub fn reset(&mut self) {
        self.batch = None;
    }

    /// True between `begin` and `end`.
    pub fn is_in_progress(&self) -> bool {
        self.batch.is_some()
    }
}
