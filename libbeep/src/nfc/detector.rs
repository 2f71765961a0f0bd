// libbeep/src/nfc/detector.rs

//! NFC card presence tracking.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::logging::{Logger, info, warn};
use crate::types::{CardInfo, DetectionError, DetectionEvent};

#[derive(Debug, Default)]
struct Presence {
    card: Option<CardInfo>,
    last_error: Option<DetectionError>,
}

/// Two-state presence tracker: no card, or one card with its
/// classification. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct NfcCardDetector {
    presence: Arc<RwLock<Presence>>,
    logger: Logger,
}

impl NfcCardDetector {
    /// Tracker with no card present.
    pub fn new(logger: Logger) -> Self {
        Self {
            presence: Arc::default(),
            logger,
        }
    }

    /// Fold a detection event into the presence state.
    pub fn handle_event(&self, event: &DetectionEvent) {
        let mut presence = self.presence.write();
        match event {
            DetectionEvent::Detected { card_info } => {
                info!(
                    self.logger,
                    "card detected: {} {}",
                    card_info.card_type,
                    card_info.meta
                );
                presence.card = Some(card_info.clone());
            }
            DetectionEvent::Removed => {
                if presence.card.take().is_some() {
                    info!(self.logger, "card removed");
                }
            }
        }
    }

    /// Record a classification failure. Presence is left untouched.
    pub fn handle_error(&self, error: DetectionError) {
        warn!(self.logger, "card detection error: {}", error);
        self.presence.write().last_error = Some(error);
    }

    /// The card in the field, if any.
    pub fn card(&self) -> Option<CardInfo> {
        self.presence.read().card.clone()
    }

    /// Whether any card is in the field.
    pub fn is_card_present(&self) -> bool {
        self.presence.read().card.is_some()
    }

    /// True when the card in the field is a Mifare Classic 1K/4K.
    pub fn is_mifare_classic_present(&self) -> bool {
        self.presence
            .read()
            .card
            .as_ref()
            .map(|c| c.card_type.is_mifare_classic())
            .unwrap_or(false)
    }

    /// Most recent classification failure.
    pub fn last_error(&self) -> Option<DetectionError> {
        self.presence.read().last_error
    }

    /// Forget everything, e.g. when the device is lost.
    pub fn reset(&self) {
        let mut presence = self.presence.write();
        presence.card = None;
        presence.last_error = None;
    }
}
