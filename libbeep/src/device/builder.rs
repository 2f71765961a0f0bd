// libbeep/src/device/builder.rs

//! Builder for [`DeviceSession`](crate::device::DeviceSession).

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::device::observer::SessionObserver;
use crate::device::session::DeviceSession;
use crate::transport::DeviceTransport;
use crate::{Error, Result};

/// Helper to construct a DeviceSession with optional configuration.
#[derive(Default)]
pub struct DeviceSessionBuilder {
    transport: Option<Box<dyn DeviceTransport>>,
    config: SessionConfig,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl DeviceSessionBuilder {
    /// Builder with default configuration and no transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the device transport (e.g. MockDeviceTransport)
    pub fn with_transport(mut self, transport: Box<dyn DeviceTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Session configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Observer installed before the session is returned.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Consume the builder and return a stopped session.
    /// Requires a transport to be provided; otherwise returns TransportMissing.
    pub fn build(self) -> Result<DeviceSession> {
        let transport = self.transport.ok_or(Error::TransportMissing)?;
        let session = DeviceSession::new(transport, self.config);
        if let Some(observer) = self.observer {
            session.set_observer(observer);
        }
        Ok(session)
    }
}
