// libbeep/src/config.rs

//! Constructor-injected configuration for sessions and payment clients.

use derive_more::Display;

use crate::constants::DEFAULT_MIN_FIRMWARE_VERSION;
use crate::logging::LogConfig;

/// Settings for a [`DeviceSession`](crate::device::DeviceSession).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Devices reporting an older firmware end in
    /// `DeviceState::FirmwareVersionNotSupported`.
    pub min_firmware_version: String,
    /// Logging for the session and its components.
    pub log: LogConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_firmware_version: DEFAULT_MIN_FIRMWARE_VERSION.to_string(),
            log: LogConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Override the minimum firmware version.
    pub fn with_min_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.min_firmware_version = version.into();
        self
    }

    /// Override logging.
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Payment backend environment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Sandbox backend.
    #[default]
    Development,
    /// Live backend.
    Production,
}

/// Settings for a [`PaymentClient`](crate::payment::PaymentClient).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PaymentConfig {
    /// Backend the client talks to.
    pub environment: Environment,
    /// Opaque merchant credential handed to the payment transport.
    pub merchant_credential: String,
    /// Logging for the client.
    pub log: LogConfig,
}

impl PaymentConfig {
    /// Config for `environment` with default logging.
    pub fn new(environment: Environment, merchant_credential: impl Into<String>) -> Self {
        Self {
            environment,
            merchant_credential: merchant_credential.into(),
            log: LogConfig::default(),
        }
    }

    /// Override logging.
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

impl std::fmt::Debug for PaymentConfig {
    // keep the merchant credential out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("environment", &self.environment)
            .field("merchant_credential", &"<redacted>")
            .field("log", &self.log)
            .finish()
    }
}
