// Shared helpers for the integration tests. Each aggregator pulls this in
// with `#[path = "../common/mod.rs"] mod common;`.
#![allow(dead_code)]


pub mod helpers {
    use std::sync::Arc;

    use libbeep::test_support::{started_mock_session, RecordingObserver};
    use libbeep::transport::{MockDeviceTransport, TransportEvent};
    use libbeep::{DeviceSession, DeviceState, Result};

    /// Firmware every "supported" fixture device reports.
    pub const SUPPORTED_FIRMWARE: &str = "1.4.0";

    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// A started session whose mock already reported a supported device.
    pub fn detected_session() -> Result<(DeviceSession, MockDeviceTransport, Arc<RecordingObserver>)> {
        init_logging();
        started_mock_session(Some(SUPPORTED_FIRMWARE))
    }

    /// A detected session forced into `state` by the device, with the
    /// recorded calls and callbacks cleared.
    pub fn session_in(
        state: DeviceState,
    ) -> Result<(DeviceSession, MockDeviceTransport, Arc<RecordingObserver>)> {
        let (session, mock, observer) = detected_session()?;
        mock.emit(TransportEvent::StateChanged(state));
        mock.clear_calls();
        observer.clear();
        Ok((session, mock, observer))
    }

    /// A session in `SessionOpened`, reached through `open_session`.
    pub fn opened_session() -> Result<(DeviceSession, MockDeviceTransport, Arc<RecordingObserver>)> {
        let (session, mock, observer) = detected_session()?;
        session.open_session()?;
        mock.clear_calls();
        observer.clear();
        Ok((session, mock, observer))
    }
}
