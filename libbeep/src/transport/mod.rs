// libbeep/src/transport/mod.rs

//! Transport seams: the traits a platform link implements, the sinks it
//! delivers through, and in-memory mocks.

pub mod events;
pub mod handle;
pub mod mock;
pub mod traits;

pub use events::{
    EventReceiver, EventSink, MfcCompletion, MfcCompletionSink, Reply, Sink, TransportEvent,
};
pub use handle::TransportHandle;
pub use mock::{MockDeviceTransport, MockMifareTransport, MockPaymentTransport};
pub use traits::{DeviceTransport, MifareTransport, PaymentTransport, TransportResource};
