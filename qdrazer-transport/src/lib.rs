//! Transport layer for programmable mouse configuration
//!
//! Every configuration command is one fixed-size frame sent to the device
//! and one frame read back. This crate provides the frame type, the raw
//! `Transport` trait, and the flow-control wrapper that pairs each request
//! with its reply:
//!
//! - HID feature reports (feature `hid`)
//! - In-memory loopback (dry runs, tests)

pub mod config;
pub mod error;
pub mod flow_control;
pub mod frame;
pub mod loopback;

#[cfg(feature = "hid")]
mod hid_feature;

pub use config::FlowConfig;
pub use error::TransportError;
pub use flow_control::{FlowControlTransport, WaitPower};
pub use frame::{CommandId, Frame, FRAME_SIZE, HEADER_SIZE, PAYLOAD_SIZE};
pub use loopback::{LoopbackProbe, LoopbackTransport};

#[cfg(feature = "hid")]
pub use hid_feature::{HidFeatureTransport, DEFAULT_REPORT_ID};
#[cfg(feature = "hid")]
pub use hidapi;

/// The core transport trait - all backends implement this
///
/// One call moves exactly one frame. There is no buffering across calls and
/// no request multiplexing, so a transport must never be shared by two
/// exchanges at once.
pub trait Transport: Send {
    /// Send a frame; fails if the link is down
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Receive the next frame; fails with `Timeout` if none arrives
    fn recv(&mut self) -> Result<Frame, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn recv(&mut self) -> Result<Frame, TransportError> {
        (**self).recv()
    }
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;
