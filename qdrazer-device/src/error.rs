//! Device error types

use qdrazer_transport::TransportError;
use thiserror::Error;

/// Errors from device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command layout does not fit in one frame
    #[error("Descriptor too large: {size} bytes exceeds payload capacity of {capacity}")]
    DescriptorTooLarge { size: usize, capacity: usize },

    /// Reply does not match the expected layout or transfer progress
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
