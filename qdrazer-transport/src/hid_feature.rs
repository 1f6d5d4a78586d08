//! HID feature-report transport for a directly connected device

use hidapi::HidDevice;
use tracing::debug;

use crate::error::TransportError;
use crate::frame::{Frame, FRAME_SIZE};
use crate::Transport;

/// Report ID used by devices without numbered reports
pub const DEFAULT_REPORT_ID: u8 = 0x00;

/// Frames travel as feature reports: the request via SET_REPORT, the reply
/// via GET_REPORT on the same interface.
pub struct HidFeatureTransport {
    device: HidDevice,
    report_id: u8,
}

impl HidFeatureTransport {
    /// Wrap an already opened HID device (discovery is left to the caller).
    pub fn new(device: HidDevice) -> Self {
        Self::with_report_id(device, DEFAULT_REPORT_ID)
    }

    pub fn with_report_id(device: HidDevice, report_id: u8) -> Self {
        Self { device, report_id }
    }

    pub fn device(&self) -> &HidDevice {
        &self.device
    }
}

impl Transport for HidFeatureTransport {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut buf = [0u8; FRAME_SIZE + 1];
        buf[0] = self.report_id;
        buf[1..].copy_from_slice(&frame.to_bytes());
        self.device.send_feature_report(&buf)?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Frame, TransportError> {
        let mut buf = [0u8; FRAME_SIZE + 1];
        buf[0] = self.report_id;
        let n = self.device.get_feature_report(&mut buf)?;
        if n <= 1 {
            debug!("Empty feature report ({} bytes)", n);
            return Err(TransportError::Timeout);
        }
        Frame::from_bytes(&buf[1..n])
    }
}
