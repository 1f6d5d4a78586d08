//! Fixed-size report frames
//!
//! Every exchange with the device moves exactly one frame in each direction:
//! a two byte command header (group, sub-command) followed by a zero padded
//! payload region of `PAYLOAD_SIZE` bytes.

use std::fmt;

use crate::error::TransportError;

/// Header bytes (group + sub-command)
pub const HEADER_SIZE: usize = 2;
/// Payload capacity of every frame
pub const PAYLOAD_SIZE: usize = 80;
/// Total on-wire frame length
pub const FRAME_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// 16-bit command identifier: group in the high byte, sub-command in the low byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u16);

impl CommandId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn from_parts(group: u8, sub_command: u8) -> Self {
        Self(((group as u16) << 8) | sub_command as u16)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn group(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn sub_command(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId(0x{:04X})", self.0)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// One report exchanged with the device.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    command: CommandId,
    payload: [u8; PAYLOAD_SIZE],
    /// Payload bytes that actually arrived (always `PAYLOAD_SIZE` for frames we build)
    payload_len: usize,
}

impl Frame {
    /// Empty frame for `command` with an all-zero payload.
    pub fn new(command: CommandId) -> Self {
        Self {
            command,
            payload: [0u8; PAYLOAD_SIZE],
            payload_len: PAYLOAD_SIZE,
        }
    }

    /// Frame for `command` with `data` copied to the front of the payload.
    pub fn with_payload(command: CommandId, data: &[u8]) -> Result<Self, TransportError> {
        if data.len() > PAYLOAD_SIZE {
            return Err(TransportError::FrameTooLong {
                len: HEADER_SIZE + data.len(),
            });
        }
        let mut frame = Self::new(command);
        frame.payload[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Parse a frame as read from the wire.
    ///
    /// A short read keeps the missing payload bytes zeroed and records how
    /// many bytes arrived, so callers can reject replies that are too short
    /// for their layout.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, TransportError> {
        if buf.len() < HEADER_SIZE {
            return Err(TransportError::EmptyReport);
        }
        if buf.len() > FRAME_SIZE {
            return Err(TransportError::FrameTooLong { len: buf.len() });
        }
        let mut frame = Self::new(CommandId::from_parts(buf[0], buf[1]));
        let body = &buf[HEADER_SIZE..];
        frame.payload[..body.len()].copy_from_slice(body);
        frame.payload_len = body.len();
        Ok(frame)
    }

    /// Serialize header + full payload.
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0] = self.command.group();
        buf[1] = self.command.sub_command();
        buf[HEADER_SIZE..].copy_from_slice(&self.payload);
        buf
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut [u8; PAYLOAD_SIZE] {
        &mut self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trailing zero padding is noise in logs
        let used = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        f.debug_struct("Frame")
            .field("command", &self.command)
            .field("payload", &format_args!("{:02X?}", &self.payload[..used]))
            .field("payload_len", &self.payload_len)
            .finish()
    }
}
