//! Device settings types
//!
//! Wire values of the closed enums are protocol-assigned; anything the
//! device reports outside these tables is treated as a protocol violation
//! by the command surface.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::layout::BUTTON_FUNCTION_LEN;

/// Operating mode of the device firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceMode {
    Normal = 0x00,
    Bootloader = 0x01,
    Test = 0x02,
    /// Host software drives the device directly
    Driver = 0x03,
}

impl DeviceMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Normal),
            0x01 => Some(Self::Bootloader),
            0x02 => Some(Self::Test),
            0x03 => Some(Self::Driver),
            _ => None,
        }
    }
}

/// Scroll wheel behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScrollMode {
    Tactile = 0x00,
    FreeSpin = 0x01,
}

impl ScrollMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Tactile),
            0x01 => Some(Self::FreeSpin),
            _ => None,
        }
    }
}

/// Secondary button layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Hypershift {
    #[default]
    Off = 0x00,
    On = 0x01,
}

/// Polling rate options; the wire value is the report interval in ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PollingRate {
    Hz1000 = 1,
    Hz500 = 2,
    Hz250 = 4,
    Hz125 = 8,
}

impl PollingRate {
    pub fn from_interval(ms: u8) -> Option<Self> {
        match ms {
            1 => Some(Self::Hz1000),
            2 => Some(Self::Hz500),
            4 => Some(Self::Hz250),
            8 => Some(Self::Hz125),
            _ => None,
        }
    }

    pub fn from_hz(hz: u16) -> Option<Self> {
        match hz {
            1000 => Some(Self::Hz1000),
            500 => Some(Self::Hz500),
            250 => Some(Self::Hz250),
            125 => Some(Self::Hz125),
            _ => None,
        }
    }

    pub fn interval_ms(self) -> u8 {
        self as u8
    }

    pub fn to_hz(self) -> u16 {
        1000 / self as u16
    }
}

/// Profile selector: the active profile or a numbered storage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Profile(u8);

impl Profile {
    /// Whatever profile is active right now
    pub const CURRENT: Profile = Profile(0x00);

    /// Numbered profile slot (slot 0 is reserved for `CURRENT`)
    pub fn slot(n: u8) -> Option<Self> {
        (n != 0).then_some(Self(n))
    }

    pub fn from_u8(v: u8) -> Self {
        Self(v)
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }

    pub fn is_current(self) -> bool {
        self == Self::CURRENT
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_current() {
            f.write_str("current")
        } else {
            write!(f, "profile {}", self.0)
        }
    }
}

/// Physical button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonId(pub u8);

/// Opaque button assignment record, stored verbatim by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonFunction(pub [u8; BUTTON_FUNCTION_LEN]);

impl ButtonFunction {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Build from a reply field; `None` unless exactly `BUTTON_FUNCTION_LEN` bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

/// Macro storage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacroId(pub u16);

impl fmt::Display for MacroId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "macro 0x{:04X}", self.0)
    }
}

/// Firmware version as four raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirmwareVersion(pub [u8; 4]);

impl FirmwareVersion {
    pub fn major(&self) -> u8 {
        self.0[0]
    }

    pub fn minor(&self) -> u8 {
        self.0[1]
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "v{a}.{b}.{c}.{d}")
    }
}

/// Onboard flash statistics, fields in reply order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlashUsage {
    pub page_size: u16,
    pub total: u32,
    pub used: u32,
    pub free: u32,
}
