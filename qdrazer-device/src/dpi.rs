//! DPI values and the fixed five-slot stage record

use serde::{Deserialize, Serialize};
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::DeviceError;
use crate::protocol::layout::{DPI_STAGE_LEN, MAX_DPI_STAGES};

/// Sensor resolution per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dpi {
    pub x: u16,
    pub y: u16,
}

impl Dpi {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Same resolution on both axes
    pub fn unified(dpi: u16) -> Self {
        Self { x: dpi, y: dpi }
    }
}

impl From<(u16, u16)> for Dpi {
    fn from((x, y): (u16, u16)) -> Self {
        Self { x, y }
    }
}

/// Configured DPI stages and the one currently selected
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DpiStages {
    pub stages: Vec<Dpi>,
    pub active: u8,
}

/// One stage slot as it sits in the 35-byte stages field.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct DpiStageRecord {
    index: u8,
    x: U16,
    y: U16,
    _reserved: [u8; 2],
}

/// Size of the packed stages field
pub const STAGES_FIELD_LEN: usize = MAX_DPI_STAGES * DPI_STAGE_LEN;

/// Pack up to five stages; unused slots are sent as `(0, 0)`.
pub(crate) fn encode_stages(stages: &[Dpi]) -> Result<Vec<u8>, DeviceError> {
    if stages.len() > MAX_DPI_STAGES {
        return Err(DeviceError::InvalidParameter(format!(
            "{} DPI stages requested, device holds at most {MAX_DPI_STAGES}",
            stages.len()
        )));
    }

    let mut field = Vec::with_capacity(STAGES_FIELD_LEN);
    for slot in 0..MAX_DPI_STAGES {
        let dpi = stages.get(slot).copied().unwrap_or_default();
        let record = DpiStageRecord {
            index: slot as u8,
            x: U16::new(dpi.x),
            y: U16::new(dpi.y),
            _reserved: [0; 2],
        };
        field.extend_from_slice(record.as_bytes());
    }
    Ok(field)
}

/// Unpack the first `len` stages; slots past `len` are ignored.
pub(crate) fn decode_stages(len: u8, field: &[u8]) -> Result<Vec<Dpi>, DeviceError> {
    let len = len as usize;
    if len > MAX_DPI_STAGES || field.len() < len * DPI_STAGE_LEN {
        return Err(DeviceError::ProtocolViolation(format!(
            "device reports {len} DPI stages in a {}-byte field",
            field.len()
        )));
    }

    field[..len * DPI_STAGE_LEN]
        .chunks_exact(DPI_STAGE_LEN)
        .map(|slot| {
            DpiStageRecord::read_from_bytes(slot)
                .map(|r| Dpi::new(r.x.get(), r.y.get()))
                .map_err(|_| DeviceError::ProtocolViolation("malformed DPI stage slot".into()))
        })
        .collect()
}
