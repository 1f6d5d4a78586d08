//! Generic command codec
//!
//! A command is described by a `Layout`: the fields the caller supplies
//! (inputs) followed by the fields the device fills in (outputs). The same
//! layout builds the request and parses the reply, so one routine serves
//! every scalar command:
//!
//! ```text
//! payload: [ inputs ... | outputs (zero in the request) ... | zero padding ]
//! ```
//!
//! All multi-byte integers are big-endian.

use std::fmt;

use qdrazer_transport::{CommandId, FlowControlTransport, Frame, Transport, WaitPower, PAYLOAD_SIZE};
use tracing::debug;

use crate::error::DeviceError;

// =============================================================================
// Fields and values
// =============================================================================

/// One primitive slot of a wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    /// Fixed-length byte string, zero padded on the right
    Bytes(usize),
    /// Reserved bytes; always zero on send and carry no value
    Pad(usize),
}

impl Field {
    /// Packed size in bytes
    pub const fn size(self) -> usize {
        match self {
            Field::U8 | Field::I8 => 1,
            Field::U16 | Field::I16 => 2,
            Field::U32 | Field::I32 => 4,
            Field::Bytes(n) | Field::Pad(n) => n,
        }
    }

    pub const fn carries_value(self) -> bool {
        !matches!(self, Field::Pad(_))
    }

    /// Zero value of this field: 0 for integers, all-zero bytes for strings.
    pub fn default_value(self) -> Option<Value> {
        match self {
            Field::U8 => Some(Value::U8(0)),
            Field::U16 => Some(Value::U16(0)),
            Field::U32 => Some(Value::U32(0)),
            Field::I8 => Some(Value::I8(0)),
            Field::I16 => Some(Value::I16(0)),
            Field::I32 => Some(Value::I32(0)),
            Field::Bytes(n) => Some(Value::Bytes(vec![0u8; n])),
            Field::Pad(_) => None,
        }
    }

    /// Write `value` into `out`, which is exactly `self.size()` bytes long.
    fn pack(self, value: &Value, out: &mut [u8]) -> Result<(), DeviceError> {
        match (self, value) {
            (Field::U8, Value::U8(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::U16, Value::U16(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::U32, Value::U32(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::I8, Value::I8(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::I16, Value::I16(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::I32, Value::I32(v)) => out.copy_from_slice(&v.to_be_bytes()),
            (Field::Bytes(n), Value::Bytes(bytes)) => {
                if bytes.len() > n {
                    return Err(DeviceError::InvalidParameter(format!(
                        "{} bytes do not fit a {n}-byte field",
                        bytes.len()
                    )));
                }
                out[..bytes.len()].copy_from_slice(bytes);
                out[bytes.len()..].fill(0);
            }
            (field, value) => {
                return Err(DeviceError::InvalidParameter(format!(
                    "{value} does not match field {field:?}"
                )))
            }
        }
        Ok(())
    }

    /// Read this field from `bytes`, which is exactly `self.size()` bytes long.
    fn unpack(self, bytes: &[u8]) -> Option<Value> {
        let value = match self {
            Field::U8 => Value::U8(bytes[0]),
            Field::U16 => Value::U16(u16::from_be_bytes([bytes[0], bytes[1]])),
            Field::U32 => Value::U32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            Field::I8 => Value::I8(i8::from_be_bytes([bytes[0]])),
            Field::I16 => Value::I16(i16::from_be_bytes([bytes[0], bytes[1]])),
            Field::I32 => Value::I32(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            Field::Bytes(_) => Value::Bytes(bytes.to_vec()),
            Field::Pad(_) => return None,
        };
        Some(value)
    }
}

/// A typed value for one non-padding field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    Bytes(Vec<u8>),
}

impl Value {
    /// The field this value packs into (byte strings at their own length).
    pub fn field(&self) -> Field {
        match self {
            Value::U8(_) => Field::U8,
            Value::U16(_) => Field::U16,
            Value::U32(_) => Field::U32,
            Value::I8(_) => Field::I8,
            Value::I16(_) => Field::I16,
            Value::I32(_) => Field::I32,
            Value::Bytes(b) => Field::Bytes(b.len()),
        }
    }

    /// Build an unsigned counter (offset, size) of the given field width.
    pub fn counter(field: Field, n: usize) -> Result<Value, DeviceError> {
        let overflow = || {
            DeviceError::InvalidParameter(format!("{n} does not fit a {field:?} counter"))
        };
        match field {
            Field::U8 => u8::try_from(n).map(Value::U8).map_err(|_| overflow()),
            Field::U16 => u16::try_from(n).map(Value::U16).map_err(|_| overflow()),
            Field::U32 => u32::try_from(n).map(Value::U32).map_err(|_| overflow()),
            _ => Err(DeviceError::InvalidParameter(format!(
                "{field:?} is not an unsigned counter field"
            ))),
        }
    }

    /// Unsigned integer of any width, widened.
    pub fn as_count(&self) -> Option<usize> {
        match *self {
            Value::U8(v) => Some(v as usize),
            Value::U16(v) => Some(v as usize),
            Value::U32(v) => usize::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match *self {
            Value::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match *self {
            Value::U16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match *self {
            Value::I8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match *self {
            Value::I16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "u8 {v}"),
            Value::U16(v) => write!(f, "u16 {v}"),
            Value::U32(v) => write!(f, "u32 {v}"),
            Value::I8(v) => write!(f, "i8 {v}"),
            Value::I16(v) => write!(f, "i16 {v}"),
            Value::I32(v) => write!(f, "i32 {v}"),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::I8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

// =============================================================================
// Descriptors and layouts
// =============================================================================

/// Ordered list of fields, built with a small builder API:
///
/// ```
/// use qdrazer_device::codec::Descriptor;
///
/// let d = Descriptor::new().u8().u16().u16().pad(2);
/// assert_eq!(d.packed_size(), 7);
/// assert_eq!(d.arity(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    fields: Vec<Field>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append `count` copies of `field`.
    pub fn repeat(mut self, field: Field, count: usize) -> Self {
        self.fields.extend(std::iter::repeat(field).take(count));
        self
    }

    pub fn u8(self) -> Self {
        self.field(Field::U8)
    }

    pub fn u16(self) -> Self {
        self.field(Field::U16)
    }

    pub fn u32(self) -> Self {
        self.field(Field::U32)
    }

    pub fn i8(self) -> Self {
        self.field(Field::I8)
    }

    pub fn i16(self) -> Self {
        self.field(Field::I16)
    }

    pub fn i32(self) -> Self {
        self.field(Field::I32)
    }

    pub fn bytes(self, len: usize) -> Self {
        self.field(Field::Bytes(len))
    }

    pub fn pad(self, len: usize) -> Self {
        self.field(Field::Pad(len))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn packed_size(&self) -> usize {
        self.fields.iter().map(|f| f.size()).sum()
    }

    /// Number of value-carrying (non-padding) fields
    pub fn arity(&self) -> usize {
        self.fields.iter().filter(|f| f.carries_value()).count()
    }

    /// Typed zero for every value-carrying field
    pub fn zero_values(&self) -> Vec<Value> {
        self.fields.iter().filter_map(|f| f.default_value()).collect()
    }

    /// Pack `values` at the start of `out`; returns the bytes written.
    fn pack(&self, values: &[Value], out: &mut [u8]) -> Result<usize, DeviceError> {
        if values.len() != self.arity() {
            return Err(DeviceError::InvalidParameter(format!(
                "expected {} values, got {}",
                self.arity(),
                values.len()
            )));
        }
        let mut values = values.iter();
        let mut pos = 0;
        for &field in &self.fields {
            let slot = &mut out[pos..pos + field.size()];
            match field.carries_value().then(|| values.next()).flatten() {
                Some(value) => field.pack(value, slot)?,
                None => slot.fill(0),
            }
            pos += field.size();
        }
        Ok(pos)
    }

    /// Unpack every value-carrying field from the start of `bytes`.
    fn unpack(&self, bytes: &[u8]) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.arity());
        let mut pos = 0;
        for &field in &self.fields {
            values.extend(field.unpack(&bytes[pos..pos + field.size()]));
            pos += field.size();
        }
        values
    }
}

impl FromIterator<Field> for Descriptor {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Wire layout of one command: caller-supplied inputs, then device-filled outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    input: Descriptor,
    output: Descriptor,
}

impl Layout {
    pub fn new(input: Descriptor, output: Descriptor) -> Self {
        Self { input, output }
    }

    /// Every field supplied by the caller (setters)
    pub fn input_only(input: Descriptor) -> Self {
        Self::new(input, Descriptor::new())
    }

    pub fn input(&self) -> &Descriptor {
        &self.input
    }

    pub fn output(&self) -> &Descriptor {
        &self.output
    }

    pub fn packed_size(&self) -> usize {
        self.input.packed_size() + self.output.packed_size()
    }

    /// Packed size, or `DescriptorTooLarge` if it does not fit one frame.
    pub fn check(&self) -> Result<usize, DeviceError> {
        let size = self.packed_size();
        if size > PAYLOAD_SIZE {
            return Err(DeviceError::DescriptorTooLarge {
                size,
                capacity: PAYLOAD_SIZE,
            });
        }
        Ok(size)
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Output values of one exchange, read in layout order.
#[derive(Debug)]
pub struct Outputs {
    command: CommandId,
    values: std::vec::IntoIter<Value>,
}

impl Outputs {
    /// Values not yet taken
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values.collect()
    }

    pub fn value(&mut self) -> Result<Value, DeviceError> {
        self.values.next().ok_or_else(|| {
            DeviceError::ProtocolViolation(format!("{}: reply has fewer fields than expected", self.command))
        })
    }

    fn mismatch(&self, expected: &str, got: &Value) -> DeviceError {
        DeviceError::ProtocolViolation(format!("{}: expected {expected}, got {got}", self.command))
    }

    pub fn u8(&mut self) -> Result<u8, DeviceError> {
        let v = self.value()?;
        v.as_u8().ok_or_else(|| self.mismatch("u8", &v))
    }

    pub fn u16(&mut self) -> Result<u16, DeviceError> {
        let v = self.value()?;
        v.as_u16().ok_or_else(|| self.mismatch("u16", &v))
    }

    pub fn u32(&mut self) -> Result<u32, DeviceError> {
        let v = self.value()?;
        v.as_u32().ok_or_else(|| self.mismatch("u32", &v))
    }

    pub fn i8(&mut self) -> Result<i8, DeviceError> {
        let v = self.value()?;
        v.as_i8().ok_or_else(|| self.mismatch("i8", &v))
    }

    pub fn i16(&mut self) -> Result<i16, DeviceError> {
        let v = self.value()?;
        v.as_i16().ok_or_else(|| self.mismatch("i16", &v))
    }

    pub fn i32(&mut self) -> Result<i32, DeviceError> {
        let v = self.value()?;
        v.as_i32().ok_or_else(|| self.mismatch("i32", &v))
    }

    /// Unsigned integer of any width, as a length or offset
    pub fn count(&mut self) -> Result<usize, DeviceError> {
        let v = self.value()?;
        v.as_count().ok_or_else(|| self.mismatch("unsigned counter", &v))
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, DeviceError> {
        match self.value()? {
            Value::Bytes(b) => Ok(b),
            other => Err(self.mismatch("bytes", &other)),
        }
    }
}

/// Run one command: pack `inputs`, zero-fill the outputs, exchange a single
/// frame and unpack only the output fields of the reply.
pub fn exchange<T: Transport>(
    link: &mut FlowControlTransport<T>,
    command: CommandId,
    layout: &Layout,
    inputs: &[Value],
    power: WaitPower,
) -> Result<Outputs, DeviceError> {
    let size = layout.check()?;

    let mut request = Frame::new(command);
    let payload = request.payload_mut();
    let written = layout.input().pack(inputs, payload)?;
    let defaults = layout.output().zero_values();
    layout.output().pack(&defaults, &mut payload[written..size])?;

    let reply = link.send_recv(&request, power)?;

    if reply.command() != command {
        return Err(DeviceError::ProtocolViolation(format!(
            "reply header {} does not match request {}",
            reply.command(),
            command
        )));
    }
    if reply.payload_len() < size {
        return Err(DeviceError::ProtocolViolation(format!(
            "{}: reply carries {} payload bytes, layout needs {}",
            command,
            reply.payload_len(),
            size
        )));
    }

    let values = layout.output().unpack(&reply.payload()[written..size]);
    debug!("{} -> {} output values", command, values.len());
    Ok(Outputs {
        command,
        values: values.into_iter(),
    })
}
