//! Chunked bulk transfers
//!
//! Resources larger than one frame are moved in fixed-size units, one codec
//! exchange per unit, with a running offset in every request:
//!
//! - [`ByteStream`]: the device reports the total size in every reply
//!   (profile and macro info blobs)
//! - [`ElementStream`]: same control flow, counting typed elements
//!   (macro id list)
//! - [`SizedStream`]: the size is known up front from a separate command
//!   (macro programs)
//!
//! A transfer holds the link for its whole duration. Any failure aborts it
//! with no partial result; the device-side cursor is left undefined and the
//! next attempt starts over from offset 0.

use qdrazer_transport::{CommandId, FlowControlTransport, Transport, WaitPower};
use tracing::debug;

use crate::codec::{exchange, Descriptor, Field, Layout, Value};
use crate::error::DeviceError;
use crate::protocol::cmd;

fn with_tail(selector: &[Value], tail: impl IntoIterator<Item = Value>) -> Vec<Value> {
    selector.iter().cloned().chain(tail).collect()
}

/// Remembers the total reported by the first reply of a read session.
struct ReportedTotal {
    command: CommandId,
    first: Option<usize>,
}

impl ReportedTotal {
    fn new(command: CommandId) -> Self {
        Self { command, first: None }
    }

    fn check(&mut self, reported: usize) -> Result<usize, DeviceError> {
        let first = *self.first.get_or_insert(reported);
        if reported != first {
            return Err(DeviceError::ProtocolViolation(format!(
                "{}: total changed from {first} to {reported} mid-transfer",
                cmd::name(self.command)
            )));
        }
        Ok(first)
    }
}

// =============================================================================
// Byte stream
// =============================================================================

/// Size-prefixed byte resource.
///
/// Read: inputs `(selector.., offset)`, outputs `(total, chunk[unit])`.
/// Write: inputs `(selector.., position, size, chunk[len])`.
#[derive(Debug, Clone)]
pub struct ByteStream {
    selector: Descriptor,
    counter: Field,
    unit: usize,
}

impl ByteStream {
    pub fn new(selector: Descriptor, counter: Field, unit: usize) -> Self {
        Self {
            selector,
            counter,
            unit,
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    fn read_layout(&self) -> Layout {
        Layout::new(
            self.selector.clone().field(self.counter),
            Descriptor::new().field(self.counter).bytes(self.unit),
        )
    }

    /// Read the whole resource.
    ///
    /// Always performs at least one exchange; a total of `n` bytes takes
    /// `ceil(n / unit)` exchanges. Bytes of the last chunk past the total
    /// are discarded.
    pub fn read<T: Transport>(
        &self,
        link: &mut FlowControlTransport<T>,
        command: CommandId,
        selector: &[Value],
    ) -> Result<Vec<u8>, DeviceError> {
        let layout = self.read_layout();
        let mut total = ReportedTotal::new(command);
        let mut data = Vec::new();

        loop {
            let offset = Value::counter(self.counter, data.len())?;
            let mut out = exchange(link, command, &layout, &with_tail(selector, [offset]), WaitPower::NORMAL)?;
            let size = total.check(out.count()?)?;
            let chunk = out.bytes()?;

            let left = size - data.len();
            debug!("{}: {}/{} bytes", cmd::name(command), data.len(), size);
            if left > self.unit {
                data.extend_from_slice(&chunk);
            } else {
                data.extend_from_slice(&chunk[..left]);
                return Ok(data);
            }
        }
    }

    /// Write `data` in unit-sized chunks; the last chunk is sent at its own
    /// length. Empty data performs no exchange.
    pub fn write<T: Transport>(
        &self,
        link: &mut FlowControlTransport<T>,
        command: CommandId,
        selector: &[Value],
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let size = Value::counter(self.counter, data.len())?;

        for (i, chunk) in data.chunks(self.unit).enumerate() {
            let position = i * self.unit;
            let layout = Layout::input_only(
                self.selector
                    .clone()
                    .field(self.counter)
                    .field(self.counter)
                    .bytes(chunk.len()),
            );
            let inputs = with_tail(
                selector,
                [
                    Value::counter(self.counter, position)?,
                    size.clone(),
                    Value::from(chunk),
                ],
            );
            debug!("{}: writing {}+{} of {}", cmd::name(command), position, chunk.len(), data.len());
            exchange(link, command, &layout, &inputs, WaitPower::NORMAL)?;
        }
        Ok(())
    }
}

// =============================================================================
// Element stream
// =============================================================================

/// Count-prefixed list of fixed-width elements.
///
/// Inputs `(selector.., offset)`, outputs `(total, element × unit)`; offsets
/// and totals count elements, not bytes.
#[derive(Debug, Clone)]
pub struct ElementStream {
    selector: Descriptor,
    counter: Field,
    element: Field,
    unit: usize,
}

impl ElementStream {
    pub fn new(selector: Descriptor, counter: Field, element: Field, unit: usize) -> Self {
        Self {
            selector,
            counter,
            element,
            unit,
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn read<T: Transport>(
        &self,
        link: &mut FlowControlTransport<T>,
        command: CommandId,
        selector: &[Value],
    ) -> Result<Vec<Value>, DeviceError> {
        let layout = Layout::new(
            self.selector.clone().field(self.counter),
            Descriptor::new()
                .field(self.counter)
                .repeat(self.element, self.unit),
        );
        let mut total = ReportedTotal::new(command);
        let mut items = Vec::new();

        loop {
            let offset = Value::counter(self.counter, items.len())?;
            let mut out = exchange(link, command, &layout, &with_tail(selector, [offset]), WaitPower::NORMAL)?;
            let count = total.check(out.count()?)?;

            let left = count - items.len();
            debug!("{}: {}/{} elements", cmd::name(command), items.len(), count);
            let take = left.min(self.unit);
            for _ in 0..take {
                items.push(out.value()?);
            }
            if left <= self.unit {
                return Ok(items);
            }
        }
    }
}

// =============================================================================
// Sized stream
// =============================================================================

/// Byte resource whose size is queried or set by a separate command.
///
/// Read: inputs `(selector.., offset: u32, requested: u8)`, output `chunk[unit]`.
/// Write: inputs `(selector.., offset: u32, length: u8, chunk[length])`.
///
/// Sizes above `limit` are refused before any exchange.
#[derive(Debug, Clone)]
pub struct SizedStream {
    selector: Descriptor,
    unit: usize,
    limit: usize,
}

impl SizedStream {
    pub fn new(selector: Descriptor, unit: usize) -> Self {
        Self {
            selector,
            unit,
            limit: u32::MAX as usize,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Read exactly `size` bytes; zero performs no exchange.
    ///
    /// `size` usually comes from the device, so one above the limit is a
    /// [`DeviceError::ProtocolViolation`].
    pub fn read<T: Transport>(
        &self,
        link: &mut FlowControlTransport<T>,
        command: CommandId,
        selector: &[Value],
        size: usize,
    ) -> Result<Vec<u8>, DeviceError> {
        let layout = Layout::new(
            self.selector.clone().u32().u8(),
            Descriptor::new().bytes(self.unit),
        );
        if size > self.limit {
            return Err(DeviceError::ProtocolViolation(format!(
                "{}: size {} exceeds limit {}",
                cmd::name(command),
                size,
                self.limit
            )));
        }
        let requested = Value::counter(Field::U8, self.unit)?;
        let mut data = Vec::with_capacity(size.min(self.unit));

        while data.len() < size {
            let offset = Value::counter(Field::U32, data.len())?;
            let mut out = exchange(
                link,
                command,
                &layout,
                &with_tail(selector, [offset, requested.clone()]),
                WaitPower::NORMAL,
            )?;
            let chunk = out.bytes()?;
            let take = self.unit.min(size - data.len());
            debug!("{}: {}+{} of {}", cmd::name(command), data.len(), take, size);
            data.extend_from_slice(&chunk[..take]);
        }
        Ok(data)
    }

    pub fn write<T: Transport>(
        &self,
        link: &mut FlowControlTransport<T>,
        command: CommandId,
        selector: &[Value],
        data: &[u8],
    ) -> Result<(), DeviceError> {
        if data.len() > self.limit {
            return Err(DeviceError::InvalidParameter(format!(
                "{}: {} bytes exceeds limit {}",
                cmd::name(command),
                data.len(),
                self.limit
            )));
        }
        Value::counter(Field::U32, data.len())?;

        for (i, chunk) in data.chunks(self.unit).enumerate() {
            let offset = i * self.unit;
            let layout = Layout::input_only(self.selector.clone().u32().u8().bytes(chunk.len()));
            let inputs = with_tail(
                selector,
                [
                    Value::counter(Field::U32, offset)?,
                    Value::counter(Field::U8, chunk.len())?,
                    Value::from(chunk),
                ],
            );
            debug!("{}: writing {}+{} of {}", cmd::name(command), offset, chunk.len(), data.len());
            exchange(link, command, &layout, &inputs, WaitPower::NORMAL)?;
        }
        Ok(())
    }
}
