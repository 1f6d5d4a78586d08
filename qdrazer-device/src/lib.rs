//! High-level configuration interface for programmable mice
//!
//! `Device` wraps any `Transport` and exposes the device command set:
//! device mode and readiness, scroll wheel, buttons, polling rate, DPI,
//! profiles and macros. Each operation is a single codec exchange or one
//! chunked transfer loop (see [`transfer`]).
//!
//! ```no_run
//! use qdrazer_device::{Device, Dpi, Profile};
//! use qdrazer_transport::LoopbackTransport;
//!
//! let device = Device::new(LoopbackTransport::new());
//! device.set_dpi_xy(Profile::CURRENT, Dpi::unified(800))?;
//! # Ok::<(), qdrazer_device::DeviceError>(())
//! ```

pub mod codec;
pub mod dpi;
pub mod error;
pub mod protocol;
pub mod settings;
pub mod transfer;

pub use codec::{Descriptor, Field, Layout, Outputs, Value};
pub use dpi::{Dpi, DpiStages};
pub use error::DeviceError;
pub use settings::{
    ButtonFunction, ButtonId, DeviceMode, FirmwareVersion, FlashUsage, Hypershift, MacroId,
    PollingRate, Profile, ScrollMode,
};
pub use transfer::{ByteStream, ElementStream, SizedStream};

pub use qdrazer_transport::{CommandId, FlowConfig, Transport, TransportError, WaitPower};

use parking_lot::{Mutex, MutexGuard};
use qdrazer_transport::FlowControlTransport;
use tracing::debug;

use protocol::{chunk, cmd, layout};

fn unknown(what: &str, value: u8) -> DeviceError {
    DeviceError::ProtocolViolation(format!("unknown {what} 0x{value:02X}"))
}

fn profile_info_stream() -> ByteStream {
    ByteStream::new(Descriptor::new().u8(), Field::U16, chunk::INFO_UNIT)
}

fn macro_info_stream() -> ByteStream {
    ByteStream::new(Descriptor::new().u16(), Field::U16, chunk::INFO_UNIT)
}

fn macro_list_stream() -> ElementStream {
    ElementStream::new(Descriptor::new(), Field::U16, Field::U16, chunk::MACRO_LIST_UNIT)
}

fn macro_function_stream() -> SizedStream {
    SizedStream::new(Descriptor::new().u16(), chunk::MACRO_FUNCTION_UNIT).with_limit(chunk::MAX_MACRO_PROGRAM)
}

/// `(profile, flag)` pair shared by the scroll toggles
fn profile_byte() -> Layout {
    Layout::new(Descriptor::new().u8(), Descriptor::new().u8())
}

/// Configuration interface over one transport
///
/// The link is locked once per operation and held for the whole of a bulk
/// transfer, so sharing a `Device` between threads never interleaves two
/// exchanges.
pub struct Device<T: Transport> {
    link: Mutex<FlowControlTransport<T>>,
}

impl<T: Transport> Device<T> {
    /// Create a device with default flow-control timing
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FlowConfig::default())
    }

    pub fn with_config(transport: T, config: FlowConfig) -> Self {
        Self {
            link: Mutex::new(FlowControlTransport::with_config(transport, config)),
        }
    }

    pub fn config(&self) -> FlowConfig {
        *self.link.lock().config()
    }

    /// Release the underlying transport
    pub fn into_inner(self) -> T {
        self.link.into_inner().into_inner()
    }

    fn link(&self) -> MutexGuard<'_, FlowControlTransport<T>> {
        self.link.lock()
    }

    fn call(&self, command: CommandId, layout: &Layout, inputs: &[Value]) -> Result<Outputs, DeviceError> {
        codec::exchange(&mut self.link(), command, layout, inputs, WaitPower::NORMAL)
    }

    /// Run an arbitrary command and return its output values.
    pub fn exchange(
        &self,
        command: CommandId,
        layout: &Layout,
        inputs: &[Value],
    ) -> Result<Vec<Value>, DeviceError> {
        Ok(self.call(command, layout, inputs)?.into_vec())
    }

    // === Device ===

    pub fn set_device_mode(&self, mode: DeviceMode, param: u8) -> Result<(), DeviceError> {
        self.call(
            cmd::SET_DEVICE_MODE,
            &Layout::input_only(Descriptor::new().u8().u8()),
            &[Value::U8(mode as u8), Value::U8(param)],
        )?;
        Ok(())
    }

    /// Current mode and its parameter byte
    pub fn get_device_mode(&self) -> Result<(DeviceMode, u8), DeviceError> {
        let mut out = self.call(
            cmd::GET_DEVICE_MODE,
            &Layout::new(Descriptor::new(), Descriptor::new().u8().u8()),
            &[],
        )?;
        let raw = out.u8()?;
        let mode = DeviceMode::from_u8(raw).ok_or_else(|| unknown("device mode", raw))?;
        Ok((mode, out.u8()?))
    }

    /// Serial number with trailing NULs removed; anything but UTF-8 is a
    /// protocol violation.
    pub fn get_serial(&self) -> Result<String, DeviceError> {
        let mut out = self.call(
            cmd::GET_SERIAL,
            &Layout::new(Descriptor::new(), Descriptor::new().bytes(layout::SERIAL_LEN)),
            &[],
        )?;
        let mut raw = out.bytes()?;
        while raw.last() == Some(&0) {
            raw.pop();
        }
        String::from_utf8(raw).map_err(|e| DeviceError::ProtocolViolation(format!("serial is not UTF-8: {e}")))
    }

    pub fn get_firmware_version(&self) -> Result<FirmwareVersion, DeviceError> {
        let mut out = self.call(
            cmd::GET_FIRMWARE_VERSION,
            &Layout::new(Descriptor::new(), Descriptor::new().repeat(Field::U8, 4)),
            &[],
        )?;
        Ok(FirmwareVersion([out.u8()?, out.u8()?, out.u8()?, out.u8()?]))
    }

    pub fn get_flash_usage(&self) -> Result<FlashUsage, DeviceError> {
        let mut out = self.call(
            cmd::GET_FLASH_USAGE,
            &Layout::new(Descriptor::new(), Descriptor::new().u16().u32().u32().u32()),
            &[],
        )?;
        Ok(FlashUsage {
            page_size: out.u16()?,
            total: out.u32()?,
            used: out.u32()?,
            free: out.u32()?,
        })
    }

    /// Wait for the device to settle after a state change.
    ///
    /// Polls once with the `SETTLE` budget, then confirms with a normal
    /// exchange. Both must succeed.
    pub fn wait_device_ready(&self) -> Result<(), DeviceError> {
        let mut link = self.link();
        codec::exchange(
            &mut link,
            cmd::GET_DEVICE_READY,
            &Layout::new(Descriptor::new(), Descriptor::new().pad(3)),
            &[],
            WaitPower::SETTLE,
        )?;
        codec::exchange(
            &mut link,
            cmd::GET_DEVICE_READY,
            &Layout::new(Descriptor::new(), Descriptor::new().pad(2)),
            &[],
            WaitPower::NORMAL,
        )?;
        debug!("Device ready");
        Ok(())
    }

    // === Scroll wheel ===

    pub fn set_scroll_mode(&self, profile: Profile, mode: ScrollMode) -> Result<(), DeviceError> {
        self.call(
            cmd::SET_SCROLL_MODE,
            &Layout::input_only(Descriptor::new().u8().u8()),
            &[Value::U8(profile.to_u8()), Value::U8(mode as u8)],
        )?;
        Ok(())
    }

    pub fn get_scroll_mode(&self, profile: Profile) -> Result<ScrollMode, DeviceError> {
        let raw = self
            .call(cmd::GET_SCROLL_MODE, &profile_byte(), &[Value::U8(profile.to_u8())])?
            .u8()?;
        ScrollMode::from_u8(raw).ok_or_else(|| unknown("scroll mode", raw))
    }

    pub fn set_scroll_acceleration(&self, profile: Profile, enabled: bool) -> Result<(), DeviceError> {
        self.set_flag(cmd::SET_SCROLL_ACCELERATION, profile, enabled)
    }

    pub fn get_scroll_acceleration(&self, profile: Profile) -> Result<bool, DeviceError> {
        self.get_flag(cmd::GET_SCROLL_ACCELERATION, profile)
    }

    pub fn set_scroll_smart_reel(&self, profile: Profile, enabled: bool) -> Result<(), DeviceError> {
        self.set_flag(cmd::SET_SCROLL_SMART_REEL, profile, enabled)
    }

    pub fn get_scroll_smart_reel(&self, profile: Profile) -> Result<bool, DeviceError> {
        self.get_flag(cmd::GET_SCROLL_SMART_REEL, profile)
    }

    fn set_flag(&self, command: CommandId, profile: Profile, enabled: bool) -> Result<(), DeviceError> {
        self.call(
            command,
            &Layout::input_only(Descriptor::new().u8().u8()),
            &[Value::U8(profile.to_u8()), Value::U8(enabled as u8)],
        )?;
        Ok(())
    }

    fn get_flag(&self, command: CommandId, profile: Profile) -> Result<bool, DeviceError> {
        Ok(self.call(command, &profile_byte(), &[Value::U8(profile.to_u8())])?.u8()? != 0)
    }

    // === Buttons ===

    pub fn set_button_function(
        &self,
        profile: Profile,
        button: ButtonId,
        hypershift: Hypershift,
        function: &ButtonFunction,
    ) -> Result<(), DeviceError> {
        self.call(
            cmd::SET_BUTTON_FUNCTION,
            &Layout::input_only(
                Descriptor::new()
                    .u8()
                    .u8()
                    .u8()
                    .bytes(layout::BUTTON_FUNCTION_LEN),
            ),
            &[
                Value::U8(profile.to_u8()),
                Value::U8(button.0),
                Value::U8(hypershift as u8),
                Value::from(function.as_bytes()),
            ],
        )?;
        Ok(())
    }

    pub fn get_button_function(
        &self,
        profile: Profile,
        button: ButtonId,
        hypershift: Hypershift,
    ) -> Result<ButtonFunction, DeviceError> {
        let raw = self
            .call(
                cmd::GET_BUTTON_FUNCTION,
                &Layout::new(
                    Descriptor::new().u8().u8().u8(),
                    Descriptor::new().bytes(layout::BUTTON_FUNCTION_LEN),
                ),
                &[
                    Value::U8(profile.to_u8()),
                    Value::U8(button.0),
                    Value::U8(hypershift as u8),
                ],
            )?
            .bytes()?;
        ButtonFunction::from_slice(&raw)
            .ok_or_else(|| DeviceError::ProtocolViolation("button function length".into()))
    }

    // === Sensor ===

    pub fn set_polling_rate(&self, profile: Profile, rate: PollingRate) -> Result<(), DeviceError> {
        self.call(
            cmd::SET_POLLING_RATE,
            &Layout::input_only(Descriptor::new().u8().u8()),
            &[Value::U8(profile.to_u8()), Value::U8(rate.interval_ms())],
        )?;
        Ok(())
    }

    pub fn get_polling_rate(&self, profile: Profile) -> Result<PollingRate, DeviceError> {
        let raw = self
            .call(cmd::GET_POLLING_RATE, &profile_byte(), &[Value::U8(profile.to_u8())])?
            .u8()?;
        PollingRate::from_interval(raw).ok_or_else(|| unknown("polling interval", raw))
    }

    pub fn set_dpi_xy(&self, profile: Profile, dpi: Dpi) -> Result<(), DeviceError> {
        self.call(
            cmd::SET_DPI_XY,
            &Layout::input_only(Descriptor::new().u8().u16().u16().pad(2)),
            &[Value::U8(profile.to_u8()), Value::U16(dpi.x), Value::U16(dpi.y)],
        )?;
        Ok(())
    }

    pub fn get_dpi_xy(&self, profile: Profile) -> Result<Dpi, DeviceError> {
        let mut out = self.call(
            cmd::GET_DPI_XY,
            &Layout::new(Descriptor::new().u8(), Descriptor::new().u16().u16().pad(2)),
            &[Value::U8(profile.to_u8())],
        )?;
        Ok(Dpi::new(out.u16()?, out.u16()?))
    }

    /// Replace the DPI stage table (at most five stages).
    pub fn set_dpi_stages(&self, profile: Profile, stages: &DpiStages) -> Result<(), DeviceError> {
        let field = dpi::encode_stages(&stages.stages)?;
        self.call(
            cmd::SET_DPI_STAGES,
            &Layout::input_only(Descriptor::new().u8().u8().u8().bytes(dpi::STAGES_FIELD_LEN)),
            &[
                Value::U8(profile.to_u8()),
                Value::U8(stages.active),
                Value::U8(stages.stages.len() as u8),
                Value::Bytes(field),
            ],
        )?;
        Ok(())
    }

    pub fn get_dpi_stages(&self, profile: Profile) -> Result<DpiStages, DeviceError> {
        let mut out = self.call(
            cmd::GET_DPI_STAGES,
            &Layout::new(
                Descriptor::new().u8(),
                Descriptor::new().u8().u8().bytes(dpi::STAGES_FIELD_LEN),
            ),
            &[Value::U8(profile.to_u8())],
        )?;
        let active = out.u8()?;
        let len = out.u8()?;
        let stages = dpi::decode_stages(len, &out.bytes()?)?;
        Ok(DpiStages { stages, active })
    }

    // === Profiles ===

    pub fn get_profile_total_count(&self) -> Result<u8, DeviceError> {
        self.call(
            cmd::GET_PROFILE_TOTAL_COUNT,
            &Layout::new(Descriptor::new(), Descriptor::new().u8()),
            &[],
        )?
        .u8()
    }

    pub fn get_profile_available_count(&self) -> Result<u8, DeviceError> {
        Self::profile_available_count(&mut self.link())
    }

    fn profile_available_count(link: &mut FlowControlTransport<T>) -> Result<u8, DeviceError> {
        codec::exchange(
            link,
            cmd::GET_PROFILE_AVAILABLE_COUNT,
            &Layout::new(Descriptor::new(), Descriptor::new().u8()),
            &[],
            WaitPower::NORMAL,
        )?
        .u8()
    }

    /// Profiles stored on the device
    pub fn get_profile_list(&self) -> Result<Vec<Profile>, DeviceError> {
        let mut link = self.link();
        let count = Self::profile_available_count(&mut link)? as usize;
        let mut out = codec::exchange(
            &mut link,
            cmd::GET_PROFILE_LIST,
            &Layout::new(Descriptor::new(), Descriptor::new().u8().repeat(Field::U8, count)),
            &[],
            WaitPower::NORMAL,
        )?;
        out.u8()?;
        (0..count).map(|_| out.u8().map(Profile::from_u8)).collect()
    }

    pub fn new_profile(&self, profile: Profile) -> Result<(), DeviceError> {
        self.call(
            cmd::NEW_PROFILE,
            &Layout::input_only(Descriptor::new().u8()),
            &[Value::U8(profile.to_u8())],
        )?;
        Ok(())
    }

    pub fn delete_profile(&self, profile: Profile) -> Result<(), DeviceError> {
        self.call(
            cmd::DELETE_PROFILE,
            &Layout::input_only(Descriptor::new().u8()),
            &[Value::U8(profile.to_u8())],
        )?;
        Ok(())
    }

    /// Read the opaque profile info blob
    pub fn get_profile_info(&self, profile: Profile) -> Result<Vec<u8>, DeviceError> {
        profile_info_stream().read(
            &mut self.link(),
            cmd::GET_PROFILE_INFO,
            &[Value::U8(profile.to_u8())],
        )
    }

    pub fn set_profile_info(&self, profile: Profile, data: &[u8]) -> Result<(), DeviceError> {
        profile_info_stream().write(
            &mut self.link(),
            cmd::SET_PROFILE_INFO,
            &[Value::U8(profile.to_u8())],
            data,
        )
    }

    // === Macros ===

    pub fn get_macro_count(&self) -> Result<u16, DeviceError> {
        self.call(
            cmd::GET_MACRO_COUNT,
            &Layout::new(Descriptor::new(), Descriptor::new().u16()),
            &[],
        )?
        .u16()
    }

    pub fn get_macro_list(&self) -> Result<Vec<MacroId>, DeviceError> {
        macro_list_stream()
            .read(&mut self.link(), cmd::GET_MACRO_LIST, &[])?
            .into_iter()
            .map(|v| {
                v.as_u16()
                    .map(MacroId)
                    .ok_or_else(|| DeviceError::ProtocolViolation(format!("macro id {v}")))
            })
            .collect()
    }

    pub fn get_macro_info(&self, id: MacroId) -> Result<Vec<u8>, DeviceError> {
        macro_info_stream().read(&mut self.link(), cmd::GET_MACRO_INFO, &[Value::U16(id.0)])
    }

    pub fn set_macro_info(&self, id: MacroId, data: &[u8]) -> Result<(), DeviceError> {
        macro_info_stream().write(&mut self.link(), cmd::SET_MACRO_INFO, &[Value::U16(id.0)], data)
    }

    pub fn delete_macro(&self, id: MacroId) -> Result<(), DeviceError> {
        self.call(
            cmd::DELETE_MACRO,
            &Layout::input_only(Descriptor::new().u16()),
            &[Value::U16(id.0)],
        )?;
        Ok(())
    }

    /// Size of the macro program in bytes
    pub fn get_macro_size(&self, id: MacroId) -> Result<u32, DeviceError> {
        Self::macro_size(&mut self.link(), id)
    }

    fn macro_size(link: &mut FlowControlTransport<T>, id: MacroId) -> Result<u32, DeviceError> {
        codec::exchange(
            link,
            cmd::GET_MACRO_SIZE,
            &Layout::new(Descriptor::new().u16(), Descriptor::new().u32()),
            &[Value::U16(id.0)],
            WaitPower::NORMAL,
        )?
        .u32()
    }

    pub fn set_macro_size(&self, id: MacroId, size: u32) -> Result<(), DeviceError> {
        Self::store_macro_size(&mut self.link(), id, size)
    }

    fn store_macro_size(link: &mut FlowControlTransport<T>, id: MacroId, size: u32) -> Result<(), DeviceError> {
        codec::exchange(
            link,
            cmd::SET_MACRO_SIZE,
            &Layout::input_only(Descriptor::new().u16().u32()),
            &[Value::U16(id.0), Value::U32(size)],
            WaitPower::NORMAL,
        )?;
        Ok(())
    }

    /// Read the macro program; its size is queried first.
    pub fn get_macro_function(&self, id: MacroId) -> Result<Vec<u8>, DeviceError> {
        let mut link = self.link();
        let size = Self::macro_size(&mut link, id)? as usize;
        macro_function_stream().read(&mut link, cmd::GET_MACRO_FUNCTION, &[Value::U16(id.0)], size)
    }

    /// Store the macro program size, then the program itself.
    pub fn set_macro_function(&self, id: MacroId, data: &[u8]) -> Result<(), DeviceError> {
        let stream = macro_function_stream();
        let size = u32::try_from(data.len())
            .ok()
            .filter(|_| data.len() <= stream.limit())
            .ok_or_else(|| DeviceError::InvalidParameter(format!("macro program of {} bytes", data.len())))?;
        let mut link = self.link();
        Self::store_macro_size(&mut link, id, size)?;
        stream.write(&mut link, cmd::SET_MACRO_FUNCTION, &[Value::U16(id.0)], data)
    }
}
