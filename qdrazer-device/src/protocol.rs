//! Protocol constants for the configuration command set

use qdrazer_transport::CommandId;

/// Command identifiers (group << 8 | sub-command)
///
/// Getters usually set bit 7 of the sub-command of the matching setter.
pub mod cmd {
    use super::CommandId;

    // Device (group 0x00)
    pub const SET_DEVICE_MODE: CommandId = CommandId::new(0x0004);
    pub const SET_POLLING_RATE: CommandId = CommandId::new(0x000E);
    pub const GET_FIRMWARE_VERSION: CommandId = CommandId::new(0x0081);
    pub const GET_SERIAL: CommandId = CommandId::new(0x0082);
    pub const GET_DEVICE_MODE: CommandId = CommandId::new(0x0084);
    pub const GET_DEVICE_READY: CommandId = CommandId::new(0x0086);
    pub const GET_POLLING_RATE: CommandId = CommandId::new(0x008E);

    // Buttons and scroll wheel (group 0x02)
    pub const SET_BUTTON_FUNCTION: CommandId = CommandId::new(0x020C);
    pub const SET_SCROLL_MODE: CommandId = CommandId::new(0x0214);
    pub const SET_SCROLL_ACCELERATION: CommandId = CommandId::new(0x0216);
    pub const SET_SCROLL_SMART_REEL: CommandId = CommandId::new(0x0217);
    pub const GET_BUTTON_FUNCTION: CommandId = CommandId::new(0x028C);
    pub const GET_SCROLL_MODE: CommandId = CommandId::new(0x0294);
    pub const GET_SCROLL_ACCELERATION: CommandId = CommandId::new(0x0296);
    pub const GET_SCROLL_SMART_REEL: CommandId = CommandId::new(0x0297);

    // Sensor (group 0x04)
    pub const SET_DPI_XY: CommandId = CommandId::new(0x0405);
    pub const SET_DPI_STAGES: CommandId = CommandId::new(0x0406);
    pub const GET_DPI_XY: CommandId = CommandId::new(0x0485);
    pub const GET_DPI_STAGES: CommandId = CommandId::new(0x0486);

    // Profiles (group 0x05)
    pub const NEW_PROFILE: CommandId = CommandId::new(0x0502);
    pub const DELETE_PROFILE: CommandId = CommandId::new(0x0503);
    pub const SET_PROFILE_INFO: CommandId = CommandId::new(0x0508);
    pub const GET_PROFILE_AVAILABLE_COUNT: CommandId = CommandId::new(0x0580);
    pub const GET_PROFILE_LIST: CommandId = CommandId::new(0x0581);
    pub const GET_PROFILE_INFO: CommandId = CommandId::new(0x0588);
    pub const GET_PROFILE_TOTAL_COUNT: CommandId = CommandId::new(0x058A);

    // Macros (group 0x06)
    pub const DELETE_MACRO: CommandId = CommandId::new(0x0603);
    pub const SET_MACRO_SIZE: CommandId = CommandId::new(0x0608);
    pub const SET_MACRO_FUNCTION: CommandId = CommandId::new(0x0609);
    pub const SET_MACRO_INFO: CommandId = CommandId::new(0x060C);
    pub const GET_MACRO_COUNT: CommandId = CommandId::new(0x0680);
    pub const GET_MACRO_SIZE: CommandId = CommandId::new(0x0688);
    pub const GET_MACRO_FUNCTION: CommandId = CommandId::new(0x0689);
    pub const GET_MACRO_LIST: CommandId = CommandId::new(0x068B);
    pub const GET_MACRO_INFO: CommandId = CommandId::new(0x068C);
    pub const GET_FLASH_USAGE: CommandId = CommandId::new(0x068E);

    /// Get human-readable name for a command id
    pub fn name(id: CommandId) -> &'static str {
        match id {
            SET_DEVICE_MODE => "SET_DEVICE_MODE",
            SET_POLLING_RATE => "SET_POLLING_RATE",
            GET_FIRMWARE_VERSION => "GET_FIRMWARE_VERSION",
            GET_SERIAL => "GET_SERIAL",
            GET_DEVICE_MODE => "GET_DEVICE_MODE",
            GET_DEVICE_READY => "GET_DEVICE_READY",
            GET_POLLING_RATE => "GET_POLLING_RATE",
            SET_BUTTON_FUNCTION => "SET_BUTTON_FUNCTION",
            SET_SCROLL_MODE => "SET_SCROLL_MODE",
            SET_SCROLL_ACCELERATION => "SET_SCROLL_ACCELERATION",
            SET_SCROLL_SMART_REEL => "SET_SCROLL_SMART_REEL",
            GET_BUTTON_FUNCTION => "GET_BUTTON_FUNCTION",
            GET_SCROLL_MODE => "GET_SCROLL_MODE",
            GET_SCROLL_ACCELERATION => "GET_SCROLL_ACCELERATION",
            GET_SCROLL_SMART_REEL => "GET_SCROLL_SMART_REEL",
            SET_DPI_XY => "SET_DPI_XY",
            SET_DPI_STAGES => "SET_DPI_STAGES",
            GET_DPI_XY => "GET_DPI_XY",
            GET_DPI_STAGES => "GET_DPI_STAGES",
            NEW_PROFILE => "NEW_PROFILE",
            DELETE_PROFILE => "DELETE_PROFILE",
            SET_PROFILE_INFO => "SET_PROFILE_INFO",
            GET_PROFILE_AVAILABLE_COUNT => "GET_PROFILE_AVAILABLE_COUNT",
            GET_PROFILE_LIST => "GET_PROFILE_LIST",
            GET_PROFILE_INFO => "GET_PROFILE_INFO",
            GET_PROFILE_TOTAL_COUNT => "GET_PROFILE_TOTAL_COUNT",
            DELETE_MACRO => "DELETE_MACRO",
            SET_MACRO_SIZE => "SET_MACRO_SIZE",
            SET_MACRO_FUNCTION => "SET_MACRO_FUNCTION",
            SET_MACRO_INFO => "SET_MACRO_INFO",
            GET_MACRO_COUNT => "GET_MACRO_COUNT",
            GET_MACRO_SIZE => "GET_MACRO_SIZE",
            GET_MACRO_FUNCTION => "GET_MACRO_FUNCTION",
            GET_MACRO_LIST => "GET_MACRO_LIST",
            GET_MACRO_INFO => "GET_MACRO_INFO",
            GET_FLASH_USAGE => "GET_FLASH_USAGE",
            _ => "UNKNOWN",
        }
    }
}

/// Bulk transfer unit sizes
pub mod chunk {
    /// Bytes per profile/macro info exchange
    pub const INFO_UNIT: usize = 64;
    /// Macro ids per list exchange
    pub const MACRO_LIST_UNIT: usize = 32;
    /// Bytes per macro program exchange
    pub const MACRO_FUNCTION_UNIT: usize = 64;
    /// Largest macro program accepted in either direction (whole flash)
    pub const MAX_MACRO_PROGRAM: usize = 0x4_0000;
}

/// Fixed field widths
pub mod layout {
    /// Serial number string
    pub const SERIAL_LEN: usize = 16;
    /// Opaque button function record
    pub const BUTTON_FUNCTION_LEN: usize = 7;
    /// Number of DPI stage slots in one record
    pub const MAX_DPI_STAGES: usize = 5;
    /// Bytes per DPI stage slot (index, x, y, 2 reserved)
    pub const DPI_STAGE_LEN: usize = 7;
}
