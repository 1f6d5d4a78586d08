//! Scripted fake mouse shared by the integration tests.
//!
//! `FakeMouse` decodes each request by command id, updates an in-memory
//! model of the device and echoes the request back with the output fields
//! filled in, the way the firmware does.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use qdrazer_device::protocol::cmd;
use qdrazer_device::{Device, FlowConfig};
use qdrazer_transport::{CommandId, Frame, Transport, TransportError};

pub const UNIT: usize = 64;

/// Marks reply bytes past the end of a resource
pub const STALE: u8 = 0xEE;

#[derive(Debug, Default, Clone)]
pub struct StoredMacro {
    pub info: Vec<u8>,
    pub program: Vec<u8>,
}

#[derive(Debug)]
pub struct MouseState {
    pub mode: (u8, u8),
    pub serial: Vec<u8>,
    pub firmware: [u8; 4],
    pub flash: (u16, u32, u32, u32),
    pub scroll_mode: HashMap<u8, u8>,
    pub scroll_acceleration: HashMap<u8, u8>,
    pub scroll_smart_reel: HashMap<u8, u8>,
    pub buttons: HashMap<(u8, u8, u8), [u8; 7]>,
    pub polling: HashMap<u8, u8>,
    pub dpi: HashMap<u8, [u8; 4]>,
    pub dpi_stages: HashMap<u8, Vec<u8>>,
    pub profile_total: u8,
    pub profiles: Vec<u8>,
    pub profile_info: HashMap<u8, Vec<u8>>,
    pub macros: BTreeMap<u16, StoredMacro>,

    /// Reads that time out before a readiness poll is answered
    pub not_ready: usize,
    /// Fail every send once this many frames have been accepted
    pub fail_after: Option<usize>,
    /// Overrides the command id echoed in the next reply
    pub wrong_echo: Option<CommandId>,
    /// Overrides the program size reported for every macro
    pub reported_macro_size: Option<u32>,

    pub sent: Vec<Frame>,
    pub recv_calls: usize,
    pending: Option<Frame>,
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            mode: (0, 0),
            serial: b"PM2143H12345678".to_vec(),
            firmware: [1, 2, 0, 3],
            flash: (256, 0x0004_0000, 0x0000_1200, 0x0003_EE00),
            scroll_mode: HashMap::new(),
            scroll_acceleration: HashMap::new(),
            scroll_smart_reel: HashMap::new(),
            buttons: HashMap::new(),
            polling: HashMap::new(),
            dpi: HashMap::new(),
            dpi_stages: HashMap::new(),
            profile_total: 5,
            profiles: vec![1],
            profile_info: HashMap::new(),
            macros: BTreeMap::new(),
            not_ready: 0,
            fail_after: None,
            wrong_echo: None,
            reported_macro_size: None,
            sent: Vec::new(),
            recv_calls: 0,
            pending: None,
        }
    }
}

impl MouseState {
    /// Command ids of every accepted frame, in order
    pub fn commands(&self) -> Vec<CommandId> {
        self.sent.iter().map(Frame::command).collect()
    }

    pub fn count(&self, command: CommandId) -> usize {
        self.sent.iter().filter(|f| f.command() == command).count()
    }
}

/// Transport half of the fake; clone the state handle before moving it
/// into a `Device`.
pub struct FakeMouse {
    state: Arc<Mutex<MouseState>>,
}

impl FakeMouse {
    pub fn new() -> (Self, Arc<Mutex<MouseState>>) {
        let state = Arc::new(Mutex::new(MouseState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

pub fn device() -> (Device<FakeMouse>, Arc<Mutex<MouseState>>) {
    init_tracing();
    let (mouse, state) = FakeMouse::new();
    (Device::with_config(mouse, FlowConfig::immediate()), state)
}

/// Honour RUST_LOG when debugging a test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn be16(b: &[u8]) -> usize {
    u16::from_be_bytes([b[0], b[1]]) as usize
}

fn be32(b: &[u8]) -> usize {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
}

/// Reply side of a size-prefixed read: total at `at`, chunk right after.
fn serve_chunk(blob: &[u8], offset: usize, counter: usize, at: usize, out: &mut [u8]) {
    let total = blob.len();
    out[at..at + counter].copy_from_slice(&(total as u32).to_be_bytes()[4 - counter..]);
    let start = at + counter;
    let from = offset.min(total);
    let to = (offset + UNIT).min(total);
    out[start..start + UNIT].fill(STALE);
    out[start..start + (to - from)].copy_from_slice(&blob[from..to]);
}

/// Request side of a size-prefixed write.
fn store_chunk(blob: &mut Vec<u8>, position: usize, size: usize, chunk: &[u8]) {
    if position == 0 {
        blob.clear();
        blob.resize(size, 0);
    }
    let len = UNIT.min(size - position);
    blob[position..position + len].copy_from_slice(&chunk[..len]);
}

impl MouseState {
    fn handle(&mut self, request: &Frame) -> Frame {
        let mut reply = request.clone();
        let p = request.payload();
        let out = reply.payload_mut();

        match request.command() {
            cmd::SET_DEVICE_MODE => self.mode = (p[0], p[1]),
            cmd::GET_DEVICE_MODE => {
                out[0] = self.mode.0;
                out[1] = self.mode.1;
            }
            cmd::GET_SERIAL => {
                out[..16].fill(0);
                out[..self.serial.len()].copy_from_slice(&self.serial);
            }
            cmd::GET_FIRMWARE_VERSION => out[..4].copy_from_slice(&self.firmware),
            cmd::GET_FLASH_USAGE => {
                let (page, total, used, free) = self.flash;
                out[0..2].copy_from_slice(&page.to_be_bytes());
                out[2..6].copy_from_slice(&total.to_be_bytes());
                out[6..10].copy_from_slice(&used.to_be_bytes());
                out[10..14].copy_from_slice(&free.to_be_bytes());
            }
            cmd::GET_DEVICE_READY => {}

            cmd::SET_SCROLL_MODE => {
                self.scroll_mode.insert(p[0], p[1]);
            }
            cmd::GET_SCROLL_MODE => out[1] = self.scroll_mode.get(&p[0]).copied().unwrap_or(0),
            cmd::SET_SCROLL_ACCELERATION => {
                self.scroll_acceleration.insert(p[0], p[1]);
            }
            cmd::GET_SCROLL_ACCELERATION => {
                out[1] = self.scroll_acceleration.get(&p[0]).copied().unwrap_or(0)
            }
            cmd::SET_SCROLL_SMART_REEL => {
                self.scroll_smart_reel.insert(p[0], p[1]);
            }
            cmd::GET_SCROLL_SMART_REEL => {
                out[1] = self.scroll_smart_reel.get(&p[0]).copied().unwrap_or(0)
            }

            cmd::SET_BUTTON_FUNCTION => {
                let mut function = [0u8; 7];
                function.copy_from_slice(&p[3..10]);
                self.buttons.insert((p[0], p[1], p[2]), function);
            }
            cmd::GET_BUTTON_FUNCTION => {
                let function = self.buttons.get(&(p[0], p[1], p[2])).copied().unwrap_or_default();
                out[3..10].copy_from_slice(&function);
            }

            cmd::SET_POLLING_RATE => {
                self.polling.insert(p[0], p[1]);
            }
            cmd::GET_POLLING_RATE => out[1] = self.polling.get(&p[0]).copied().unwrap_or(1),

            cmd::SET_DPI_XY => {
                let mut xy = [0u8; 4];
                xy.copy_from_slice(&p[1..5]);
                self.dpi.insert(p[0], xy);
            }
            cmd::GET_DPI_XY => {
                let xy = self.dpi.get(&p[0]).copied().unwrap_or([0x03, 0x20, 0x03, 0x20]);
                out[1..5].copy_from_slice(&xy);
            }
            cmd::SET_DPI_STAGES => {
                self.dpi_stages.insert(p[0], p[1..38].to_vec());
            }
            cmd::GET_DPI_STAGES => {
                if let Some(record) = self.dpi_stages.get(&p[0]) {
                    out[1..38].copy_from_slice(record);
                }
            }

            cmd::GET_PROFILE_TOTAL_COUNT => out[0] = self.profile_total,
            cmd::GET_PROFILE_AVAILABLE_COUNT => out[0] = self.profiles.len() as u8,
            cmd::GET_PROFILE_LIST => {
                out[0] = self.profiles.len() as u8;
                out[1..1 + self.profiles.len()].copy_from_slice(&self.profiles);
            }
            cmd::NEW_PROFILE => {
                if !self.profiles.contains(&p[0]) {
                    self.profiles.push(p[0]);
                }
            }
            cmd::DELETE_PROFILE => {
                self.profiles.retain(|&id| id != p[0]);
                self.profile_info.remove(&p[0]);
            }
            cmd::GET_PROFILE_INFO => {
                let blob = self.profile_info.get(&p[0]).cloned().unwrap_or_default();
                serve_chunk(&blob, be16(&p[1..3]), 2, 3, out);
            }
            cmd::SET_PROFILE_INFO => {
                let blob = self.profile_info.entry(p[0]).or_default();
                store_chunk(blob, be16(&p[1..3]), be16(&p[3..5]), &p[5..]);
            }

            cmd::GET_MACRO_COUNT => {
                out[..2].copy_from_slice(&(self.macros.len() as u16).to_be_bytes())
            }
            cmd::GET_MACRO_LIST => {
                let ids: Vec<u8> = self.macros.keys().flat_map(|id| id.to_be_bytes()).collect();
                let offset = be16(&p[0..2]);
                out[2..4].copy_from_slice(&(self.macros.len() as u16).to_be_bytes());
                let from = (offset * 2).min(ids.len());
                let to = ((offset + 32) * 2).min(ids.len());
                out[4..4 + (to - from)].copy_from_slice(&ids[from..to]);
            }
            cmd::GET_MACRO_INFO => {
                let blob = self
                    .macros
                    .get(&(be16(&p[0..2]) as u16))
                    .map(|m| m.info.clone())
                    .unwrap_or_default();
                serve_chunk(&blob, be16(&p[2..4]), 2, 4, out);
            }
            cmd::SET_MACRO_INFO => {
                let stored = self.macros.entry(be16(&p[0..2]) as u16).or_default();
                store_chunk(&mut stored.info, be16(&p[2..4]), be16(&p[4..6]), &p[6..]);
            }
            cmd::DELETE_MACRO => {
                self.macros.remove(&(be16(&p[0..2]) as u16));
            }
            cmd::GET_MACRO_SIZE => {
                let size = self
                    .macros
                    .get(&(be16(&p[0..2]) as u16))
                    .map_or(0, |m| m.program.len() as u32);
                let size = self.reported_macro_size.unwrap_or(size);
                out[2..6].copy_from_slice(&size.to_be_bytes());
            }
            cmd::SET_MACRO_SIZE => {
                let stored = self.macros.entry(be16(&p[0..2]) as u16).or_default();
                stored.program = vec![0; be32(&p[2..6])];
            }
            cmd::GET_MACRO_FUNCTION => {
                let program = self
                    .macros
                    .get(&(be16(&p[0..2]) as u16))
                    .map(|m| m.program.clone())
                    .unwrap_or_default();
                let offset = be32(&p[2..6]);
                let requested = p[6] as usize;
                let from = offset.min(program.len());
                let to = (offset + requested).min(program.len());
                out[7..7 + requested].fill(STALE);
                out[7..7 + (to - from)].copy_from_slice(&program[from..to]);
            }
            cmd::SET_MACRO_FUNCTION => {
                let stored = self.macros.entry(be16(&p[0..2]) as u16).or_default();
                let offset = be32(&p[2..6]);
                let len = p[6] as usize;
                stored.program[offset..offset + len].copy_from_slice(&p[7..7 + len]);
            }
            _ => {}
        }

        match self.wrong_echo.take() {
            Some(id) => Frame::with_payload(id, reply.payload()).unwrap_or(reply),
            None => reply,
        }
    }
}

impl Transport for FakeMouse {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_after.is_some_and(|n| state.sent.len() >= n) {
            return Err(TransportError::Disconnected);
        }
        state.sent.push(frame.clone());
        let reply = state.handle(frame);
        state.pending = Some(reply);
        Ok(())
    }

    fn recv(&mut self) -> Result<Frame, TransportError> {
        let mut state = self.state.lock();
        state.recv_calls += 1;
        let waiting = state
            .pending
            .as_ref()
            .is_some_and(|f| f.command() == cmd::GET_DEVICE_READY);
        if waiting && state.not_ready > 0 {
            state.not_ready -= 1;
            return Err(TransportError::Timeout);
        }
        state.pending.take().ok_or(TransportError::Timeout)
    }
}
