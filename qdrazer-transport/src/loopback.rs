//! In-memory loopback transport
//!
//! Every sent frame is queued and handed back unchanged by the next `recv`.
//! Useful for dry runs of command layouts without hardware.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::frame::Frame;
use crate::Transport;

#[derive(Debug, Default)]
struct LoopbackState {
    pending: VecDeque<Frame>,
    sent: Vec<Frame>,
    recvs: usize,
}

/// Transport that echoes each request back as its own reply.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

/// Read-only view of a `LoopbackTransport` that stays usable after the
/// transport has been moved into a device.
#[derive(Debug, Clone)]
pub struct LoopbackProbe {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> LoopbackProbe {
        LoopbackProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl LoopbackProbe {
    /// Every frame sent so far, oldest first
    pub fn sent(&self) -> Vec<Frame> {
        self.state.lock().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn recv_count(&self) -> usize {
        self.state.lock().recvs
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.sent.push(frame.clone());
        state.pending.push_back(frame.clone());
        Ok(())
    }

    fn recv(&mut self) -> Result<Frame, TransportError> {
        let mut state = self.state.lock();
        state.recvs += 1;
        state.pending.pop_front().ok_or(TransportError::Timeout)
    }
}
