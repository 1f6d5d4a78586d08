//! Flow-control transport layer
//!
//! `FlowControlTransport` wraps a raw `Transport` (which only sends and
//! receives individual frames) and adds query semantics: one frame out, one
//! frame back, with a bounded readiness wait when the device may still be
//! settling.
//!
//! ```text
//! [HidFeatureTransport / LoopbackTransport]  ← implements Transport (raw I/O)
//!                |
//!       [FlowControlTransport]               ← send_recv + readiness budget
//!                |
//!      [codec / transfer / Device]
//! ```

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FlowConfig;
use crate::error::TransportError;
use crate::frame::Frame;
use crate::Transport;

/// Exponent of the read-attempt budget for one exchange.
///
/// A power of `p` allows `2^p` reads, so only `NORMAL` gives up on the first
/// timeout. Any power above zero also waits `p` poll intervals before the
/// first read, since a device that is still switching state may answer
/// immediately with a stale reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WaitPower(pub u8);

impl WaitPower {
    /// Single read, no retry
    pub const NORMAL: WaitPower = WaitPower(0);
    /// Budget used right after state changes (mode switch, reset)
    pub const SETTLE: WaitPower = WaitPower(4);

    /// Number of read attempts allowed, after clamping to `max_power`.
    pub fn attempts(self, max_power: u8) -> u32 {
        1u32 << self.0.min(max_power).min(31)
    }

    /// Wait before the first read, after clamping to `max_power`.
    pub fn settle_ms(self, poll_interval_ms: u64, max_power: u8) -> u64 {
        poll_interval_ms.saturating_mul(u64::from(self.0.min(max_power)))
    }
}

/// A transport wrapper that pairs every sent frame with exactly one reply.
pub struct FlowControlTransport<T> {
    inner: T,
    config: FlowConfig,
}

impl<T: Transport> FlowControlTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FlowConfig::default())
    }

    pub fn with_config(inner: T, config: FlowConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Access the wrapped raw transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Send one frame and wait for its reply.
    ///
    /// The send is never repeated. Only read timeouts consume the wait
    /// budget; every other failure is returned immediately.
    pub fn send_recv(&mut self, frame: &Frame, power: WaitPower) -> Result<Frame, TransportError> {
        debug!("TX {:?}", frame);
        self.inner.send(frame)?;
        sleep_ms(self.config.command_delay_ms);

        let settle = power.settle_ms(self.config.poll_interval_ms, self.config.max_wait_power);
        if settle > 0 {
            debug!("Settling {} ms before reading {}", settle, frame.command());
            sleep_ms(settle);
        }

        let attempts = power.attempts(self.config.max_wait_power);
        for attempt in 1..=attempts {
            match self.inner.recv() {
                Ok(reply) => {
                    debug!("RX {:?}", reply);
                    return Ok(reply);
                }
                Err(TransportError::Timeout) if attempt < attempts => {
                    debug!(
                        "No reply for {} yet (attempt {}/{})",
                        frame.command(),
                        attempt,
                        attempts
                    );
                    sleep_ms(self.config.poll_interval_ms);
                }
                Err(TransportError::Timeout) => {
                    if attempts > 1 {
                        warn!(
                            "Device did not settle for {} after {} reads",
                            frame.command(),
                            attempts
                        );
                    }
                    return Err(TransportError::Timeout);
                }
                Err(e) => return Err(e),
            }
        }

        Err(TransportError::Timeout)
    }
}

fn sleep_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Instant;

    use super::*;
    use crate::frame::CommandId;

    /// Replies from a script; `None` entries time out.
    struct Scripted {
        replies: VecDeque<Option<Result<Frame, TransportError>>>,
        sends: usize,
        recvs: usize,
    }

    impl Scripted {
        fn new(replies: Vec<Option<Result<Frame, TransportError>>>) -> Self {
            Self {
                replies: replies.into(),
                sends: 0,
                recvs: 0,
            }
        }
    }

    impl Transport for Scripted {
        fn send(&mut self, _frame: &Frame) -> Result<(), TransportError> {
            self.sends += 1;
            Ok(())
        }

        fn recv(&mut self) -> Result<Frame, TransportError> {
            self.recvs += 1;
            match self.replies.pop_front() {
                Some(Some(reply)) => reply,
                _ => Err(TransportError::Timeout),
            }
        }
    }

    fn ready() -> Frame {
        Frame::new(CommandId::new(0x0086))
    }

    #[test]
    fn attempts_grow_with_power() {
        assert_eq!(WaitPower::NORMAL.attempts(8), 1);
        assert_eq!(WaitPower(1).attempts(8), 2);
        assert_eq!(WaitPower::SETTLE.attempts(8), 16);
        assert_eq!(WaitPower(12).attempts(8), 256);
    }

    #[test]
    fn settle_wait_grows_with_power() {
        assert_eq!(WaitPower::NORMAL.settle_ms(20, 8), 0);
        assert_eq!(WaitPower::SETTLE.settle_ms(20, 8), 80);
        assert_eq!(WaitPower(12).settle_ms(20, 8), 160);
        assert_eq!(WaitPower::SETTLE.settle_ms(0, 8), 0);
    }

    #[test]
    fn settle_waits_even_when_the_device_answers_at_once() {
        let config = FlowConfig {
            command_delay_ms: 0,
            poll_interval_ms: 15,
            max_wait_power: 8,
        };

        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![Some(Ok(ready()))]),
            config,
        );
        let start = Instant::now();
        link.send_recv(&ready(), WaitPower::NORMAL).unwrap();
        let normal = start.elapsed();
        assert_eq!(link.inner().recvs, 1);

        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![Some(Ok(ready()))]),
            config,
        );
        let start = Instant::now();
        link.send_recv(&ready(), WaitPower::SETTLE).unwrap();
        let settle = start.elapsed();
        assert_eq!(link.inner().recvs, 1);

        assert!(settle >= Duration::from_millis(60), "settled for {settle:?}");
        assert!(settle > normal);
    }

    #[test]
    fn normal_budget_gives_up_on_first_timeout() {
        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![None, Some(Ok(ready()))]),
            FlowConfig::immediate(),
        );
        let err = link.send_recv(&ready(), WaitPower::NORMAL).unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        assert_eq!(link.inner().sends, 1);
        assert_eq!(link.inner().recvs, 1);
    }

    #[test]
    fn settle_budget_polls_past_timeouts() {
        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![None, None, Some(Ok(ready()))]),
            FlowConfig::immediate(),
        );
        let reply = link.send_recv(&ready(), WaitPower::SETTLE).unwrap();
        assert_eq!(reply.command(), CommandId::new(0x0086));
        assert_eq!(link.inner().sends, 1);
        assert_eq!(link.inner().recvs, 3);
    }

    #[test]
    fn budget_is_bounded() {
        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![]),
            FlowConfig::immediate(),
        );
        assert!(link.send_recv(&ready(), WaitPower(2)).is_err());
        assert_eq!(link.inner().recvs, 4);
    }

    #[test]
    fn non_timeout_errors_are_not_retried() {
        let mut link = FlowControlTransport::with_config(
            Scripted::new(vec![
                Some(Err(TransportError::Disconnected)),
                Some(Ok(ready())),
            ]),
            FlowConfig::immediate(),
        );
        let err = link.send_recv(&ready(), WaitPower::SETTLE).unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
        assert_eq!(link.inner().recvs, 1);
    }
}
