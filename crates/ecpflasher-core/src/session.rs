//! Hardware session
//!
//! A [`Session`] owns the TAP driver for the lifetime of one connection and
//! carries the state that the layers above share: timing configuration, the
//! identified device, and the sticky fault flag.
//!
//! Every TAP access goes through the session. Once a transfer fails, the
//! session refuses all further transfers with [`Error::SessionFaulted`]
//! without touching the driver again, so a device in an unknown state is
//! never written to. The only way out is to build a new session.

use crate::device::DeviceInfo;
use crate::error::{Error, ErrorKind, Result};
use crate::jtag::{JtagTap, TapState};

/// Default Run-Test/Idle clocks after a configuration command
pub const DEFAULT_SETTLE_CYCLES: u32 = 32;
/// Default delay between flash busy polls (1 ms)
pub const DEFAULT_POLL_INTERVAL_US: u32 = 1_000;
/// Default busy poll limit (about ten minutes at the default interval)
pub const DEFAULT_MAX_POLLS: u32 = 600_000;
/// Default delay between configuration commands in the probe sequence
pub const DEFAULT_PROBE_DELAY_US: u32 = 10_000;

/// Timing parameters for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Run-Test/Idle clocks after every configuration command
    pub settle_cycles: u32,
    /// Delay between flash busy polls
    pub poll_interval_us: u32,
    /// Give up waiting for the flash after this many polls (`None` waits forever)
    pub max_polls: Option<u32>,
    /// Delay between configuration commands in the probe sequence
    pub probe_delay_us: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_cycles: DEFAULT_SETTLE_CYCLES,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            max_polls: Some(DEFAULT_MAX_POLLS),
            probe_delay_us: DEFAULT_PROBE_DELAY_US,
        }
    }
}

/// One open connection to a target
pub struct Session<T> {
    tap: T,
    config: SessionConfig,
    device: Option<DeviceInfo>,
    faulted: bool,
}

impl<T: JtagTap> Session<T> {
    /// Start a session on a TAP driver with default timing
    pub fn new(tap: T) -> Self {
        Self::with_config(tap, SessionConfig::default())
    }

    /// Start a session on a TAP driver
    pub fn with_config(tap: T, config: SessionConfig) -> Self {
        Self {
            tap,
            config,
            device: None,
            faulted: false,
        }
    }

    /// Timing configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Device identified by the last IDCODE read, if any
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    pub(crate) fn set_device(&mut self, device: DeviceInfo) {
        self.device = Some(device);
    }

    /// Whether a transfer failure has disabled this session
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Borrow the TAP driver
    pub fn tap(&self) -> &T {
        &self.tap
    }

    /// End the session and hand back the TAP driver
    pub fn into_inner(self) -> T {
        self.tap
    }

    /// Current TAP state
    pub fn state(&self) -> TapState {
        self.tap.state()
    }

    fn check(&self) -> Result<()> {
        if self.faulted {
            Err(Error::SessionFaulted)
        } else {
            Ok(())
        }
    }

    fn record<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if e.kind() == ErrorKind::Hardware {
                self.fail(*e);
            }
        }
        result
    }

    /// Mark the session as faulted and pass the error through
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        if !self.faulted {
            log::error!("{}; no further transfers on this session", error);
            self.faulted = true;
        }
        error
    }

    /// Move the TAP to `target`
    pub fn go_to_state(&mut self, target: TapState) -> Result<()> {
        self.check()?;
        log::trace!("TAP {} -> {}", self.tap.state(), target);
        let result = self.tap.go_to_state(target);
        self.record(result)
    }

    /// Shift `bits` bits of `data` through the current register
    pub fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        self.check()?;
        if bits > data.len() * 8 {
            return Err(Error::BufferTooSmall);
        }
        let result = self.tap.shift(data, bits, exit);
        self.record(result)
    }

    /// Clock `cycles` TCK periods in Run-Test/Idle
    pub fn run_idle(&mut self, cycles: u32) -> Result<()> {
        self.check()?;
        let result = self.tap.run_idle(cycles);
        self.record(result)
    }

    /// Sleep without clocking the TAP
    pub fn delay_us(&mut self, us: u32) {
        self.tap.delay_us(us);
    }

    /// Load an 8-bit instruction into the instruction register
    ///
    /// Leaves the TAP in Pause-IR; the instruction takes effect on the way
    /// through Update-IR to the next state.
    pub fn shift_ir(&mut self, instruction: u8) -> Result<()> {
        self.go_to_state(TapState::ShiftIr)?;
        let mut data = [instruction];
        self.shift(&mut data, 8, true)
    }

    /// Shift a complete data register scan, ending in Pause-DR
    pub fn shift_dr(&mut self, data: &mut [u8], bits: usize) -> Result<()> {
        self.go_to_state(TapState::ShiftDr)?;
        self.shift(data, bits, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTap;

    #[test]
    fn test_sticky_fault_short_circuits() {
        let mut tap = MockTap::new();
        tap.fail = true;
        let mut session = Session::new(&mut tap);

        let mut data = [0u8; 2];
        assert_eq!(
            session.shift_dr(&mut data, 16),
            Err(Error::TransportFailed)
        );
        assert!(session.is_faulted());

        let calls = session.tap().calls;
        assert_eq!(session.go_to_state(TapState::RunTestIdle), Err(Error::SessionFaulted));
        assert_eq!(session.shift(&mut data, 16, true), Err(Error::SessionFaulted));
        assert_eq!(session.transact_spi(&mut data, 16), Err(Error::SessionFaulted));
        assert_eq!(session.stream_spi(&mut data, 16), Err(Error::SessionFaulted));
        assert_eq!(session.run_idle(32), Err(Error::SessionFaulted));
        assert_eq!(session.tap().calls, calls);
    }

    #[test]
    fn test_usage_error_does_not_fault() {
        let mut session = Session::new(MockTap::new());
        let mut data = [0u8; 1];
        assert_eq!(
            session.shift(&mut data, 9, true),
            Err(Error::BufferTooSmall)
        );
        assert!(!session.is_faulted());
        assert_eq!(session.tap().calls, 0);
    }

    #[test]
    fn test_shift_ir_parks_in_pause() {
        let mut session = Session::new(MockTap::new());
        session.shift_ir(0xE0).unwrap();
        assert_eq!(session.state(), TapState::PauseIr);
        let shifts = &session.tap().shifts;
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].state, TapState::ShiftIr);
        assert_eq!(shifts[0].tx, [0xE0]);
    }
}
