//! Scriptable TAP mock shared by the unit tests

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::jtag::{JtagTap, TapState};

/// One recorded shift
pub(crate) struct Shift {
    /// Shift state the bits went through
    pub state: TapState,
    /// Bytes as handed to the driver
    pub tx: Vec<u8>,
    pub bits: usize,
    pub exit: bool,
}

type Responder = Box<dyn FnMut(&Shift, &mut [u8])>;

/// TAP mock that records everything and answers shifts through a closure
pub(crate) struct MockTap {
    pub state: TapState,
    /// Number of driver calls that would have reached the hardware
    pub calls: usize,
    /// Fail every call with a transport error
    pub fail: bool,
    pub delayed_us: u64,
    pub idle_cycles: u64,
    pub shifts: Vec<Shift>,
    responder: Option<Responder>,
}

impl MockTap {
    pub fn new() -> Self {
        Self {
            state: TapState::TestLogicReset,
            calls: 0,
            fail: false,
            delayed_us: 0,
            idle_cycles: 0,
            shifts: Vec::new(),
            responder: None,
        }
    }

    pub fn with_responder(responder: impl FnMut(&Shift, &mut [u8]) + 'static) -> Self {
        let mut tap = Self::new();
        tap.responder = Some(Box::new(responder));
        tap
    }

    fn hardware_call(&mut self) -> Result<()> {
        self.calls += 1;
        if self.fail {
            Err(Error::TransportFailed)
        } else {
            Ok(())
        }
    }
}

impl JtagTap for MockTap {
    fn state(&self) -> TapState {
        self.state
    }

    fn go_to_state(&mut self, target: TapState) -> Result<()> {
        self.hardware_call()?;
        self.state = target;
        Ok(())
    }

    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        self.hardware_call()?;
        let state = match self.state {
            TapState::CaptureDr => TapState::ShiftDr,
            TapState::CaptureIr => TapState::ShiftIr,
            other => other,
        };
        let shift = Shift {
            state,
            tx: data[..bits.div_ceil(8)].to_vec(),
            bits,
            exit,
        };
        if let Some(responder) = self.responder.as_mut() {
            responder(&shift, data);
        }
        self.shifts.push(shift);
        self.state = match (exit, state.is_dr()) {
            (false, _) => state,
            (true, true) => TapState::PauseDr,
            (true, false) => TapState::PauseIr,
        };
        Ok(())
    }

    fn run_idle(&mut self, cycles: u32) -> Result<()> {
        self.hardware_call()?;
        self.idle_cycles += cycles as u64;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += us as u64;
    }
}
