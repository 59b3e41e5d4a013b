//! TAP driver trait definition

use crate::error::Result;
use crate::jtag::TapState;

/// A JTAG TAP driver
///
/// This trait is the seam between the protocol engine and whatever clocks
/// TCK/TMS/TDI: an FTDI MPSSE engine, an emulator, or a test mock. The
/// driver owns the TAP state tracking; the engine only asks for states and
/// shifts.
///
/// ## Shift contract
///
/// `shift` clocks `bits` bits of `data` out on TDI, least significant bit
/// of `data[0]` first, and overwrites the same bits with what was sampled
/// on TDO. It is legal in Shift-DR or Shift-IR, and in Capture-DR or
/// Capture-IR, in which case the driver first clocks one TMS=0 cycle to
/// enter the shift state.
///
/// With `exit` set, the final bit is clocked together with TMS=1 and the
/// driver then parks the TAP in Pause-DR/Pause-IR. Without it, the TAP stays
/// in the shift state so the next call continues the same scan.
pub trait JtagTap {
    /// Current TAP controller state
    fn state(&self) -> TapState;

    /// Move the TAP to `target` along the shortest TMS path
    ///
    /// A no-op when already there. Test-Logic-Reset is reached with five
    /// TMS=1 clocks.
    fn go_to_state(&mut self, target: TapState) -> Result<()>;

    /// Full-duplex shift through the currently selected register
    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()>;

    /// Clock `cycles` TCK periods in Run-Test/Idle
    fn run_idle(&mut self, cycles: u32) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: JtagTap + ?Sized> JtagTap for &mut T {
    fn state(&self) -> TapState {
        (**self).state()
    }

    fn go_to_state(&mut self, target: TapState) -> Result<()> {
        (**self).go_to_state(target)
    }

    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        (**self).shift(data, bits, exit)
    }

    fn run_idle(&mut self, cycles: u32) -> Result<()> {
        (**self).run_idle(cycles)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

// Blanket impl for boxed drivers to allow trait objects
impl JtagTap for alloc::boxed::Box<dyn JtagTap + Send> {
    fn state(&self) -> TapState {
        (**self).state()
    }

    fn go_to_state(&mut self, target: TapState) -> Result<()> {
        (**self).go_to_state(target)
    }

    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        (**self).shift(data, bits, exit)
    }

    fn run_idle(&mut self, cycles: u32) -> Result<()> {
        (**self).run_idle(cycles)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
