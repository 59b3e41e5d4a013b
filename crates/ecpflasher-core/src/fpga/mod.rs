//! Configuration logic command sequencer
//!
//! These are instructions for the FPGA's own configuration engine, issued
//! through the JTAG instruction register. They are distinct from the SPI
//! flash opcodes in [`crate::spi::opcodes`], which only reach the flash
//! once [`enter_spi_passthrough`] has released the SPI bus.

use core::fmt;

use crate::error::Result;
use crate::flash::{Phase, Progress};
use crate::jtag::{JtagTap, TapState};
use crate::session::Session;
use crate::spi::reverse_buffer;
use crate::status::StatusRegister;

/// Configuration instruction opcodes (ECP5 and NX)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// No operation
    Noop = 0xFF,
    /// Read IDCODE
    ReadId = 0xE0,
    /// Read USERCODE
    Usercode = 0xC0,
    /// Read configuration status register
    ReadStatus = 0x3C,
    /// Reboot from the configuration source
    Refresh = 0x79,
    /// Enable the configuration interface
    Enable = 0xC6,
    /// Disable the configuration interface
    Disable = 0x26,
    /// Erase configuration memory
    Erase = 0x0E,
    /// Stream a bitstream into SRAM
    BitstreamBurst = 0x7A,
    /// Reset the bitstream CRC
    ResetCrc = 0x3B,
    /// Release the SPI bus to JTAG
    BackgroundSpi = 0x3A,
}

impl Command {
    /// Instruction register value
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Mnemonic as used in Lattice documentation
    pub fn name(self) -> &'static str {
        match self {
            Self::Noop => "ISC_NOOP",
            Self::ReadId => "READ_ID",
            Self::Usercode => "USERCODE",
            Self::ReadStatus => "LSC_READ_STATUS",
            Self::Refresh => "LSC_REFRESH",
            Self::Enable => "ISC_ENABLE",
            Self::Disable => "ISC_DISABLE",
            Self::Erase => "ISC_ERASE",
            Self::BitstreamBurst => "LSC_BITSTREAM_BURST",
            Self::ResetCrc => "LSC_RESET_CRC",
            Self::BackgroundSpi => "LSC_BACKGROUND_SPI",
        }
    }

    /// Decode an instruction register value
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode {
            0xFF => Self::Noop,
            0xE0 => Self::ReadId,
            0xC0 => Self::Usercode,
            0x3C => Self::ReadStatus,
            0x79 => Self::Refresh,
            0xC6 => Self::Enable,
            0x26 => Self::Disable,
            0x0E => Self::Erase,
            0x7A => Self::BitstreamBurst,
            0x3B => Self::ResetCrc,
            0x3A => Self::BackgroundSpi,
            _ => return None,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.opcode())
    }
}

/// Unlock bytes shifted after LSC_BACKGROUND_SPI
pub const BACKGROUND_SPI_KEY: [u8; 2] = [0xFE, 0x68];

/// Bytes per shift while streaming a bitstream into SRAM
pub const SRAM_CHUNK_SIZE: usize = 16 * 1024;

/// Issue an instruction and let it settle in Run-Test/Idle
pub fn command<T: JtagTap>(session: &mut Session<T>, cmd: Command) -> Result<()> {
    log::debug!("config command {}", cmd);
    session.shift_ir(cmd.opcode())?;
    settle(session)
}

/// Issue an instruction with a one-byte DR parameter and let it settle
pub fn command8<T: JtagTap>(session: &mut Session<T>, cmd: Command, param: u8) -> Result<()> {
    log::debug!("config command {} param 0x{:02X}", cmd, param);
    session.shift_ir(cmd.opcode())?;
    let mut data = [param];
    session.shift_dr(&mut data, 8)?;
    settle(session)
}

fn settle<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    session.go_to_state(TapState::RunTestIdle)?;
    let cycles = session.config().settle_cycles;
    session.run_idle(cycles)
}

/// Hand the SPI bus to JTAG
///
/// Afterwards every Shift-DR scan is a SPI transaction with the flash
/// until another instruction is loaded.
pub fn enter_spi_passthrough<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    log::debug!("entering SPI background mode");
    session.shift_ir(Command::BackgroundSpi.opcode())?;
    let mut key = BACKGROUND_SPI_KEY;
    session.shift_dr(&mut key, 16)?;
    // The key only takes effect on the way through Run-Test/Idle
    session.go_to_state(TapState::RunTestIdle)
}

/// Stop the configuration engine from driving the SPI bus
///
/// Enables the interface, erases SRAM and disables it again so the FPGA
/// sits unconfigured and the flash pins are free.
pub fn release_spi<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    command8(session, Command::Enable, 0)?;
    command8(session, Command::Erase, 0)?;
    command8(session, Command::Disable, 0)
}

/// Read the 32-bit USERCODE
pub fn read_usercode<T: JtagTap>(session: &mut Session<T>) -> Result<u32> {
    session.shift_ir(Command::Usercode.opcode())?;
    let mut data = [0u8; 4];
    session.shift_dr(&mut data, 32)?;
    Ok(u32::from_le_bytes(data))
}

/// Reboot the FPGA from its configuration flash
pub fn refresh<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    log::info!("rebooting FPGA");
    command(session, Command::Refresh)
}

/// Load a bitstream into configuration SRAM
///
/// The whole image goes out as one continuous DR scan entered through
/// Capture-DR, so the bitstream engine sees an unbroken stream. Returns
/// the status register read after the interface is disabled again.
pub fn load_sram<T, P>(session: &mut Session<T>, image: &[u8], progress: &mut P) -> Result<StatusRegister>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    log::info!("loading {} bytes into SRAM", image.len());
    command8(session, Command::Enable, 0)?;
    command8(session, Command::Erase, 0)?;
    command8(session, Command::ResetCrc, 0)?;
    session.read_status()?;

    command(session, Command::BitstreamBurst)?;

    progress.start(Phase::LoadingSram, image.len());
    let mut buf = [0u8; SRAM_CHUNK_SIZE];
    let mut done = 0;
    for chunk in image.chunks(SRAM_CHUNK_SIZE) {
        let data = &mut buf[..chunk.len()];
        data.copy_from_slice(chunk);
        reverse_buffer(data);
        if session.state() != TapState::ShiftDr {
            session.go_to_state(TapState::CaptureDr)?;
        }
        session.shift(data, chunk.len() * 8, false)?;
        done += chunk.len();
        progress.advance(done);
    }
    progress.finish();

    command(session, Command::Disable)?;
    let status = session.read_status()?;
    if status.done() {
        log::info!("configuration done");
    } else {
        log::warn!("DONE is not set after loading SRAM");
    }
    Ok(status)
}
