//! ecpflasher-dummy - In-memory ECP5/NX emulator for testing
//!
//! [`DummyFpga`] implements [`JtagTap`] by clocking an emulated TAP
//! controller one TCK at a time. Behind it sit a minimal model of the
//! Lattice configuration engine (IDCODE, status register, SRAM bitstream
//! loading, background SPI) and an SPI NOR flash. It lets the whole engine
//! run without hardware, both in tests and via `--programmer dummy`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod flash;

pub use flash::SpiFlash;

use alloc::vec::Vec;

use ecpflasher_core::error::{Error, Result};
use ecpflasher_core::fpga::{Command, BACKGROUND_SPI_KEY};
use ecpflasher_core::jtag::{JtagTap, TapState};

const STATUS_DONE: u64 = 1 << 8;
const STATUS_ISC_ENABLE: u64 = 1 << 9;

/// Value shifted out of the instruction register during Capture-IR
const IR_CAPTURE: u8 = 0x01;

/// Configuration for the emulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JTAG IDCODE
    pub idcode: u32,
    /// USERCODE
    pub usercode: u32,
    /// Flash JEDEC ID bytes
    pub jedec_id: [u8; 3],
    /// Flash size in bytes
    pub flash_size: usize,
    /// Status reads a write/erase stays busy for
    pub busy_polls: u32,
    /// Protection bits of flash status register 1 at power-up
    pub initial_sr1: u8,
    /// Protection bits cannot be changed
    pub sr1_locked: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            idcode: 0x4111_3043, // LFE5U-85
            usercode: 0xFFFF_FFFF,
            jedec_id: [0xEF, 0x40, 0x18], // W25Q128
            flash_size: 16 * 1024 * 1024,
            busy_polls: 2,
            initial_sr1: 0,
            sr1_locked: false,
        }
    }
}

impl DummyConfig {
    /// Default target with a 1 MiB flash, for tests
    pub fn small() -> Self {
        Self {
            jedec_id: [0xEF, 0x40, 0x14], // W25Q80
            flash_size: 1024 * 1024,
            ..Self::default()
        }
    }
}

/// Emulated FPGA behind a JTAG TAP
pub struct DummyFpga {
    state: TapState,
    ir: u8,
    ir_in: u8,
    ir_bits: usize,
    dr_out: u64,
    dr_in: u64,
    dr_bits: usize,

    idcode: u32,
    usercode: u32,
    status: u64,
    passthrough: bool,
    sram: Vec<u8>,
    sram_byte: u8,
    sram_bits: u8,
    flash: SpiFlash,

    commands: Vec<u8>,
    calls: usize,
    fail_after: Option<usize>,
    delayed_us: u64,
}

impl DummyFpga {
    /// Create an emulated target
    pub fn new(config: DummyConfig) -> Self {
        let mut flash = SpiFlash::new(config.flash_size, config.jedec_id, config.busy_polls);
        flash.set_protection(config.initial_sr1, config.sr1_locked);
        Self {
            state: TapState::TestLogicReset,
            ir: Command::ReadId.opcode(),
            ir_in: 0,
            ir_bits: 0,
            dr_out: 0,
            dr_in: 0,
            dr_bits: 0,
            idcode: config.idcode,
            usercode: config.usercode,
            status: 0,
            passthrough: false,
            sram: Vec::new(),
            sram_byte: 0,
            sram_bits: 0,
            flash,
            commands: Vec::new(),
            calls: 0,
            fail_after: None,
            delayed_us: 0,
        }
    }

    /// Create an emulated LFE5U-85 with a 16 MiB flash
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Bitstream bytes received by the last SRAM load
    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    /// The attached flash
    pub fn flash(&self) -> &SpiFlash {
        &self.flash
    }

    /// The attached flash, mutable
    pub fn flash_mut(&mut self) -> &mut SpiFlash {
        &mut self.flash
    }

    /// Every instruction loaded, in order
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// Configuration status register
    pub fn status(&self) -> u64 {
        self.status
    }

    /// Whether the SPI bus is handed to JTAG
    pub fn passthrough(&self) -> bool {
        self.passthrough
    }

    /// Total time spent in `delay_us`
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us
    }

    /// Make every driver call after the first `calls` fail
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(calls);
    }

    /// Driver calls made so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn hardware_call(&mut self) -> Result<()> {
        self.calls += 1;
        match self.fail_after {
            Some(limit) if self.calls > limit => Err(Error::TransportFailed),
            _ => Ok(()),
        }
    }

    fn spi_routed(&self) -> bool {
        self.passthrough && self.ir == Command::BackgroundSpi.opcode()
    }

    /// One TCK: sample TDI/drive TDO in the current state, then move
    fn clock(&mut self, tms: bool, tdi: bool) -> bool {
        let tdo = match self.state {
            TapState::ShiftDr => self.shift_dr_bit(tdi),
            TapState::ShiftIr => {
                let tdo = self.ir_bits < 8 && IR_CAPTURE & (1 << self.ir_bits) != 0;
                if self.ir_bits < 8 {
                    self.ir_in |= (tdi as u8) << self.ir_bits;
                }
                self.ir_bits += 1;
                tdo
            }
            _ => false,
        };

        let from = self.state;
        let to = from.next(tms);
        if from == TapState::ShiftDr && to != TapState::ShiftDr && self.flash.is_selected() {
            self.flash.deselect();
        }
        self.state = to;
        if to != from || to == TapState::TestLogicReset {
            self.enter(to);
        }
        tdo
    }

    fn shift_dr_bit(&mut self, tdi: bool) -> bool {
        if self.flash.is_selected() {
            return self.flash.clock(tdi);
        }
        if self.ir == Command::BitstreamBurst.opcode() {
            // Bitstream bytes arrive MSB first
            self.sram_byte = (self.sram_byte << 1) | tdi as u8;
            self.sram_bits += 1;
            if self.sram_bits == 8 {
                self.sram.push(self.sram_byte);
                self.sram_bits = 0;
                self.sram_byte = 0;
            }
            return false;
        }
        let tdo = self.dr_bits < 64 && self.dr_out & (1 << self.dr_bits) != 0;
        if self.dr_bits < 64 {
            self.dr_in |= (tdi as u64) << self.dr_bits;
        }
        self.dr_bits += 1;
        tdo
    }

    fn enter(&mut self, state: TapState) {
        match state {
            TapState::TestLogicReset => {
                self.ir = Command::ReadId.opcode();
                self.passthrough = false;
            }
            TapState::CaptureDr => {
                self.dr_in = 0;
                self.dr_bits = 0;
                self.dr_out = match Command::from_opcode(self.ir) {
                    Some(Command::ReadId) => self.idcode as u64,
                    Some(Command::Usercode) => self.usercode as u64,
                    Some(Command::ReadStatus) => self.status,
                    _ => 0,
                };
            }
            TapState::ShiftDr => {
                if self.spi_routed() && !self.flash.is_selected() {
                    self.flash.select();
                }
            }
            TapState::UpdateDr => {
                let key = u16::from_le_bytes(BACKGROUND_SPI_KEY) as u64;
                if self.ir == Command::BackgroundSpi.opcode() && self.dr_bits == 16 && self.dr_in == key {
                    log::debug!("dummy: SPI background mode unlocked");
                    self.passthrough = true;
                }
            }
            TapState::CaptureIr => {
                self.ir_in = 0;
                self.ir_bits = 0;
            }
            TapState::UpdateIr => self.update_ir(),
            _ => {}
        }
    }

    fn update_ir(&mut self) {
        self.ir = self.ir_in;
        self.commands.push(self.ir);
        match Command::from_opcode(self.ir) {
            Some(cmd) => log::debug!("dummy: instruction {}", cmd),
            None => log::debug!("dummy: unknown instruction 0x{:02X}", self.ir),
        }

        if self.ir != Command::BackgroundSpi.opcode() {
            self.passthrough = false;
        }
        match Command::from_opcode(self.ir) {
            Some(Command::Enable) => self.status |= STATUS_ISC_ENABLE,
            Some(Command::Disable) => {
                self.status &= !STATUS_ISC_ENABLE;
                if !self.sram.is_empty() {
                    self.status |= STATUS_DONE;
                }
            }
            Some(Command::Erase) => {
                self.sram.clear();
                self.status &= !STATUS_DONE;
            }
            Some(Command::BitstreamBurst) => {
                self.sram.clear();
                self.sram_bits = 0;
                self.sram_byte = 0;
            }
            _ => {}
        }
    }
}

impl JtagTap for DummyFpga {
    fn state(&self) -> TapState {
        self.state
    }

    fn go_to_state(&mut self, target: TapState) -> Result<()> {
        self.hardware_call()?;
        for tms in self.state.path_to(target).iter() {
            self.clock(tms, false);
        }
        Ok(())
    }

    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        self.hardware_call()?;
        match self.state {
            TapState::CaptureDr | TapState::CaptureIr => {
                self.clock(false, false);
            }
            TapState::ShiftDr | TapState::ShiftIr => {}
            other => {
                log::error!("dummy: shift requested in {}", other);
                return Err(Error::TransportFailed);
            }
        }

        for i in 0..bits {
            let mask = 1 << (i % 8);
            let tdi = data[i / 8] & mask != 0;
            let last = exit && i + 1 == bits;
            if self.clock(last, tdi) {
                data[i / 8] |= mask;
            } else {
                data[i / 8] &= !mask;
            }
        }
        if exit && bits > 0 {
            // Exit1 -> Pause
            self.clock(false, false);
        }
        Ok(())
    }

    fn run_idle(&mut self, cycles: u32) -> Result<()> {
        self.hardware_call()?;
        for _ in 0..cycles {
            self.clock(false, false);
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += us as u64;
    }
}
