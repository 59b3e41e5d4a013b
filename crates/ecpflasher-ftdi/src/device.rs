//! FTDI MPSSE JTAG driver
//!
//! This module provides the `FtdiJtag` struct that drives a JTAG TAP using
//! FTDI's MPSSE engine and implements the `JtagTap` trait.

use std::io::{Read, Write};
use std::time::Duration;

use ecpflasher_core::error::{Error as CoreError, Result as CoreResult};
use ecpflasher_core::jtag::{JtagTap, TapState, TmsPath};
use ftdi::{find_by_vid_pid, BitMode, Device, Interface};

use crate::error::{FtdiError, Result};
use crate::mpsse::{self, CommandBuffer};
use crate::protocol::*;

/// Empty reads tolerated before a pending answer counts as lost
const MAX_EMPTY_READS: u32 = 10_000;

/// A USB VID/PID pair selecting the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelector {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
}

impl DeviceSelector {
    /// Parse a libftdi style device string
    ///
    /// Only the `i:<vendor>:<product>` form is supported. Numbers take a
    /// `0x` prefix for hex and are decimal otherwise.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("i"), Some(vid), Some(pid), None) => Ok(DeviceSelector {
                vendor_id: parse_id(vid)?,
                product_id: parse_id(pid)?,
            }),
            _ => Err(FtdiError::BadSelector(format!(
                "'{}', expected i:<vendor>:<product>",
                s
            ))),
        }
    }
}

fn setup(step: &'static str, e: impl std::fmt::Display) -> FtdiError {
    FtdiError::Setup {
        step,
        reason: e.to_string(),
    }
}

fn parse_id(s: &str) -> Result<u16> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| FtdiError::BadSelector(format!("invalid USB ID '{}'", s)))
}

/// Configuration for opening an FTDI adapter
#[derive(Debug, Clone, Default)]
pub struct FtdiConfig {
    /// Interface/channel to use (A, B, C, D)
    pub interface: FtdiInterface,
    /// Explicit adapter; the FT2232H and FT232H default IDs are tried otherwise
    pub selector: Option<DeviceSelector>,
    /// TCK divider (1-65536); TCK = 6 MHz / divider
    pub divider: Option<u32>,
}

impl FtdiConfig {
    /// Set the interface/channel
    pub fn interface(mut self, interface: FtdiInterface) -> Self {
        self.interface = interface;
        self
    }

    /// Select the adapter by device string
    pub fn device(mut self, device: &str) -> Result<Self> {
        self.selector = Some(DeviceSelector::parse(device)?);
        Ok(self)
    }

    /// Set the TCK divider
    pub fn divider(mut self, divider: u32) -> Result<Self> {
        if !(1..=0x1_0000).contains(&divider) {
            return Err(FtdiError::BadDivider(divider));
        }
        self.divider = Some(divider);
        Ok(self)
    }

    fn effective_divider(&self) -> u32 {
        self.divider.unwrap_or(1)
    }

    /// TCK frequency in MHz
    pub fn tck_mhz(&self) -> f64 {
        BASE_TCK_HZ as f64 / self.effective_divider() as f64 / 1_000_000.0
    }
}

/// FTDI MPSSE JTAG master
pub struct FtdiJtag {
    device: Device,
    state: TapState,
    faulted: bool,
}

impl FtdiJtag {
    /// Open an FTDI adapter and reset its TAP
    pub fn open(config: &FtdiConfig) -> Result<Self> {
        log::info!("Opening FTDI channel {}", config.interface.letter());

        let interface = match config.interface {
            FtdiInterface::A => Interface::A,
            FtdiInterface::B => Interface::B,
            FtdiInterface::C => Interface::C,
            FtdiInterface::D => Interface::D,
        };

        let candidates: Vec<(u16, u16)> = match config.selector {
            Some(sel) => vec![(sel.vendor_id, sel.product_id)],
            None => DEFAULT_PIDS.iter().map(|&pid| (FTDI_VID, pid)).collect(),
        };

        let mut device = None;
        for &(vid, pid) in &candidates {
            log::debug!("Looking for FTDI device VID={:04X} PID={:04X}", vid, pid);
            match find_by_vid_pid(vid, pid).interface(interface).open() {
                Ok(dev) => {
                    log::debug!("Opened FTDI device VID={:04X} PID={:04X}", vid, pid);
                    device = Some(dev);
                    break;
                }
                Err(e) => log::debug!("VID={:04X} PID={:04X}: {}", vid, pid, e),
            }
        }

        let mut device = device.ok_or_else(|| {
            let ids: Vec<String> = candidates
                .iter()
                .map(|(vid, pid)| format!("{:04x}:{:04x}", vid, pid))
                .collect();
            FtdiError::DeviceNotFound(ids.join(" or "))
        })?;

        device
            .usb_reset()
            .map_err(|e| setup("USB reset", e))?;

        device
            .set_latency_timer(1)
            .map_err(|e| setup("Set latency timer", e))?;

        device
            .set_bitmode(0x00, BitMode::Mpsse)
            .map_err(|e| setup("Set MPSSE mode", e))?;

        let mut jtag = FtdiJtag {
            device,
            state: TapState::TestLogicReset,
            faulted: false,
        };

        let divider = config.effective_divider();
        log::debug!("Setting TCK divider to {}", divider);
        jtag.send(&mpsse::setup_sequence(divider))?;

        // Force a known TAP state before the first scan
        let mut cmd = CommandBuffer::new();
        cmd.tms(TmsPath::RESET.iter(), false);
        cmd.tms([false], false);
        jtag.send(cmd.as_bytes())?;
        jtag.state = TapState::RunTestIdle;

        log::info!("FTDI configured for JTAG at {:.2} MHz", config.tck_mhz());

        Ok(jtag)
    }

    /// Send data to the FTDI device
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.device
            .write_all(data)
            .map_err(|e| FtdiError::Transfer(format!("write: {}", e)))?;
        log::trace!("Sent {} bytes", data.len());
        Ok(())
    }

    /// Receive exactly `len` bytes from the FTDI device
    fn recv(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut total = 0;
        let mut empty_reads = 0;

        while total < len {
            match self.device.read(&mut buf[total..]) {
                Ok(0) => {
                    empty_reads += 1;
                    if empty_reads > MAX_EMPTY_READS {
                        return Err(FtdiError::ShortRead {
                            received: total,
                            expected: len,
                        });
                    }
                    std::thread::sleep(Duration::from_micros(100));
                }
                Ok(n) => {
                    total += n;
                }
                Err(e) => {
                    return Err(FtdiError::Transfer(format!("read: {}", e)));
                }
            }
        }

        log::trace!("Received {} bytes", total);
        Ok(buf)
    }

    /// Execute a command buffer and collect its answer
    fn round_trip(&mut self, cmd: &CommandBuffer) -> Result<Vec<u8>> {
        self.send(cmd.as_bytes())?;
        if cmd.response_len() > 0 {
            self.recv(cmd.response_len())
        } else {
            Ok(Vec::new())
        }
    }

    /// Map a driver failure onto the engine's error and stop all traffic
    fn transport(&mut self, error: FtdiError) -> CoreError {
        log::error!("{}", error);
        self.faulted = true;
        CoreError::TransportFailed
    }

    fn check(&self) -> CoreResult<()> {
        if self.faulted {
            Err(CoreError::TransportFailed)
        } else {
            Ok(())
        }
    }

    fn shift_inner(&mut self, data: &mut [u8], bits: usize, exit: bool) -> Result<()> {
        let body = if exit { bits - 1 } else { bits };
        let full = body / 8;
        let rem = body % 8;

        for start in (0..full).step_by(MAX_SHIFT_CHUNK) {
            let end = (start + MAX_SHIFT_CHUNK).min(full);
            let mut cmd = CommandBuffer::new();
            cmd.shift_bytes(&data[start..end]).send_immediate();
            let rx = self.round_trip(&cmd)?;
            data[start..end].copy_from_slice(&rx);
        }

        let last_tdi = exit && data[full] & (1 << rem) != 0;
        let mut cmd = CommandBuffer::new();
        if rem > 0 {
            cmd.shift_bits(data[full], rem);
        }
        if exit {
            cmd.exit_bit(last_tdi);
            cmd.tms([false], last_tdi);
        }
        if cmd.is_empty() {
            return Ok(());
        }
        cmd.send_immediate();
        let rx = self.round_trip(&cmd)?;

        let mut idx = 0;
        if rem > 0 {
            let mask = (1u8 << rem) - 1;
            let value = mpsse::align_bits(rx[idx], rem) & mask;
            data[full] = (data[full] & !mask) | value;
            idx += 1;
        }
        if exit {
            let bit = 1u8 << rem;
            if mpsse::exit_bit_value(rx[idx]) {
                data[full] |= bit;
            } else {
                data[full] &= !bit;
            }
        }
        Ok(())
    }

    /// Release I/O pins (set all as inputs)
    fn release_pins(&mut self) -> Result<()> {
        let buf = [SET_BITS_LOW, 0x00, 0x00];
        self.send(&buf)
    }
}

impl Drop for FtdiJtag {
    fn drop(&mut self) {
        if let Err(e) = self.release_pins() {
            log::warn!("Failed to release pins on close: {}", e);
        }
    }
}

impl JtagTap for FtdiJtag {
    fn state(&self) -> TapState {
        self.state
    }

    fn go_to_state(&mut self, target: TapState) -> CoreResult<()> {
        self.check()?;
        let path = self.state.path_to(target);
        if path.is_empty() {
            return Ok(());
        }
        let mut cmd = CommandBuffer::new();
        cmd.tms(path.iter(), false);
        if let Err(e) = self.send(cmd.as_bytes()) {
            return Err(self.transport(e));
        }
        self.state = target;
        Ok(())
    }

    fn shift(&mut self, data: &mut [u8], bits: usize, exit: bool) -> CoreResult<()> {
        self.check()?;
        if bits > data.len() * 8 {
            return Err(CoreError::BufferTooSmall);
        }
        if matches!(self.state, TapState::CaptureDr | TapState::CaptureIr) {
            self.go_to_state(self.state.next(false))?;
        }
        if !self.state.is_shift() {
            return Err(CoreError::InvalidOptions("shift outside Shift-DR/Shift-IR"));
        }
        if bits == 0 {
            return Ok(());
        }

        if let Err(e) = self.shift_inner(data, bits, exit) {
            return Err(self.transport(e));
        }
        if exit {
            self.state = self.state.next(true).next(false);
        }
        Ok(())
    }

    fn run_idle(&mut self, cycles: u32) -> CoreResult<()> {
        self.check()?;
        let mut cmd = CommandBuffer::new();
        cmd.clocks(cycles);
        if cmd.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.send(cmd.as_bytes()) {
            return Err(self.transport(e));
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parsing() {
        let sel = DeviceSelector::parse("i:0x0403:0x6014").unwrap();
        assert_eq!(sel.vendor_id, 0x0403);
        assert_eq!(sel.product_id, 0x6014);

        let sel = DeviceSelector::parse("i:1027:24592").unwrap();
        assert_eq!(sel.product_id, 0x6010);

        assert!(DeviceSelector::parse("s:0x0403:0x6010:FT123").is_err());
        assert!(DeviceSelector::parse("i:0x0403").is_err());
        assert!(matches!(
            DeviceSelector::parse("i:zz:0x6010"),
            Err(FtdiError::BadSelector(_))
        ));
    }

    #[test]
    fn test_divider_bounds() {
        assert!(matches!(
            FtdiConfig::default().divider(0),
            Err(FtdiError::BadDivider(0))
        ));
        assert!(FtdiConfig::default().divider(0x1_0001).is_err());
        let config = FtdiConfig::default().divider(3).unwrap();
        assert_eq!(config.tck_mhz(), 2.0);
        assert_eq!(FtdiConfig::default().tck_mhz(), 6.0);
    }
}
