//! SPI NOR flash command layer
//!
//! Every function here assumes the FPGA has already released the SPI bus
//! (see [`crate::fpga::enter_spi_passthrough`]). Nothing checks this; with
//! the bus still owned by the configuration engine the flash simply does
//! not answer and reads return garbage.
//!
//! Erase and program functions return as soon as the command is sent.
//! Callers poll [`wait_ready`] before issuing the next write command.

use core::fmt;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::jtag::JtagTap;
use crate::session::Session;
use crate::spi::opcodes;

/// Size of the 24-bit flash address space
pub const MAX_FLASH_SIZE: u32 = 1 << 24;

/// Page program granularity
pub const PAGE_SIZE: usize = 256;

/// Consecutive ready readings needed before the flash counts as idle
pub const READY_CONFIRMATIONS: u32 = 2;

bitflags! {
    /// Status register 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlashStatus: u8 {
        /// Write or erase in progress
        const BUSY = opcodes::SR1_BUSY;
        /// Write enable latch
        const WEL  = opcodes::SR1_WEL;
        /// Software protection, low bit
        const SWP0 = 1 << 2;
        /// Software protection, high bit
        const SWP1 = 1 << 3;
        /// Write protect pin deasserted
        const WPP  = opcodes::SR1_WPP;
        /// Last erase or program failed
        const EPE  = opcodes::SR1_EPE;
        /// Sequential program mode
        const SPM  = opcodes::SR1_SPM;
        /// Sector protection registers locked
        const SPRL = opcodes::SR1_SPRL;
    }
}

impl FlashStatus {
    /// Any sector protection configured
    pub fn is_protected(&self) -> bool {
        self.intersects(Self::SWP0 | Self::SWP1)
    }
}

/// JEDEC manufacturer and device ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer ID
    pub manufacturer: u8,
    /// Memory type and capacity
    pub device: u16,
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} 0x{:02X} 0x{:02X}", self.manufacturer, self.device >> 8, self.device & 0xFF)
    }
}

/// Erase granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseBlock {
    /// 4 KiB sector
    Sector4K,
    /// 32 KiB block
    Block32K,
    /// 64 KiB block
    #[default]
    Block64K,
}

impl EraseBlock {
    /// Size in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::Sector4K => 4 * 1024,
            Self::Block32K => 32 * 1024,
            Self::Block64K => 64 * 1024,
        }
    }

    /// Erase opcode
    pub fn opcode(self) -> u8 {
        match self {
            Self::Sector4K => opcodes::SE_20,
            Self::Block32K => opcodes::BE_52,
            Self::Block64K => opcodes::BE_D8,
        }
    }

    /// Block size from a size in KiB (4, 32 or 64)
    pub fn from_kib(kib: u32) -> Option<Self> {
        match kib {
            4 => Some(Self::Sector4K),
            32 => Some(Self::Block32K),
            64 => Some(Self::Block64K),
            _ => None,
        }
    }

    /// Short name for messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Sector4K => "4 KiB",
            Self::Block32K => "32 KiB",
            Self::Block64K => "64 KiB",
        }
    }
}

/// Big-endian 24-bit address bytes for a range starting at `addr`
fn address_bytes(addr: u32, len: usize) -> Result<[u8; 3]> {
    let end = addr as u64 + len as u64;
    if end > MAX_FLASH_SIZE as u64 {
        return Err(Error::AddressOutOfBounds);
    }
    let [_, a2, a1, a0] = addr.to_be_bytes();
    Ok([a2, a1, a0])
}

fn command_with_address(opcode: u8, addr: u32, len: usize) -> Result<[u8; 4]> {
    let [a2, a1, a0] = address_bytes(addr, len)?;
    Ok([opcode, a2, a1, a0])
}

/// Send a single-byte command as its own transaction
fn simple<T: JtagTap>(session: &mut Session<T>, opcode: u8) -> Result<()> {
    let mut buf = [opcode];
    session.transact(&mut buf)
}

fn read_register<T: JtagTap>(session: &mut Session<T>, opcode: u8) -> Result<u8> {
    let mut buf = [opcode, 0];
    session.transact(&mut buf)?;
    Ok(buf[1])
}

/// Send the Write Enable command
pub fn write_enable<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    log::trace!("flash: write enable");
    simple(session, opcodes::WREN)
}

/// Read status register 1
pub fn read_status1<T: JtagTap>(session: &mut Session<T>) -> Result<FlashStatus> {
    let value = read_register(session, opcodes::RDSR)?;
    log::trace!("flash: SR1 0x{:02X}", value);
    Ok(FlashStatus::from_bits_retain(value))
}

/// Read status register 2
pub fn read_status2<T: JtagTap>(session: &mut Session<T>) -> Result<u8> {
    read_register(session, opcodes::RDSR2)
}

/// Read status register 3
pub fn read_status3<T: JtagTap>(session: &mut Session<T>) -> Result<u8> {
    read_register(session, opcodes::RDSR3)
}

/// Write status register 1
///
/// Sends WREN first. The write is not complete until [`wait_ready`] returns.
pub fn write_status1<T: JtagTap>(session: &mut Session<T>, value: u8) -> Result<()> {
    write_enable(session)?;
    log::debug!("flash: write SR1 0x{:02X}", value);
    let mut buf = [opcodes::WRSR, value];
    session.transact(&mut buf)
}

/// Read the JEDEC manufacturer and device ID
pub fn read_jedec_id<T: JtagTap>(session: &mut Session<T>) -> Result<JedecId> {
    let mut buf = [opcodes::RDID, 0, 0, 0];
    session.transact(&mut buf)?;
    let id = JedecId {
        manufacturer: buf[1],
        device: u16::from_be_bytes([buf[2], buf[3]]),
    };
    log::info!("flash ID: {}", id);
    Ok(id)
}

/// Bring the flash out of continuous read or QPI mode
///
/// Clocks 64, then 2, then 8 one-bits, each as its own transaction. No
/// single-byte command can do this because the flash may not be
/// decoding single-lane commands at all.
pub fn reset<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    log::debug!("flash: reset");
    let mut ones = [0xFF; 8];
    session.transact_spi(&mut ones, 64)?;
    session.transact_spi(&mut ones, 2)?;
    session.transact_spi(&mut ones, 8)
}

/// Erase the whole chip
pub fn chip_erase<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    write_enable(session)?;
    log::debug!("flash: chip erase");
    simple(session, opcodes::CE_C7)
}

/// Erase one block at `addr`
pub fn erase_block<T: JtagTap>(session: &mut Session<T>, addr: u32, block: EraseBlock) -> Result<()> {
    let mut cmd = command_with_address(block.opcode(), addr, block.size() as usize)?;
    write_enable(session)?;
    log::debug!("flash: erase {} at 0x{:06X}", block.name(), addr);
    session.transact(&mut cmd)
}

/// Program up to one page at `addr`
///
/// `data` must not cross a 256-byte page boundary. Command header and data
/// go out in one chip-select assertion.
pub fn program_page<T: JtagTap>(session: &mut Session<T>, addr: u32, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    if (addr as usize % PAGE_SIZE) + data.len() > PAGE_SIZE {
        return Err(Error::PageBoundary);
    }
    let mut header = command_with_address(opcodes::PP, addr, data.len())?;

    write_enable(session)?;
    log::trace!("flash: program {} bytes at 0x{:06X}", data.len(), addr);
    let mut buf = [0u8; PAGE_SIZE];
    let payload = &mut buf[..data.len()];
    payload.copy_from_slice(data);

    session.stream(&mut header)?;
    session.transact(payload)
}

/// Open a streamed read at `addr`
///
/// Chip select stays asserted; follow with [`continue_read`] calls and
/// close with [`end_read`].
pub fn start_read<T: JtagTap>(session: &mut Session<T>, addr: u32) -> Result<()> {
    let mut header = command_with_address(opcodes::READ, addr, 0)?;
    log::trace!("flash: read from 0x{:06X}", addr);
    session.stream(&mut header)
}

/// Read the next `buf.len()` bytes of an open streamed read
pub fn continue_read<T: JtagTap>(session: &mut Session<T>, buf: &mut [u8]) -> Result<()> {
    buf.fill(0);
    session.stream(buf)
}

/// Close a streamed read
pub fn end_read<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    session.end_spi()
}

/// Wait until the flash reports ready
///
/// A ready reading only counts once it is seen [`READY_CONFIRMATIONS`]
/// times in a row; a busy reading in between starts the count over.
/// Polls are spaced by the session's poll interval. When the session has
/// a poll limit and a busy reading arrives once that many reads have been
/// made, the session is faulted. Ready readings never trip the limit, so an
/// idle flash always finishes its confirmation reads. On timeout the
/// session is faulted and [`Error::Timeout`] is returned.
pub fn wait_ready<T: JtagTap>(session: &mut Session<T>) -> Result<()> {
    let config = *session.config();
    let mut ready = 0;
    let mut polls: u32 = 0;

    loop {
        let status = read_status1(session)?;
        polls = polls.saturating_add(1);

        if status.contains(FlashStatus::BUSY) {
            ready = 0;
            if config.max_polls.is_some_and(|max| polls >= max) {
                return Err(session.fail(Error::Timeout));
            }
        } else {
            ready += 1;
            if ready >= READY_CONFIRMATIONS {
                log::trace!("flash: ready after {} polls", polls);
                return Ok(());
            }
        }

        session.delay_us(config.poll_interval_us);
    }
}

/// Clear all block protection bits in status register 1
///
/// Returns the status read back afterwards. Bits that refuse to clear
/// (e.g. because of a hardware write-protect pin) only produce a warning.
pub fn disable_protection<T: JtagTap>(session: &mut Session<T>) -> Result<FlashStatus> {
    let before = read_status1(session)?;
    log::debug!("flash: SR1 before unprotect 0x{:02X}", before.bits());

    write_status1(session, 0)?;
    wait_ready(session)?;

    let after = read_status1(session)?;
    if !after.is_empty() {
        log::warn!(
            "failed to disable protection, SR1 now 0x{:02X} (expected 0x00)",
            after.bits()
        );
    }
    Ok(after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jtag::TapState;
    use crate::session::SessionConfig;
    use crate::spi::reverse_bits;
    use crate::testing::MockTap;
    use alloc::collections::VecDeque;
    use alloc::vec;
    use alloc::vec::Vec;

    /// Mock that answers RDSR with the next value from `sequence`
    fn status_tap(sequence: &[u8]) -> MockTap {
        let mut queue: VecDeque<u8> = sequence.iter().copied().collect();
        MockTap::with_responder(move |shift, data| {
            if shift.state == TapState::ShiftDr && shift.bits == 16 && data[0] == reverse_bits(opcodes::RDSR) {
                let value = queue.pop_front().unwrap_or(0);
                data[1] = reverse_bits(value);
            }
        })
    }

    fn status_reads(tap: &MockTap) -> usize {
        tap.shifts
            .iter()
            .filter(|s| s.bits == 16 && s.tx[0] == reverse_bits(opcodes::RDSR))
            .count()
    }

    fn wire_bytes(tap: &MockTap) -> Vec<Vec<u8>> {
        tap.shifts
            .iter()
            .map(|s| s.tx.iter().map(|&b| reverse_bits(b)).collect())
            .collect()
    }

    #[test]
    fn test_wait_ready_debounce() {
        let mut session = Session::new(status_tap(&[1, 0, 1, 0, 0, 1]));
        wait_ready(&mut session).unwrap();
        assert_eq!(status_reads(session.tap()), 5);
        assert_eq!(session.tap().delayed_us, 4 * 1000);
    }

    #[test]
    fn test_wait_ready_timeout_faults() {
        let config = SessionConfig {
            max_polls: Some(10),
            ..SessionConfig::default()
        };
        let mut session = Session::with_config(status_tap(&[1; 32]), config);
        assert_eq!(wait_ready(&mut session), Err(Error::Timeout));
        assert!(session.is_faulted());
        assert_eq!(status_reads(session.tap()), 10);
        assert_eq!(read_status1(&mut session), Err(Error::SessionFaulted));
    }

    #[test]
    fn test_wait_ready_idle_flash_ignores_small_poll_limit() {
        let config = SessionConfig {
            max_polls: Some(1),
            ..SessionConfig::default()
        };
        let mut session = Session::with_config(status_tap(&[0, 0, 0]), config);
        assert_eq!(wait_ready(&mut session), Ok(()));
        assert!(!session.is_faulted());
        assert_eq!(status_reads(session.tap()), READY_CONFIRMATIONS as usize);
    }

    #[test]
    fn test_wait_ready_busy_after_limit_times_out() {
        let config = SessionConfig {
            max_polls: Some(2),
            ..SessionConfig::default()
        };
        let mut session = Session::with_config(status_tap(&[0, 1, 1]), config);
        assert_eq!(wait_ready(&mut session), Err(Error::Timeout));
        assert!(session.is_faulted());
        assert_eq!(status_reads(session.tap()), 2);
    }

    #[test]
    fn test_erase_block_frame() {
        let mut session = Session::new(MockTap::new());
        erase_block(&mut session, 0x12_3000, EraseBlock::Sector4K).unwrap();
        let frames = wire_bytes(session.tap());
        assert_eq!(frames, [vec![0x06], vec![0x20, 0x12, 0x30, 0x00]]);
    }

    #[test]
    fn test_program_page_single_transaction() {
        let mut session = Session::new(MockTap::new());
        program_page(&mut session, 0x01_0010, &[0xAA; 16]).unwrap();
        let tap = session.tap();
        // WREN, header (held), data (closing)
        assert_eq!(tap.shifts.len(), 3);
        assert!(tap.shifts[0].exit);
        assert!(!tap.shifts[1].exit);
        assert!(tap.shifts[2].exit);
        assert_eq!(wire_bytes(tap)[1], [0x02, 0x01, 0x00, 0x10]);
    }

    #[test]
    fn test_program_page_rejects_boundary_cross() {
        let mut session = Session::new(MockTap::new());
        assert_eq!(
            program_page(&mut session, 0xF0, &[0; 32]),
            Err(Error::PageBoundary)
        );
        assert_eq!(
            program_page(&mut session, MAX_FLASH_SIZE - 16, &[0; 32]),
            Err(Error::PageBoundary)
        );
        assert_eq!(
            program_page(&mut session, MAX_FLASH_SIZE, &[0; 1]),
            Err(Error::AddressOutOfBounds)
        );
        assert!(session.tap().shifts.is_empty());
        assert!(!session.is_faulted());
    }

    #[test]
    fn test_reset_sequence() {
        let mut session = Session::new(MockTap::new());
        reset(&mut session).unwrap();
        let bits: Vec<usize> = session.tap().shifts.iter().map(|s| s.bits).collect();
        assert_eq!(bits, [64, 2, 8]);
    }

    #[test]
    fn test_jedec_id() {
        let tap = MockTap::with_responder(|_, data| {
            if data.len() == 4 {
                data[1] = reverse_bits(0xEF);
                data[2] = reverse_bits(0x40);
                data[3] = reverse_bits(0x18);
            }
        });
        let mut session = Session::new(tap);
        let id = read_jedec_id(&mut session).unwrap();
        assert_eq!(id.manufacturer, 0xEF);
        assert_eq!(id.device, 0x4018);
    }

    #[test]
    fn test_erase_block_sizes() {
        assert_eq!(EraseBlock::from_kib(32), Some(EraseBlock::Block32K));
        assert_eq!(EraseBlock::from_kib(16), None);
        assert_eq!(EraseBlock::default().size(), 65536);
    }
}
