//! High-level operations
//!
//! Flash operations each start from scratch: they release the SPI bus from
//! the configuration engine, enter passthrough, reset the flash and read
//! its JEDEC ID before doing their own work.

use alloc::vec;
use alloc::vec::Vec;

use super::mode::{EraseStrategy, Operation, Plan, ProgramOptions};
use super::progress::{Phase, Progress};
use super::region::EraseRegion;
use crate::device::DeviceInfo;
use crate::error::{Error, Mismatch, Result};
use crate::fpga::{self, Command};
use crate::jtag::JtagTap;
use crate::protocol::{self, FlashStatus, JedecId, MAX_FLASH_SIZE, PAGE_SIZE};
use crate::session::Session;
use crate::status::{self, StatusRegister};

/// Bytes per streamed read while reading or verifying
pub const READ_CHUNK_SIZE: usize = 4096;

/// Device identity and configuration status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Identified device
    pub device: DeviceInfo,
    /// 32-bit USERCODE
    pub usercode: u32,
    /// Configuration status at identification time
    pub status: StatusRegister,
}

/// Result of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    /// Flash JEDEC ID
    pub jedec: JedecId,
    /// Flash status register 1
    pub sr1: FlashStatus,
    /// Flash status register 2
    pub sr2: u8,
    /// Flash status register 3
    pub sr3: u8,
}

/// What an executed plan produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Probe results
    Probed(ProbeReport),
    /// Status register after loading SRAM
    SramLoaded(StatusRegister),
    /// Bytes written to flash
    Programmed(usize),
    /// Erased region, `None` for bulk erase or no erase
    Erased(Option<EraseRegion>),
    /// Bytes verified
    Verified(usize),
    /// Data read from flash
    Read(Vec<u8>),
}

/// Identity plus outcome of an executed plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Identified device
    pub identity: Identity,
    /// Operation result
    pub outcome: Outcome,
}

fn check_bounds(offset: u32, len: usize) -> Result<()> {
    if offset as u64 + len as u64 > MAX_FLASH_SIZE as u64 {
        Err(Error::AddressOutOfBounds)
    } else {
        Ok(())
    }
}

/// Read the IDCODE, USERCODE and configuration status
pub fn identify<T: JtagTap>(session: &mut Session<T>) -> Result<Identity> {
    let device = session.read_idcode()?;
    let usercode = fpga::read_usercode(session)?;
    log::info!("USERCODE: 0x{:08X}", usercode);
    let status = session.read_status()?;
    Ok(Identity {
        device,
        usercode,
        status,
    })
}

/// Check that the flash answers
///
/// Releases the SPI bus with delays between the configuration commands,
/// then reads the JEDEC ID and all three flash status registers.
pub fn probe<T: JtagTap>(session: &mut Session<T>) -> Result<ProbeReport> {
    let delay = session.config().probe_delay_us;
    fpga::command8(session, Command::Enable, 0)?;
    session.delay_us(delay);
    fpga::command8(session, Command::Erase, 0)?;
    session.delay_us(delay);
    fpga::command(session, Command::Disable)?;

    fpga::enter_spi_passthrough(session)?;
    protocol::reset(session)?;
    let jedec = protocol::read_jedec_id(session)?;

    let sr1 = protocol::read_status1(session)?;
    let sr2 = protocol::read_status2(session)?;
    let sr3 = protocol::read_status3(session)?;
    log::info!("SR1: 0x{:02X}  SR2: 0x{:02X}  SR3: 0x{:02X}", sr1.bits(), sr2, sr3);
    for field in status::decode(sr1.bits() as u64, status::flash::SR1_FIELDS) {
        log::debug!("  {}", field);
    }
    for field in status::decode(sr2 as u64, status::flash::SR2_FIELDS) {
        log::debug!("  {}", field);
    }

    Ok(ProbeReport { jedec, sr1, sr2, sr3 })
}

/// Give the flash to JTAG and identify it
pub fn prepare_flash<T: JtagTap>(session: &mut Session<T>) -> Result<JedecId> {
    fpga::release_spi(session)?;
    fpga::enter_spi_passthrough(session)?;
    protocol::reset(session)?;
    protocol::read_jedec_id(session)
}

/// Load a bitstream into configuration SRAM
pub fn load_sram<T, P>(session: &mut Session<T>, image: &[u8], progress: &mut P) -> Result<StatusRegister>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    fpga::load_sram(session, image, progress)
}

fn erase<T, P>(
    session: &mut Session<T>,
    strategy: EraseStrategy,
    offset: u32,
    len: usize,
    progress: &mut P,
) -> Result<Option<EraseRegion>>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    match strategy {
        EraseStrategy::Skip => Ok(None),
        EraseStrategy::Bulk => {
            log::info!("bulk erasing flash");
            progress.start(Phase::Erasing, 1);
            protocol::chip_erase(session)?;
            protocol::wait_ready(session)?;
            progress.advance(1);
            progress.finish();
            Ok(None)
        }
        EraseStrategy::Blocks(block) => {
            let region = EraseRegion::new(offset, len, block)?;
            log::info!(
                "erasing 0x{:06X}..0x{:06X} in {} blocks",
                region.begin(),
                region.end(),
                block.name()
            );
            progress.start(Phase::Erasing, region.len() as usize);
            for addr in region.blocks() {
                protocol::erase_block(session, addr, block)?;
                if log::log_enabled!(log::Level::Trace) {
                    let sr1 = protocol::read_status1(session)?;
                    log::trace!("Status after block erase: 0x{:02X}", sr1.bits());
                    for field in status::decode(sr1.bits() as u64, status::flash::SR1_FIELDS) {
                        log::trace!("  {}", field);
                    }
                }
                protocol::wait_ready(session)?;
                progress.advance((addr + block.size() - region.begin()) as usize);
            }
            progress.finish();
            Ok(Some(region))
        }
    }
}

fn write_pages<T, P>(session: &mut Session<T>, image: &[u8], offset: u32, progress: &mut P) -> Result<()>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    log::info!("programming {} bytes at 0x{:06X}", image.len(), offset);
    progress.start(Phase::Writing, image.len());
    let mut done = 0;
    while done < image.len() {
        let addr = offset + done as u32;
        let room = PAGE_SIZE - addr as usize % PAGE_SIZE;
        let len = room.min(image.len() - done);
        protocol::program_page(session, addr, &image[done..done + len])?;
        protocol::wait_ready(session)?;
        done += len;
        progress.advance(done);
    }
    progress.finish();
    Ok(())
}

fn verify<T, P>(session: &mut Session<T>, image: &[u8], offset: u32, progress: &mut P) -> Result<()>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    let mut first: Option<(u32, u8, u8)> = None;
    let mut count = 0;

    progress.start(Phase::Verifying, image.len());
    protocol::start_read(session, offset)?;
    let mut buf = [0u8; READ_CHUNK_SIZE];
    let mut done = 0;
    for chunk in image.chunks(READ_CHUNK_SIZE) {
        let flash = &mut buf[..chunk.len()];
        protocol::continue_read(session, flash)?;
        for (i, (&expected, &found)) in chunk.iter().zip(flash.iter()).enumerate() {
            if expected != found {
                count += 1;
                if first.is_none() {
                    first = Some((offset + (done + i) as u32, expected, found));
                }
            }
        }
        done += chunk.len();
        progress.advance(done);
    }
    protocol::end_read(session)?;
    progress.finish();

    match first {
        None => {
            log::info!("VERIFY OK");
            Ok(())
        }
        Some((addr, expected, found)) => {
            let mismatch = Mismatch {
                addr,
                expected,
                found,
                count,
            };
            log::error!("found difference between flash and file: {}", mismatch);
            Err(Error::VerifyError(mismatch))
        }
    }
}

/// Write an image to flash at `offset`
///
/// Optionally clears protection, erases according to the options, writes
/// page by page, and verifies.
pub fn program_flash<T, P>(
    session: &mut Session<T>,
    image: &[u8],
    offset: u32,
    options: &ProgramOptions,
    progress: &mut P,
) -> Result<()>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    check_bounds(offset, image.len())?;
    prepare_flash(session)?;

    if options.disable_protection {
        protocol::disable_protection(session)?;
    }
    erase(session, options.erase, offset, image.len(), progress)?;
    write_pages(session, image, offset, progress)?;
    if options.verify && !image.is_empty() {
        verify(session, image, offset, progress)?;
    }
    Ok(())
}

/// Read `len` bytes of flash at `offset`
pub fn read_flash<T, P>(session: &mut Session<T>, offset: u32, len: usize, progress: &mut P) -> Result<Vec<u8>>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    check_bounds(offset, len)?;
    prepare_flash(session)?;

    log::info!("reading {} bytes at 0x{:06X}", len, offset);
    let mut data = vec![0u8; len];
    progress.start(Phase::Reading, len);
    protocol::start_read(session, offset)?;
    let mut done = 0;
    for chunk in data.chunks_mut(READ_CHUNK_SIZE) {
        protocol::continue_read(session, chunk)?;
        done += chunk.len();
        progress.advance(done);
    }
    protocol::end_read(session)?;
    progress.finish();
    Ok(data)
}

/// Erase the region a `len`-byte image at `offset` would occupy
pub fn erase_region<T, P>(
    session: &mut Session<T>,
    offset: u32,
    len: usize,
    strategy: EraseStrategy,
    disable_protection: bool,
    progress: &mut P,
) -> Result<Option<EraseRegion>>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    check_bounds(offset, len)?;
    prepare_flash(session)?;

    if disable_protection {
        protocol::disable_protection(session)?;
    }
    erase(session, strategy, offset, len, progress)
}

/// Compare flash at `offset` with `image` without writing
///
/// The whole range is always compared; a mismatch reports the first
/// differing address and the total number of differing bytes.
pub fn verify_only<T, P>(session: &mut Session<T>, image: &[u8], offset: u32, progress: &mut P) -> Result<()>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    check_bounds(offset, image.len())?;
    prepare_flash(session)?;
    verify(session, image, offset, progress)
}

/// Identify the device, run the plan, and reboot the FPGA if requested
pub fn execute<T, P>(session: &mut Session<T>, plan: &Plan, image: &[u8], progress: &mut P) -> Result<Report>
where
    T: JtagTap,
    P: Progress + ?Sized,
{
    let identity = identify(session)?;

    let outcome = match plan.operation {
        Operation::Probe => Outcome::Probed(probe(session)?),
        Operation::LoadSram => Outcome::SramLoaded(load_sram(session, image, progress)?),
        Operation::Program(options) => {
            program_flash(session, image, plan.offset, &options, progress)?;
            Outcome::Programmed(image.len())
        }
        Operation::Erase {
            len,
            erase,
            disable_protection,
        } => Outcome::Erased(erase_region(
            session,
            plan.offset,
            len,
            erase,
            disable_protection,
            progress,
        )?),
        Operation::Verify => {
            verify_only(session, image, plan.offset, progress)?;
            Outcome::Verified(image.len())
        }
        Operation::Read { len } => Outcome::Read(read_flash(session, plan.offset, len, progress)?),
    };

    if plan.refresh {
        fpga::refresh(session)?;
    }

    Ok(Report { identity, outcome })
}
