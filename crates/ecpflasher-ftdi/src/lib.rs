//! ecpflasher-ftdi - FTDI MPSSE JTAG driver
//!
//! This crate drives the JTAG port of a Lattice FPGA through an FTDI
//! FT2232H or FT232H adapter in MPSSE mode, using the same pinout as the
//! common ECP5 evaluation boards (TCK on ADBUS0, TDI on ADBUS1, TDO on
//! ADBUS2, TMS on ADBUS3).
//!
//! # Example
//!
//! ```ignore
//! use ecpflasher_ftdi::{FtdiConfig, FtdiJtag};
//! use ecpflasher_core::session::Session;
//!
//! let config = FtdiConfig::default().divider(2)?;
//! let jtag = FtdiJtag::open(&config)?;
//! let mut session = Session::new(jtag);
//! ```

mod device;
mod error;
mod mpsse;
mod protocol;

pub use device::{DeviceSelector, FtdiConfig, FtdiJtag};
pub use error::{FtdiError, Result};
pub use protocol::FtdiInterface;
