//! ecpflasher-core - Protocol engine for Lattice ECP5/NX programming over JTAG
//!
//! This crate turns high-level requests ("erase this region", "write these
//! pages", "load this bitstream into SRAM") into ordered JTAG TAP
//! transitions and SPI NOR flash command sequences. It is `no_std`
//! compatible and only needs `alloc`.
//!
//! The layers, from the wire up:
//!
//! - [`jtag`] - TAP automaton and the [`jtag::JtagTap`] driver seam
//! - [`session`] - the hardware session with its sticky fault flag
//! - [`spi`] - bit-order adapter and the SPI-over-JTAG bridge
//! - [`device`] / [`status`] - IDCODE identification and status decoding
//! - [`protocol`] - SPI NOR flash command layer
//! - [`fpga`] - configuration-logic command sequencer
//! - [`flash`] - programming orchestrator
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use ecpflasher_core::flash::{self, NoProgress, ProgramOptions};
//! use ecpflasher_core::session::Session;
//!
//! let mut session = Session::new(tap);
//! let identity = flash::identify(&mut session)?;
//! println!("{}", identity.device);
//! flash::program_flash(&mut session, &image, 0, &ProgramOptions::default(), &mut NoProgress)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod device;
pub mod error;
pub mod flash;
pub mod fpga;
pub mod jtag;
pub mod protocol;
pub mod session;
pub mod spi;
pub mod status;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};
