//! Protocol implementations
//!
//! SPI NOR flash command sequences, carried over the SPI-over-JTAG bridge.

mod flash;

pub use flash::*;
