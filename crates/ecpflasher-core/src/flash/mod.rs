//! Programming orchestrator
//!
//! This module sequences the lower layers into complete operations:
//! identify, probe, SRAM load, and flash program/read/erase/verify.

mod mode;
mod operations;
mod progress;
mod region;

pub use mode::{EraseStrategy, ModeFlags, Operation, Plan, ProgramOptions, DEFAULT_READ_SIZE};
pub use operations::*;
pub use progress::{NoProgress, Phase, Progress};
pub use region::EraseRegion;
