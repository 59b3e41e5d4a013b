//! JTAG TAP definitions
//!
//! The TAP automaton and the trait a hardware (or emulated) TAP driver
//! implements for the rest of the engine.

mod state;
mod traits;

pub use state::{TapState, TmsPath};
pub use traits::JtagTap;
