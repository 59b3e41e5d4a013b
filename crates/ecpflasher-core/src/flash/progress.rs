//! Progress reporting callbacks

use core::fmt;

/// Long-running stage of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Streaming a bitstream into SRAM
    LoadingSram,
    /// Erasing flash blocks
    Erasing,
    /// Programming flash pages
    Writing,
    /// Reading flash
    Reading,
    /// Comparing flash with the image
    Verifying,
}

impl Phase {
    /// Verb for progress output
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingSram => "Loading",
            Self::Erasing => "Erasing",
            Self::Writing => "Writing",
            Self::Reading => "Reading",
            Self::Verifying => "Verifying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Callback for progress reporting
///
/// Every phase is bracketed by `start` and `finish`; `advance` reports the
/// bytes completed so far within the phase.
pub trait Progress {
    /// A phase with `total` bytes of work begins
    fn start(&mut self, phase: Phase, total: usize);

    /// `done` of the phase's bytes are complete
    fn advance(&mut self, done: usize);

    /// The current phase is complete
    fn finish(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase: Phase, _total: usize) {}
    fn advance(&mut self, _done: usize) {}
    fn finish(&mut self) {}
}
