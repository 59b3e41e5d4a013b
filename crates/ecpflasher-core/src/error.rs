//! Error types for ecpflasher-core
//!
//! This module provides a no_std compatible error type that is shared by
//! every layer of the engine, from the TAP seam up to the orchestrator.

use core::fmt;

/// Details about a verify failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Flash address of the first differing byte
    pub addr: u32,
    /// Byte value from the image
    pub expected: u8,
    /// Byte value read back from flash
    pub found: u8,
    /// Total number of differing bytes in the verified range
    pub count: usize,
}

/// Broad class of a failure
///
/// Callers use this to tell hardware trouble apart from bad data or a bad
/// request, e.g. when picking a process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was invalid
    Usage,
    /// Communication with the hardware failed
    Hardware,
    /// Flash contents did not match the image
    Verify,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// A USB or JTAG transfer failed
    TransportFailed,
    /// An earlier transport failure disabled this session
    SessionFaulted,
    /// The flash stayed busy for longer than the configured poll limit
    Timeout,

    // Data errors
    /// Read-back data differs from the image
    VerifyError(Mismatch),

    // Request errors
    /// Address range does not fit the 24-bit flash address space
    AddressOutOfBounds,
    /// Page program data would cross a 256-byte page boundary
    PageBoundary,
    /// Buffer is shorter than the requested shift length
    BufferTooSmall,
    /// Requested combination of options is not allowed
    InvalidOptions(&'static str),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportFailed | Self::SessionFaulted | Self::Timeout => ErrorKind::Hardware,
            Self::VerifyError(_) => ErrorKind::Verify,
            Self::AddressOutOfBounds
            | Self::PageBoundary
            | Self::BufferTooSmall
            | Self::InvalidOptions(_) => ErrorKind::Usage,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "first difference at 0x{:06X}: expected 0x{:02X}, found 0x{:02X} ({} bytes differ)",
            self.addr, self.expected, self.found, self.count
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportFailed => write!(f, "JTAG transfer failed"),
            Self::SessionFaulted => write!(f, "session disabled by an earlier transfer failure"),
            Self::Timeout => write!(f, "flash did not become ready"),
            Self::VerifyError(mismatch) => write!(f, "verify failed: {}", mismatch),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::PageBoundary => write!(f, "page program crosses a page boundary"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::InvalidOptions(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::TransportFailed.kind(), ErrorKind::Hardware);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Hardware);
        assert_eq!(Error::InvalidOptions("x").kind(), ErrorKind::Usage);
        let mismatch = Mismatch {
            addr: 0x100,
            expected: 0xAA,
            found: 0x55,
            count: 1,
        };
        assert_eq!(Error::VerifyError(mismatch).kind(), ErrorKind::Verify);
    }
}
