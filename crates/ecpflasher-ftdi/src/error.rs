//! Error types for the FTDI JTAG driver

use std::fmt;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors raised while opening or clocking the MPSSE JTAG port
#[derive(Debug)]
pub enum FtdiError {
    /// None of the tried `vendor:product` pairs answered
    DeviceNotFound(String),

    /// Malformed `-d` device string or USB ID
    BadSelector(String),

    /// TCK divider outside 1..=65536
    BadDivider(u32),

    /// A setup step on the freshly opened adapter failed
    Setup {
        /// What was being configured
        step: &'static str,
        /// Driver message
        reason: String,
    },

    /// USB write or read failed
    Transfer(String),

    /// The adapter stopped answering partway through a response
    ShortRead {
        /// Bytes received before giving up
        received: usize,
        /// Bytes the command buffer asked for
        expected: usize,
    },
}

impl fmt::Display for FtdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtdiError::DeviceNotFound(ids) => write!(f, "Can't find FTDI USB device ({})", ids),
            FtdiError::BadSelector(s) => write!(f, "Invalid device selector: {}", s),
            FtdiError::BadDivider(d) => {
                write!(f, "Invalid clock divider {}: must be between 1 and 65536", d)
            }
            FtdiError::Setup { step, reason } => write!(f, "{} failed: {}", step, reason),
            FtdiError::Transfer(s) => write!(f, "USB transfer failed: {}", s),
            FtdiError::ShortRead { received, expected } => {
                write!(f, "Read timed out after {} of {} bytes", received, expected)
            }
        }
    }
}

impl std::error::Error for FtdiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_failure() {
        let e = FtdiError::Setup {
            step: "Set MPSSE mode",
            reason: "busy".to_string(),
        };
        assert_eq!(e.to_string(), "Set MPSSE mode failed: busy");

        let e = FtdiError::ShortRead {
            received: 3,
            expected: 8,
        };
        assert_eq!(e.to_string(), "Read timed out after 3 of 8 bytes");

        let e = FtdiError::DeviceNotFound("0403:6010 or 0403:6014".to_string());
        assert!(e.to_string().contains("0403:6014"));
        assert!(FtdiError::BadDivider(0).to_string().contains("65536"));
    }
}
