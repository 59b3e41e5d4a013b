//! FTDI MPSSE protocol constants
//!
//! Command values from FTDI application note AN_108. Only the subset a
//! JTAG master needs is listed: LSB-first data shifts with TDI written on
//! the falling edge and TDO sampled on the rising edge, TMS clocking, and
//! the setup commands.

// ============================================================================
// USB VID/PID constants
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// FT2232H product ID (dual channel)
pub const FTDI_FT2232H_PID: u16 = 0x6010;

/// FT232H product ID (single channel)
pub const FTDI_FT232H_PID: u16 = 0x6014;

/// Product IDs tried in order when no device selector is given
pub const DEFAULT_PIDS: [u16; 2] = [FTDI_FT2232H_PID, FTDI_FT232H_PID];

// ============================================================================
// MPSSE Commands
// ============================================================================

/// Clock bytes out on -ve edge and in on +ve edge, LSB first
pub const MPSSE_SHIFT_BYTES: u8 = 0x39;

/// Clock bits out on -ve edge and in on +ve edge, LSB first
pub const MPSSE_SHIFT_BITS: u8 = 0x3B;

/// Clock TMS bits out on -ve edge; bit 7 of the data byte is held on TDI
pub const MPSSE_WRITE_TMS: u8 = 0x4B;

/// Clock TMS bits out and read TDO on +ve edge
pub const MPSSE_WRITE_TMS_READ: u8 = 0x6B;

/// Set data bits low byte
pub const SET_BITS_LOW: u8 = 0x80;

/// Disable loopback mode
pub const LOOPBACK_END: u8 = 0x85;

/// Set clock divisor
pub const TCK_DIVISOR: u8 = 0x86;

/// Flush the receive buffer back to the host immediately
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Enable divide-by-5 prescaler (12 MHz base clock)
pub const EN_DIV_5: u8 = 0x8B;

/// Clock n bits with no data transfer
pub const CLOCK_BITS: u8 = 0x8E;

/// Clock n x 8 bits with no data transfer
pub const CLOCK_BYTES: u8 = 0x8F;

// ============================================================================
// Pin setup
// ============================================================================

/// Initial low-byte pin levels: TMS high, everything else low
pub const PINS_INITIAL: u8 = 0x08;

/// Low-byte pin directions: TCK, TDI and TMS are outputs
pub const PINS_DIRECTION: u8 = 0x0B;

// ============================================================================
// Limits
// ============================================================================

/// Largest byte shift issued in one MPSSE command
pub const MAX_SHIFT_CHUNK: usize = 4096;

/// Most TMS clocks one TMS command can carry
pub const MAX_TMS_BITS: usize = 7;

/// TCK frequency at divider 1, in Hz
pub const BASE_TCK_HZ: u32 = 6_000_000;

/// FTDI interface (channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiInterface {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiInterface {
    /// Parse interface from character
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Interface index (0-3)
    pub fn index(&self) -> u8 {
        match self {
            FtdiInterface::A => 0,
            FtdiInterface::B => 1,
            FtdiInterface::C => 2,
            FtdiInterface::D => 3,
        }
    }

    /// Channel letter
    pub fn letter(&self) -> char {
        (b'A' + self.index()) as char
    }
}
