//! SPI NOR flash command opcodes

// ============================================================================
// Write control
// ============================================================================

/// Write Enable
pub const WREN: u8 = 0x06;
/// Write Disable
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status registers
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Write Status Register 1
pub const WRSR: u8 = 0x01;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Read Status Register 3
pub const RDSR3: u8 = 0x15;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read / program / erase
// ============================================================================

/// Read Data
pub const READ: u8 = 0x03;
/// Fast Read (one dummy byte)
pub const FAST_READ: u8 = 0x0B;
/// Page Program
pub const PP: u8 = 0x02;
/// Sector Erase (4 KiB)
pub const SE_20: u8 = 0x20;
/// Block Erase (32 KiB)
pub const BE_52: u8 = 0x52;
/// Block Erase (64 KiB)
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Status register 1 bits
// ============================================================================

/// Write In Progress
pub const SR1_BUSY: u8 = 1 << 0;
/// Write Enable Latch
pub const SR1_WEL: u8 = 1 << 1;
/// Software protection field
pub const SR1_SWP: u8 = 0b11 << 2;
/// Write Protect pin state
pub const SR1_WPP: u8 = 1 << 4;
/// Erase/Program Error
pub const SR1_EPE: u8 = 1 << 5;
/// Sequential Program Mode
pub const SR1_SPM: u8 = 1 << 6;
/// Sector Protection Registers Locked
pub const SR1_SPRL: u8 = 1 << 7;
