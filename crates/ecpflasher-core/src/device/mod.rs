//! Device identification
//!
//! The IDCODE picks the device family, and the family picks the width and
//! layout of the configuration status register.

mod ids;

pub use ids::KNOWN_DEVICES;

use core::fmt;

use crate::error::Result;
use crate::fpga::Command;
use crate::jtag::JtagTap;
use crate::session::Session;
use crate::status::{self, Field};

/// FPGA family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceFamily {
    /// IDCODE not in any table
    #[default]
    Unknown,
    /// Lattice ECP5 / ECP5-5G
    Ecp5,
    /// Lattice Nexus (CrossLink-NX, Certus-NX, CertusPro-NX)
    Nx,
}

impl DeviceFamily {
    /// Family name for display
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ecp5 => "ECP5",
            Self::Nx => "NX",
        }
    }

    /// Width of the configuration status register in bits
    ///
    /// Unknown devices are read like ECP5 parts.
    pub fn status_bits(self) -> usize {
        match self {
            Self::Nx => 64,
            Self::Ecp5 | Self::Unknown => 32,
        }
    }

    /// Field table for the configuration status register
    pub fn status_fields(self) -> &'static [Field] {
        match self {
            Self::Ecp5 => status::ecp5::FIELDS,
            Self::Nx => status::nx::FIELDS,
            Self::Unknown => &[],
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the IDCODE table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDevice {
    /// Part name
    pub name: &'static str,
    /// JTAG IDCODE
    pub idcode: u32,
    /// Family
    pub family: DeviceFamily,
}

/// Identity of the connected device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Family, `Unknown` if the IDCODE is not in the table
    pub family: DeviceFamily,
    /// Raw IDCODE as read
    pub idcode: u32,
    /// Part name, `"unknown"` if the IDCODE is not in the table
    pub name: &'static str,
}

impl DeviceInfo {
    /// Look up an IDCODE in the built-in table
    pub fn lookup(idcode: u32) -> Self {
        Self::lookup_in(idcode, KNOWN_DEVICES)
    }

    /// Look up an IDCODE in a caller-supplied table
    pub fn lookup_in(idcode: u32, table: &[KnownDevice]) -> Self {
        match table.iter().find(|d| d.idcode == idcode) {
            Some(known) => Self {
                family: known.family,
                idcode,
                name: known.name,
            },
            None => Self {
                family: DeviceFamily::Unknown,
                idcode,
                name: "unknown",
            },
        }
    }

    /// Whether the IDCODE matched a table entry
    pub fn is_known(&self) -> bool {
        self.family != DeviceFamily::Unknown
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{} ({}, IDCODE 0x{:08X})", self.name, self.family, self.idcode)
        } else {
            write!(f, "unknown device (IDCODE 0x{:08X})", self.idcode)
        }
    }
}

impl<T: JtagTap> Session<T> {
    /// Read the IDCODE and identify the device against the built-in table
    pub fn read_idcode(&mut self) -> Result<DeviceInfo> {
        self.read_idcode_from(KNOWN_DEVICES)
    }

    /// Read the IDCODE and identify the device against `table`
    ///
    /// The result is remembered by the session and selects the status
    /// register layout for later reads. An unknown IDCODE is not an error.
    pub fn read_idcode_from(&mut self, table: &[KnownDevice]) -> Result<DeviceInfo> {
        self.shift_ir(Command::ReadId.opcode())?;
        let mut data = [0u8; 4];
        self.shift_dr(&mut data, 32)?;

        let info = DeviceInfo::lookup_in(u32::from_le_bytes(data), table);
        if info.is_known() {
            log::info!("IDCODE: 0x{:08X} ({})", info.idcode, info.name);
        } else {
            log::warn!("IDCODE 0x{:08X} does not match any known device", info.idcode);
        }
        self.set_device(info);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jtag::TapState;
    use crate::testing::MockTap;

    fn idcode_tap(idcode: u32) -> MockTap {
        MockTap::with_responder(move |shift, data| {
            if shift.state == TapState::ShiftDr {
                data[..4].copy_from_slice(&idcode.to_le_bytes());
            }
        })
    }

    #[test]
    fn test_read_idcode_from_table() {
        let table = [KnownDevice {
            name: "X",
            idcode: 0xABCD_1234,
            family: DeviceFamily::Ecp5,
        }];
        let mut session = Session::new(idcode_tap(0xABCD_1234));
        let info = session.read_idcode_from(&table).unwrap();
        assert_eq!(info.family, DeviceFamily::Ecp5);
        assert_eq!(info.name, "X");
        assert_eq!(session.device(), Some(&info));
        assert_eq!(session.tap().shifts[0].tx, [0xE0]);
    }

    #[test]
    fn test_unknown_idcode_is_not_an_error() {
        let mut session = Session::new(idcode_tap(0));
        let info = session.read_idcode().unwrap();
        assert_eq!(info.family, DeviceFamily::Unknown);
        assert_eq!(info.idcode, 0);
        assert!(!info.is_known());
    }

    #[test]
    fn test_builtin_table() {
        let info = DeviceInfo::lookup(0x4111_3043);
        assert_eq!(info.name, "LFE5U-85");
        assert_eq!(info.family.status_bits(), 32);

        let info = DeviceInfo::lookup(0x110F_1043);
        assert_eq!(info.name, "LIFCL-40");
        assert_eq!(info.family.status_bits(), 64);
    }

    #[test]
    fn test_table_has_no_duplicates() {
        for (i, a) in KNOWN_DEVICES.iter().enumerate() {
            for b in &KNOWN_DEVICES[i + 1..] {
                assert_ne!(a.idcode, b.idcode, "{} / {}", a.name, b.name);
            }
        }
    }
}
