//! Table-driven status register decoding
//!
//! A register layout is a static slice of [`Field`]s. One generic routine,
//! [`decode`], walks the slice and names each bit or bit group. Multi-bit
//! groups are matched against a meaning table, and values missing from the
//! table decode as [`FieldValue::Reserved`] instead of failing.

pub mod ecp5;
pub mod flash;
pub mod nx;

use core::fmt;

use crate::device::DeviceFamily;
use crate::error::Result;
use crate::fpga::Command;
use crate::jtag::JtagTap;
use crate::session::Session;

/// How to interpret the bits of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meaning {
    /// Single bit, shown as yes/no
    Flag,
    /// Single bit with a name for each level
    Choice {
        /// Text when the bit is 0
        clear: &'static str,
        /// Text when the bit is 1
        set: &'static str,
    },
    /// Bit group with an enumerated meaning per value
    Table(&'static [(u8, &'static str)]),
}

/// One entry of a register layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Lowest bit of the field
    pub offset: u8,
    /// Number of bits (at most 8)
    pub width: u8,
    /// Human-readable name
    pub label: &'static str,
    /// Interpretation of the extracted bits
    pub meaning: Meaning,
}

impl Field {
    /// Single yes/no bit
    pub const fn flag(offset: u8, label: &'static str) -> Self {
        Self {
            offset,
            width: 1,
            label,
            meaning: Meaning::Flag,
        }
    }

    /// Single bit with named levels
    pub const fn choice(offset: u8, label: &'static str, clear: &'static str, set: &'static str) -> Self {
        Self {
            offset,
            width: 1,
            label,
            meaning: Meaning::Choice { clear, set },
        }
    }

    /// Bit group with a meaning table
    pub const fn group(
        offset: u8,
        width: u8,
        label: &'static str,
        table: &'static [(u8, &'static str)],
    ) -> Self {
        Self {
            offset,
            width,
            label,
            meaning: Meaning::Table(table),
        }
    }

    /// Raw bits of this field in `value`
    pub fn extract(&self, value: u64) -> u8 {
        let mask = (1u64 << self.width) - 1;
        ((value >> self.offset) & mask) as u8
    }

    /// Decode this field from a register value
    pub fn decode(&'static self, value: u64) -> Decoded {
        let raw = self.extract(value);
        let value = match self.meaning {
            Meaning::Flag => FieldValue::Flag(raw != 0),
            Meaning::Choice { clear, set } => FieldValue::Named(if raw != 0 { set } else { clear }),
            Meaning::Table(table) => match table.iter().find(|(v, _)| *v == raw) {
                Some(&(_, name)) => FieldValue::Named(name),
                None => FieldValue::Reserved,
            },
        };
        Decoded {
            field: self,
            raw,
            value,
        }
    }
}

/// Interpreted value of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Yes/no bit
    Flag(bool),
    /// Named level or table entry
    Named(&'static str),
    /// Value missing from the meaning table
    Reserved,
}

/// A field together with its decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Layout entry
    pub field: &'static Field,
    /// Extracted bits
    pub raw: u8,
    /// Interpretation
    pub value: FieldValue,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<22}", self.field.label)?;
        match self.value {
            FieldValue::Flag(true) => write!(f, "Yes"),
            FieldValue::Flag(false) => write!(f, "No"),
            FieldValue::Named(name) if self.field.width > 1 => {
                write!(f, "{} (0b{:0w$b})", name, self.raw, w = self.field.width as usize)
            }
            FieldValue::Named(name) => write!(f, "{}", name),
            FieldValue::Reserved => write!(
                f,
                "Reserved (0b{:0w$b})",
                self.raw,
                w = self.field.width as usize
            ),
        }
    }
}

/// Decode every field of a register layout
pub fn decode(value: u64, fields: &'static [Field]) -> impl Iterator<Item = Decoded> {
    fields.iter().map(move |field| field.decode(value))
}

const DONE_BIT: u64 = 1 << 8;
const ISC_ENABLE_BIT: u64 = 1 << 9;
const BUSY_BIT: u64 = 1 << 12;
const FAIL_BIT: u64 = 1 << 13;

/// Snapshot of the FPGA configuration status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    /// Family the layout belongs to
    pub family: DeviceFamily,
    /// Register value, zero-extended for 32-bit families
    pub raw: u64,
}

impl StatusRegister {
    /// Configuration finished and the device is in user mode
    pub fn done(&self) -> bool {
        self.raw & DONE_BIT != 0
    }

    /// Configuration interface enabled
    pub fn isc_enabled(&self) -> bool {
        self.raw & ISC_ENABLE_BIT != 0
    }

    /// Configuration engine busy
    pub fn busy(&self) -> bool {
        self.raw & BUSY_BIT != 0
    }

    /// Last configuration attempt failed
    pub fn fail(&self) -> bool {
        self.raw & FAIL_BIT != 0
    }

    /// All fields of the family layout
    pub fn fields(&self) -> impl Iterator<Item = Decoded> {
        decode(self.raw, self.family.status_fields())
    }

    /// Look up one field by label
    pub fn field(&self, label: &str) -> Option<Decoded> {
        self.fields().find(|d| d.field.label == label)
    }
}

impl fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            DeviceFamily::Nx => write!(f, "NX Status Register: 0x{:016X}", self.raw),
            DeviceFamily::Ecp5 => write!(f, "ECP5 Status Register: 0x{:08X}", self.raw),
            DeviceFamily::Unknown => write!(f, "Status Register: 0x{:08X}", self.raw),
        }
    }
}

impl<T: JtagTap> Session<T> {
    /// Read the configuration status register
    ///
    /// The width follows the family of the identified device; without an
    /// identification the register is read as 32 bits.
    pub fn read_status(&mut self) -> Result<StatusRegister> {
        let family = self.device().map(|d| d.family).unwrap_or_default();
        self.shift_ir(Command::ReadStatus.opcode())?;

        let bits = family.status_bits();
        let mut data = [0u8; 8];
        self.shift_dr(&mut data[..bits / 8], bits)?;

        let status = StatusRegister {
            family,
            raw: u64::from_le_bytes(data),
        };
        log::info!("{}", status);
        for field in status.fields() {
            log::debug!("  {}", field);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::jtag::TapState;
    use crate::testing::MockTap;

    #[test]
    fn test_done_only() {
        let status = StatusRegister {
            family: DeviceFamily::Ecp5,
            raw: 1 << 8,
        };
        assert!(status.done());
        assert!(!status.busy());
        assert!(!status.fail());
        for d in status.fields() {
            match d.value {
                FieldValue::Flag(set) => assert_eq!(set, d.field.label == "DONE", "{}", d.field.label),
                FieldValue::Named(_) => {}
                FieldValue::Reserved => panic!("{} reserved", d.field.label),
            }
        }
        assert_eq!(
            status.field("DONE").map(|d| d.value),
            Some(FieldValue::Flag(true))
        );
    }

    #[test]
    fn test_reserved_fallback() {
        // Config Target 0b101 has no meaning on NX
        let status = StatusRegister {
            family: DeviceFamily::Nx,
            raw: 0b101 << 1,
        };
        let target = status.field("Config Target").unwrap();
        assert_eq!(target.raw, 0b101);
        assert_eq!(target.value, FieldValue::Reserved);
    }

    #[test]
    fn test_bse_error_code() {
        let status = StatusRegister {
            family: DeviceFamily::Ecp5,
            raw: 0b011 << 23,
        };
        assert_eq!(
            status.field("BSE Error Code").map(|d| d.value),
            Some(FieldValue::Named("CRC Error"))
        );

        let status = StatusRegister {
            family: DeviceFamily::Nx,
            raw: 0b1010 << 24,
        };
        assert_eq!(
            status.field("BSE Error Code").map(|d| d.value),
            Some(FieldValue::Named("Bitstream Engine Timeout Error"))
        );
    }

    #[test]
    fn test_every_value_decodes() {
        for layout in [ecp5::FIELDS, nx::FIELDS, flash::SR1_FIELDS, flash::SR2_FIELDS] {
            for field in layout {
                assert!(field.width >= 1 && field.width <= 8);
                for raw in 0..(1u64 << field.width) {
                    let _ = field.decode(raw << field.offset);
                }
            }
        }
    }

    #[test]
    fn test_read_status_width_follows_family() {
        let tap = MockTap::with_responder(|shift, data| {
            if shift.state == TapState::ShiftDr {
                for (i, b) in data.iter_mut().enumerate() {
                    *b = i as u8 + 1;
                }
            }
        });
        let mut session = Session::new(tap);
        session.set_device(DeviceInfo::lookup(0x110F_1043));
        let status = session.read_status().unwrap();
        assert_eq!(status.raw, 0x0807_0605_0403_0201);
        assert_eq!(session.tap().shifts[1].bits, 64);
        assert_eq!(session.tap().shifts[0].tx, [0x3C]);

        session.set_device(DeviceInfo::lookup(0x4111_3043));
        let status = session.read_status().unwrap();
        assert_eq!(status.raw, 0x0403_0201);
        assert_eq!(session.tap().shifts[3].bits, 32);
    }
}
