//! Mode of operation
//!
//! [`ModeFlags`] is the raw set of switches a front end collects; [`Plan`]
//! is the validated request the orchestrator executes. Invalid flag
//! combinations are rejected before any hardware is touched.

use crate::error::{Error, Result};
use crate::protocol::EraseBlock;

/// Default length for a read without an explicit size
pub const DEFAULT_READ_SIZE: usize = 256 * 1024;

/// How to erase before programming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseStrategy {
    /// Erase the block-aligned region covering the data
    Blocks(EraseBlock),
    /// Erase the whole chip
    Bulk,
    /// Do not erase
    Skip,
}

impl Default for EraseStrategy {
    fn default() -> Self {
        Self::Blocks(EraseBlock::default())
    }
}

/// Options for writing an image to flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Erase strategy
    pub erase: EraseStrategy,
    /// Clear the status register protection bits first
    pub disable_protection: bool,
    /// Read back and compare after writing
    pub verify: bool,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            erase: EraseStrategy::default(),
            disable_protection: false,
            verify: true,
        }
    }
}

/// What the orchestrator should do after identifying the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read flash ID and status registers only
    Probe,
    /// Load the image into configuration SRAM
    LoadSram,
    /// Write the image to flash
    Program(ProgramOptions),
    /// Erase the region a `len`-byte image would occupy
    Erase {
        /// Pretend image length
        len: usize,
        /// Erase strategy
        erase: EraseStrategy,
        /// Clear protection bits first
        disable_protection: bool,
    },
    /// Compare flash with the image without writing
    Verify,
    /// Read `len` bytes of flash
    Read {
        /// Bytes to read
        len: usize,
    },
}

/// A validated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Operation
    pub operation: Operation,
    /// Flash address for read/write/erase/verify
    pub offset: u32,
    /// Reboot the FPGA afterwards
    pub refresh: bool,
}

impl Plan {
    /// Whether the operation consumes an input image
    pub fn needs_input(&self) -> bool {
        matches!(
            self.operation,
            Operation::LoadSram | Operation::Program(_) | Operation::Verify
        )
    }

    /// Whether a missing input file means an empty image
    ///
    /// Bulk erase and protection removal are useful on their own.
    pub fn input_optional(&self) -> bool {
        match self.operation {
            Operation::Program(options) => {
                options.erase == EraseStrategy::Bulk || options.disable_protection
            }
            _ => false,
        }
    }

    /// Whether the operation produces output data
    pub fn writes_output(&self) -> bool {
        matches!(self.operation, Operation::Read { .. })
    }
}

/// Raw mode switches as collected from a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    /// Read this many bytes
    pub read: Option<usize>,
    /// Erase as if writing this many bytes
    pub erase: Option<usize>,
    /// Verify only
    pub check: bool,
    /// Load SRAM
    pub sram: bool,
    /// Probe only
    pub probe: bool,
    /// Bulk erase
    pub bulk_erase: bool,
    /// Skip erase
    pub no_erase: bool,
    /// Clear protection bits
    pub disable_protection: bool,
    /// Skip verify
    pub no_verify: bool,
    /// Flash offset
    pub offset: u32,
    /// Reboot afterwards
    pub refresh: bool,
    /// Erase granularity
    pub erase_block: EraseBlock,
}

impl ModeFlags {
    /// Validate the switches and build a plan
    pub fn plan(&self) -> Result<Plan> {
        let modes = [
            self.read.is_some(),
            self.erase.is_some(),
            self.check,
            self.sram,
            self.probe,
        ];
        if modes.iter().filter(|&&m| m).count() > 1 {
            return Err(Error::InvalidOptions(
                "options `-r'/`-R', `-e', `-c', `-S', and `-t' are mutually exclusive",
            ));
        }
        if self.bulk_erase && self.no_erase {
            return Err(Error::InvalidOptions(
                "options `-b' and `-n' are mutually exclusive",
            ));
        }

        let non_writing = self.read.is_some() || self.check || self.sram || self.probe;
        if non_writing {
            if self.disable_protection {
                return Err(Error::InvalidOptions(
                    "option `-p' only valid in programming mode",
                ));
            }
            if self.bulk_erase {
                return Err(Error::InvalidOptions(
                    "option `-b' only valid in programming mode",
                ));
            }
            if self.no_erase {
                return Err(Error::InvalidOptions(
                    "option `-n' only valid in programming mode",
                ));
            }
        }
        if self.offset != 0 && self.sram {
            return Err(Error::InvalidOptions(
                "option `-o' not supported in SRAM mode",
            ));
        }
        if self.offset != 0 && self.probe {
            return Err(Error::InvalidOptions(
                "option `-o' not supported in test mode",
            ));
        }

        let erase = if self.bulk_erase {
            EraseStrategy::Bulk
        } else if self.no_erase {
            EraseStrategy::Skip
        } else {
            EraseStrategy::Blocks(self.erase_block)
        };

        let operation = if self.probe {
            Operation::Probe
        } else if self.sram {
            Operation::LoadSram
        } else if self.check {
            Operation::Verify
        } else if let Some(len) = self.read {
            Operation::Read { len }
        } else if let Some(len) = self.erase {
            Operation::Erase {
                len,
                erase,
                disable_protection: self.disable_protection,
            }
        } else {
            Operation::Program(ProgramOptions {
                erase,
                disable_protection: self.disable_protection,
                verify: !self.no_verify,
            })
        };

        Ok(Plan {
            operation,
            offset: self.offset,
            refresh: self.refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_program_and_verify() {
        let plan = ModeFlags::default().plan().unwrap();
        assert_eq!(plan.operation, Operation::Program(ProgramOptions::default()));
        assert!(plan.needs_input());
        assert!(!plan.input_optional());
    }

    #[test]
    fn test_modes_are_exclusive() {
        let flags = ModeFlags {
            read: Some(DEFAULT_READ_SIZE),
            sram: true,
            ..Default::default()
        };
        assert!(matches!(flags.plan(), Err(Error::InvalidOptions(_))));

        let flags = ModeFlags {
            erase: Some(4096),
            check: true,
            ..Default::default()
        };
        assert!(flags.plan().is_err());
    }

    #[test]
    fn test_bulk_and_skip_conflict() {
        let flags = ModeFlags {
            bulk_erase: true,
            no_erase: true,
            ..Default::default()
        };
        assert_eq!(
            flags.plan(),
            Err(Error::InvalidOptions("options `-b' and `-n' are mutually exclusive"))
        );
    }

    #[test]
    fn test_write_options_only_when_writing() {
        for flags in [
            ModeFlags { check: true, disable_protection: true, ..Default::default() },
            ModeFlags { sram: true, bulk_erase: true, ..Default::default() },
            ModeFlags { probe: true, no_erase: true, ..Default::default() },
            ModeFlags { read: Some(16), bulk_erase: true, ..Default::default() },
        ] {
            assert!(flags.plan().is_err(), "{:?}", flags);
        }

        // Erase-only mode accepts them
        let flags = ModeFlags {
            erase: Some(100),
            bulk_erase: true,
            disable_protection: true,
            ..Default::default()
        };
        assert_eq!(
            flags.plan().unwrap().operation,
            Operation::Erase {
                len: 100,
                erase: EraseStrategy::Bulk,
                disable_protection: true
            }
        );
    }

    #[test]
    fn test_offset_restrictions() {
        let flags = ModeFlags { sram: true, offset: 0x1000, ..Default::default() };
        assert!(flags.plan().is_err());
        let flags = ModeFlags { probe: true, offset: 0x1000, ..Default::default() };
        assert!(flags.plan().is_err());
        let flags = ModeFlags { check: true, offset: 0x1000, ..Default::default() };
        assert_eq!(flags.plan().unwrap().offset, 0x1000);
    }

    #[test]
    fn test_optional_input() {
        let flags = ModeFlags { bulk_erase: true, ..Default::default() };
        assert!(flags.plan().unwrap().input_optional());
        let flags = ModeFlags { disable_protection: true, no_verify: true, ..Default::default() };
        let plan = flags.plan().unwrap();
        assert!(plan.input_optional());
        assert!(matches!(plan.operation, Operation::Program(o) if !o.verify));
    }
}
