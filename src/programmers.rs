//! Programmer registration and dispatch
//!
//! Every backend ends up as a [`JtagTap`]; the rest of the tool never
//! knows which one it is talking to.

use crate::error::CliError;
use ecpflasher_core::jtag::JtagTap;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Name used with `--programmer`
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "ftdi")]
    programmers.push(ProgrammerInfo {
        name: "ftdi",
        description: "FTDI MPSSE JTAG adapter (FT2232H/FT232H)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        description: "Emulated ECP5 with 16 MiB SPI flash, for testing",
    });

    programmers
}

/// Adapter settings collected from the command line
#[derive(Debug, Clone, Default)]
pub struct ProgrammerOptions {
    /// USB device string (`-d`)
    pub device: Option<String>,
    /// FTDI interface letter (`-I`)
    pub interface: char,
    /// TCK divider (`-k`/`-s`)
    pub divider: Option<u32>,
}

/// Execute a function with the specified programmer
///
/// The programmer stays open for the duration of `f` and is closed (pins
/// released) when it returns.
#[allow(unused_variables)]
pub fn with_programmer<F, R>(name: &str, options: &ProgrammerOptions, f: F) -> Result<R, CliError>
where
    F: FnOnce(&mut dyn JtagTap) -> Result<R, CliError>,
{
    match name {
        #[cfg(feature = "ftdi")]
        "ftdi" => {
            use ecpflasher_ftdi::{FtdiConfig, FtdiInterface, FtdiJtag};

            let interface = FtdiInterface::from_char(options.interface).ok_or_else(|| {
                CliError::Usage(format!("`{}' is not a valid interface", options.interface))
            })?;
            let mut config = FtdiConfig::default().interface(interface);
            if let Some(divider) = options.divider {
                config = config
                    .divider(divider)
                    .map_err(|e| CliError::Usage(e.to_string()))?;
            }
            if let Some(device) = &options.device {
                config = config
                    .device(device)
                    .map_err(|e| CliError::Usage(e.to_string()))?;
            }

            log::info!("init..");
            let mut jtag = FtdiJtag::open(&config).map_err(|e| {
                CliError::Programmer(format!(
                    "Failed to open FTDI device: {}\n\
                     Make sure the device is connected and you have permissions.\n\
                     You may need to unbind the kernel ftdi_sio driver:\n\
                     echo -n '<bus>-<port>' | sudo tee /sys/bus/usb/drivers/ftdi_sio/unbind",
                    e
                ))
            })?;
            f(&mut jtag)
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            if options.device.is_some() {
                log::warn!("dummy programmer ignores the device string");
            }
            let mut fpga = ecpflasher_dummy::DummyFpga::new_default();
            f(&mut fpga)
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

fn unknown_programmer_error(name: &str) -> CliError {
    let mut msg = format!("Unknown programmer: {}\n\nAvailable programmers:\n", name);
    for p in available_programmers() {
        msg.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    CliError::Usage(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_programmer() {
        let options = ProgrammerOptions::default();
        let result = with_programmer("ch341a", &options, |_| Ok(()));
        match result {
            Err(CliError::Usage(msg)) => assert!(msg.contains("Unknown programmer: ch341a")),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_programmer_opens() {
        let options = ProgrammerOptions::default();
        let state = with_programmer("dummy", &options, |tap| Ok(tap.state())).unwrap();
        assert_eq!(state, ecpflasher_core::jtag::TapState::TestLogicReset);
    }
}
