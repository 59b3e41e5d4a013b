//! CLI argument parsing

use clap::Parser;

/// Parse a size or address: decimal, `0x` hex or leading-zero octal, with
/// an optional `k` (KiB) or `M` (MiB) suffix
pub fn parse_size(s: &str) -> Result<usize, String> {
    let (digits, scale) = if let Some(d) = s.strip_suffix('k') {
        (d, 1024)
    } else if let Some(d) = s.strip_suffix('M') {
        (d, 1024 * 1024)
    } else {
        (s, 1)
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        usize::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<usize>()
    };

    value
        .ok()
        .and_then(|v| v.checked_mul(scale))
        .ok_or_else(|| format!("`{}' is not a valid size", s))
}

fn parse_offset(s: &str) -> Result<u32, String> {
    let value = parse_size(s).map_err(|_| format!("`{}' is not a valid offset", s))?;
    u32::try_from(value).map_err(|_| format!("`{}' is not a valid offset", s))
}

fn parse_divider(s: &str) -> Result<u32, String> {
    match parse_size(s) {
        Ok(v) if (1..=65536).contains(&v) => Ok(v as u32),
        _ => Err(format!(
            "clock divider must be in range 1-65536 `{}' is not a valid divider",
            s
        )),
    }
}

fn parse_interface(s: &str) -> Result<char, String> {
    match s {
        "A" | "B" | "C" | "D" => Ok(s.chars().next().unwrap_or('A')),
        _ => Err(format!(
            "`{}' is not a valid interface (must be `A', `B', `C', or `D')",
            s
        )),
    }
}

fn parse_erase_block(s: &str) -> Result<u32, String> {
    match s {
        "4" => Ok(4),
        "32" => Ok(32),
        "64" => Ok(64),
        _ => Err(format!(
            "`{}' is not a valid erase block size (must be `4', `32' or `64')",
            s
        )),
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    let mut names = Vec::new();
    if cfg!(feature = "ftdi") {
        names.push("ftdi");
    }
    if cfg!(feature = "dummy") {
        names.push("dummy");
    }
    format!("Programmer to use [available: {}]", names.join(", "))
}

/// Slow clock divider used by `-s` (about 200 kHz)
pub const SLOW_DIVIDER: u32 = 30;

#[derive(Parser, Debug)]
#[command(name = "ecpflasher")]
#[command(
    author,
    version,
    about = "Programming tool for Lattice ECP5/NX FPGAs over JTAG",
    long_about = "Programming tool for Lattice ECP5/NX FPGAs over JTAG.\n\n\
        Writes the SPI configuration flash through the FPGA's background SPI \
        pass-through, or loads a bitstream directly into configuration SRAM.\n\n\
        Exit status: 0 on success, 1 on invalid options or file errors, \
        2 if communication with the hardware failed, 3 if verification failed."
)]
pub struct Cli {
    /// Input or output file, `-` for stdin/stdout
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,

    /// Use the specified USB device (i:<vendor>:<product>)
    #[arg(short = 'd', value_name = "DEVICE")]
    pub device: Option<String>,

    /// Connect to the specified interface on the FTDI chip
    #[arg(short = 'I', value_name = "A-D", default_value = "A", value_parser = parse_interface)]
    pub interface: char,

    /// Start address for read/write (k and M suffixes accepted)
    #[arg(short = 'o', value_name = "OFFSET", default_value = "0", value_parser = parse_offset)]
    pub offset: u32,

    /// Divider for the JTAG clock, TCK = 6 MHz / divider
    #[arg(short = 'k', value_name = "DIVIDER", value_parser = parse_divider)]
    pub divider: Option<u32>,

    /// Slow JTAG clock, equivalent to -k 30
    #[arg(short = 's')]
    pub slow: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Erase block size in KiB
    #[arg(short = 'i', value_name = "4|32|64", default_value = "64", value_parser = parse_erase_block)]
    pub erase_block: u32,

    /// Reinitialize the FPGA after the operation
    #[arg(short = 'a')]
    pub refresh: bool,

    /// Write file contents to flash without verifying
    #[arg(short = 'X')]
    pub no_verify: bool,

    /// Read the first 256 KiB of flash and write it to the file
    #[arg(short = 'r')]
    pub read: bool,

    /// Read the given number of bytes from flash
    #[arg(short = 'R', value_name = "SIZE", value_parser = parse_size)]
    pub read_size: Option<usize>,

    /// Do not write flash, only verify (`check')
    #[arg(short = 'c')]
    pub check: bool,

    /// Program configuration SRAM instead of flash
    #[arg(short = 'S')]
    pub sram: bool,

    /// Just read the device and flash IDs
    #[arg(short = 't')]
    pub test: bool,

    /// Bulk erase the entire flash before writing
    #[arg(short = 'b')]
    pub bulk_erase: bool,

    /// Erase flash as if writing that number of bytes
    #[arg(short = 'e', value_name = "SIZE", value_parser = parse_size)]
    pub erase: Option<usize>,

    /// Do not erase flash before writing
    #[arg(short = 'n')]
    pub no_erase: bool,

    /// Disable write protection before erasing or writing
    #[arg(short = 'p')]
    pub disable_protection: bool,

    #[arg(long, default_value = "ftdi", help = programmer_help())]
    pub programmer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1234"), Ok(1234));
        assert_eq!(parse_size("0x100"), Ok(256));
        assert_eq!(parse_size("010"), Ok(8));
        assert_eq!(parse_size("0"), Ok(0));
        assert_eq!(parse_size("256k"), Ok(256 * 1024));
        assert_eq!(parse_size("2M"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("0x10k"), Ok(16 * 1024));
        assert!(parse_size("12kb").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("k").is_err());
    }

    #[test]
    fn test_parse_divider() {
        assert_eq!(parse_divider("1"), Ok(1));
        assert_eq!(parse_divider("65536"), Ok(65536));
        assert!(parse_divider("0").is_err());
        assert!(parse_divider("65537").is_err());
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from(["ecpflasher", "-o", "64k", "-i", "4", "-v", "-v", "top.bit"])
            .unwrap();
        assert_eq!(cli.offset, 64 * 1024);
        assert_eq!(cli.erase_block, 4);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.files, ["top.bit"]);
        assert_eq!(cli.interface, 'A');
        assert_eq!(cli.programmer, "ftdi");

        assert!(Cli::try_parse_from(["ecpflasher", "-i", "16", "top.bit"]).is_err());
        assert!(Cli::try_parse_from(["ecpflasher", "-I", "E", "top.bit"]).is_err());
    }

    #[test]
    fn test_stdin_dash_is_a_file() {
        let cli = Cli::try_parse_from(["ecpflasher", "-S", "-"]).unwrap();
        assert!(cli.sram);
        assert_eq!(cli.files, ["-"]);
    }
}
