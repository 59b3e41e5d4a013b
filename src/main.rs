//! ecpflasher - Programming tool for Lattice ECP5/NX FPGAs
//!
//! Drives the FPGA's JTAG port through an FTDI MPSSE adapter to write the
//! SPI configuration flash (via the background SPI pass-through) or to
//! load a bitstream straight into configuration SRAM.
//!
//! # Architecture
//!
//! All protocol work lives in `ecpflasher-core`; this binary only parses
//! the command line, opens files and the programmer, shows progress, and
//! maps the result onto an exit status:
//!
//! - 0 on success
//! - 1 on invalid options or file errors
//! - 2 if communication with the hardware failed
//! - 3 if verification failed

mod cli;
mod commands;
mod error;
mod programmers;
mod progress;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // RUST_LOG still wins over -v
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ecpflasher: {}", e);
            if e.wants_help_hint() {
                eprintln!("Try `ecpflasher --help' for more information.");
            }
            ExitCode::from(e.exit_status())
        }
    }
}
