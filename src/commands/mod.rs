//! Command implementation
//!
//! Turns the parsed command line into a [`Plan`], opens the input or output
//! file before any hardware is touched, then runs the plan on the selected
//! programmer.

mod report;

use std::fs::{self, File};
use std::io::{self, Read, Write};

use ecpflasher_core::flash::{self, ModeFlags, Operation, Outcome, Plan, Progress, DEFAULT_READ_SIZE};
use ecpflasher_core::protocol::EraseBlock;
use ecpflasher_core::session::Session;

use crate::cli::{Cli, SLOW_DIVIDER};
use crate::error::CliError;
use crate::programmers::{with_programmer, ProgrammerOptions};
use crate::progress::BarProgress;

/// Collect the mode switches from the command line
pub fn mode_flags(cli: &Cli) -> ModeFlags {
    let read = match (cli.read_size, cli.read) {
        (Some(size), _) => Some(size),
        (None, true) => Some(DEFAULT_READ_SIZE),
        (None, false) => None,
    };

    ModeFlags {
        read,
        erase: cli.erase,
        check: cli.check,
        sram: cli.sram,
        probe: cli.test,
        bulk_erase: cli.bulk_erase,
        no_erase: cli.no_erase,
        disable_protection: cli.disable_protection,
        no_verify: cli.no_verify,
        offset: cli.offset,
        refresh: cli.refresh,
        erase_block: EraseBlock::from_kib(cli.erase_block).unwrap_or_default(),
    }
}

/// Pick the file argument, if the plan wants one
pub fn select_file<'a>(plan: &Plan, files: &'a [String]) -> Result<Option<&'a str>, CliError> {
    match files {
        [file] => {
            if plan.operation == Operation::Probe {
                return Err(CliError::Usage("test mode doesn't take a file name".into()));
            }
            Ok(Some(file.as_str()))
        }
        [] => {
            let file_free = matches!(plan.operation, Operation::Probe | Operation::Erase { .. });
            if file_free || plan.input_optional() {
                Ok(None)
            } else {
                Err(CliError::Usage("missing argument".into()))
            }
        }
        _ => Err(CliError::Usage("too many arguments".into())),
    }
}

/// Read the whole image; `-` reads standard input
fn load_input(plan: &Plan, file: Option<&str>) -> Result<Vec<u8>, CliError> {
    let file = match file {
        Some(file) if plan.needs_input() => file,
        _ => return Ok(Vec::new()),
    };

    let result = if file == "-" {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data).map(|_| data)
    } else {
        fs::read(file)
    };

    let data = result.map_err(|source| CliError::File {
        path: file.to_string(),
        action: "reading",
        source,
    })?;
    log::debug!("Loaded {} bytes from {}", data.len(), file);
    Ok(data)
}

/// Open the output file for read mode; `-` writes to standard output
fn open_output(plan: &Plan, file: Option<&str>) -> Result<Option<(String, Box<dyn Write>)>, CliError> {
    let file = match file {
        Some(file) if plan.writes_output() => file,
        _ => return Ok(None),
    };

    let writer: Box<dyn Write> = if file == "-" {
        Box::new(io::stdout())
    } else {
        let f = File::create(file).map_err(|source| CliError::File {
            path: file.to_string(),
            action: "writing",
            source,
        })?;
        Box::new(f)
    };
    Ok(Some((file.to_string(), writer)))
}

/// Run the command line
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let plan = mode_flags(cli).plan()?;
    let file = select_file(&plan, &cli.files)?;

    let image = load_input(&plan, file)?;
    let mut output = open_output(&plan, file)?;

    let options = ProgrammerOptions {
        device: cli.device.clone(),
        interface: cli.interface,
        divider: if cli.slow { Some(SLOW_DIVIDER) } else { cli.divider },
    };

    let report = with_programmer(&cli.programmer, &options, |tap| {
        let mut session = Session::new(tap);
        let mut progress = BarProgress::new();
        let result = flash::execute(&mut session, &plan, &image, &mut progress);
        progress.finish();
        Ok(result?)
    })?;

    report::print(&report, &plan);

    if let (Outcome::Read(data), Some((path, writer))) = (&report.outcome, output.as_mut()) {
        writer
            .write_all(data)
            .and_then(|_| writer.flush())
            .map_err(|source| CliError::Output {
                path: path.clone(),
                source,
            })?;
    }

    log::info!("Bye.");
    Ok(())
}
