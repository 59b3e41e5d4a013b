//! Error type for the command line front end

use ecpflasher_core::{Error as CoreError, ErrorKind};

/// Failures reported by the command line tool
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad option combination or missing argument
    #[error("{0}")]
    Usage(String),

    /// Input or output file problem
    #[error("can't open '{path}' for {action}: {source}")]
    File {
        path: String,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Writing read-back data failed
    #[error("{path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The programmer could not be opened
    #[error("{0}")]
    Programmer(String),

    /// The engine reported a failure
    #[error(transparent)]
    Engine(#[from] CoreError),
}

impl CliError {
    /// Process exit status for this failure
    pub fn exit_status(&self) -> u8 {
        match self {
            CliError::Usage(_) | CliError::File { .. } | CliError::Output { .. } => 1,
            CliError::Programmer(_) => 2,
            CliError::Engine(e) => match e.kind() {
                ErrorKind::Usage => 1,
                ErrorKind::Hardware => 2,
                ErrorKind::Verify => 3,
            },
        }
    }

    /// Whether to point the user at `--help`
    pub fn wants_help_hint(&self) -> bool {
        matches!(self, CliError::Usage(_))
    }
}
