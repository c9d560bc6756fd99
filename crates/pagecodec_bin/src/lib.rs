//! Command line plumbing shared by the page tools.

use clap::{Args, Parser, ValueEnum};
use pagecodec::{ErrorKind, PageCodecError};

/// Exit code for usage and configuration errors.
pub const USAGE_EXIT_CODE: i32 = -1;
/// Exit code for every other failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LoggingMode {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl From<LoggingMode> for logutil::LoggingMode {
    fn from(mode: LoggingMode) -> Self {
        match mode {
            LoggingMode::Pretty => logutil::LoggingMode::Pretty,
            LoggingMode::Json => logutil::LoggingMode::Json,
            LoggingMode::Compact => logutil::LoggingMode::Compact,
        }
    }
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format.
    #[clap(long, value_enum)]
    pub log_mode: Option<LoggingMode>,
}

impl LogArgs {
    pub fn init_logging(&self) {
        logutil::init(self.verbose, self.log_mode.unwrap_or_default().into());
    }
}

/// Parse command line arguments, exiting with the usage line on failure.
///
/// Help and version requests are printed as usual.
pub fn parse_or_usage<P: Parser>(usage: &str) -> P {
    match P::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                e.exit()
            }
            _ => {
                eprint!("{e}");
                println!("{usage}");
                std::process::exit(USAGE_EXIT_CODE)
            }
        },
    }
}

pub fn exit_code(err: &PageCodecError) -> i32 {
    match err.kind() {
        ErrorKind::Configuration => USAGE_EXIT_CODE,
        _ => FAILURE_EXIT_CODE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecodec::Encoding;

    #[test]
    fn exit_codes() {
        let cases = [
            (PageCodecError::InvalidConfig("zero".to_string()), USAGE_EXIT_CODE),
            (PageCodecError::UnsupportedEncoding("rle".to_string()), USAGE_EXIT_CODE),
            (PageCodecError::CorruptPage("bad".to_string()), FAILURE_EXIT_CODE),
            (
                PageCodecError::EncodingMismatch {
                    expected: Encoding::Plain,
                    got: Encoding::Delta,
                },
                FAILURE_EXIT_CODE,
            ),
            (
                PageCodecError::CorruptPage("bad".to_string()).in_column(2, "a"),
                FAILURE_EXIT_CODE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(expected, exit_code(&err), "err: {err}");
        }
    }
}
