use crate::error::{CliError, CliResult};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "fpsift",
    author,
    version,
    about = "Fingerprint SIFT feature extraction and comparison"
)]
pub struct CliArgs {
    /// `extract`, `compare` or `config`.
    pub command: Option<String>,
    /// JSON or TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Log at debug level on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the argument list asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    Run(CliArgs),
    /// `--help` or `--version`; the rendered text goes to stdout as is.
    Info(String),
}

/// Parse process arguments without letting clap exit the process.
///
/// Usage mistakes become [`CliError::Usage`] so they are reported as a JSON
/// failure line with exit code 1.
pub fn parse_args<I, T>(args: I) -> CliResult<ParsedArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(cli) => Ok(ParsedArgs::Run(cli)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(ParsedArgs::Info(e.to_string()))
        }
        Err(e) => {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            Err(CliError::Usage(
                first.trim_start_matches("error: ").trim().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_command_and_flags() {
        let parsed = parse_args(["fpsift", "compare", "-c", "cfg.toml", "-v"]).unwrap();
        let ParsedArgs::Run(cli) = parsed else {
            panic!("expected a run");
        };
        assert_eq!(cli.command.as_deref(), Some("compare"));
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_missing_command_is_left_to_dispatch() {
        let parsed = parse_args(["fpsift"]).unwrap();
        assert!(matches!(parsed, ParsedArgs::Run(CliArgs { command: None, .. })));
    }

    #[test]
    fn test_extra_arguments_are_usage_errors() {
        let err = parse_args(["fpsift", "extract", "extra"]).unwrap_err();
        assert!(matches!(&err, CliError::Usage(msg) if !msg.is_empty()));

        assert!(matches!(
            parse_args(["fpsift", "extract", "--bogus"]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_help_is_not_an_error() {
        let parsed = parse_args(["fpsift", "--help"]).unwrap();
        assert!(matches!(parsed, ParsedArgs::Info(text) if text.contains("compare")));
    }
}
