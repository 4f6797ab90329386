use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use crate::FingerprintSift;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fpsift_core::Template;
use fpsift_match::ComparisonResult;
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// Commands understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// base64 image on stdin, template JSON out.
    Extract,
    /// `{template1, template2}` JSON on stdin, comparison JSON out.
    Compare,
    /// Print the effective configuration.
    Config,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        match s {
            "extract" => Ok(Self::Extract),
            "compare" => Ok(Self::Compare),
            "config" => Ok(Self::Config),
            other => Err(CliError::UnknownCommand(other.to_string())),
        }
    }
}

impl Command {
    pub fn parse(command: Option<&str>) -> CliResult<Self> {
        command.ok_or(CliError::MissingCommand)?.parse()
    }

    pub fn reads_stdin(&self) -> bool {
        matches!(self, Self::Extract | Self::Compare)
    }
}

/// Successful extraction payload.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    #[serde(flatten)]
    pub template: Template,
    pub num_features: usize,
}

/// Successful comparison payload.
#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: ComparisonResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

/// Whatever a command prints on stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Extract(ExtractResponse),
    Compare(CompareResponse),
    Config(Box<AppConfig>),
    Failure(FailureResponse),
}

impl CommandOutput {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(FailureResponse {
            success: false,
            error: error.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Single-line JSON.
    pub fn to_json(&self) -> CliResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse `command` and run it against `input` (the full stdin text).
///
/// Extraction and comparison failures come back as `Ok` failure payloads;
/// `Err` is reserved for problems that prevent a payload, which the binary
/// reports with exit code 1.
pub fn run_command(command: Option<&str>, input: &str, config: &AppConfig) -> CliResult<CommandOutput> {
    execute(Command::parse(command)?, input, config)
}

pub fn execute(command: Command, input: &str, config: &AppConfig) -> CliResult<CommandOutput> {
    debug!(?command, input_len = input.len(), "dispatching");
    match command {
        Command::Config => Ok(CommandOutput::Config(Box::new(config.clone()))),
        Command::Extract => {
            let bytes = decode_base64(input)?;
            let engine = FingerprintSift::new(config)?;
            Ok(extract_bytes(&engine, &bytes))
        }
        Command::Compare => {
            let (first, second) = parse_compare_request(input)?;
            let engine = FingerprintSift::new(config)?;
            Ok(compare_values(&engine, first, second))
        }
    }
}

/// Strip whitespace (including line wraps) and decode standard base64.
pub fn decode_base64(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

fn extract_bytes(engine: &FingerprintSift, bytes: &[u8]) -> CommandOutput {
    match engine.extract(bytes) {
        Ok(template) => CommandOutput::Extract(ExtractResponse {
            success: true,
            num_features: template.num_features(),
            template,
        }),
        Err(e) => {
            warn!(error = %e, "extraction failed");
            CommandOutput::failure(e.to_string())
        }
    }
}

/// Split a compare request into its two raw template values.
pub fn parse_compare_request(input: &str) -> CliResult<(serde_json::Value, serde_json::Value)> {
    let mut request: serde_json::Value = serde_json::from_str(input)?;
    let mut take = |key: &'static str| {
        request
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or(CliError::MissingField(key))
    };
    let first = take("template1")?;
    let second = take("template2")?;
    Ok((first, second))
}

fn compare_values(
    engine: &FingerprintSift,
    first: serde_json::Value,
    second: serde_json::Value,
) -> CommandOutput {
    let outcome = Template::from_json_value(first)
        .and_then(|a| Template::from_json_value(second).map(|b| (a, b)))
        .map_err(|e| e.to_string())
        .and_then(|(a, b)| engine.compare(&a, &b).map_err(|e| e.to_string()));
    match outcome {
        Ok(result) => CommandOutput::Compare(CompareResponse {
            success: true,
            result,
        }),
        Err(e) => {
            warn!(error = %e, "comparison failed");
            CommandOutput::failure(e)
        }
    }
}
