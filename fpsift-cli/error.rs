use fpsift_detect::DetectError;
use fpsift_match::MatchError;
use thiserror::Error;

/// Failures that abort a command before a result payload exists.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid arguments: {0}")]
    Usage(String),
    #[error("no command specified")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request is missing field `{0}`")]
    MissingField(&'static str),
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Match(#[from] MatchError),
}

pub type CliResult<T> = Result<T, CliError>;
