use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("malformed template: descriptor dimensionality {left} does not match {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("descriptor matcher failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Template(#[from] fpsift_core::TemplateError),
}

impl From<opencv::Error> for MatchError {
    fn from(err: opencv::Error) -> Self {
        MatchError::Backend(err.to_string())
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
