use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("no features were detected in the image")]
    NoFeatures,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("feature detector failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Template(#[from] fpsift_core::TemplateError),
}

impl From<opencv::Error> for DetectError {
    fn from(err: opencv::Error) -> Self {
        DetectError::Backend(err.to_string())
    }
}

pub type DetectResult<T> = Result<T, DetectError>;
