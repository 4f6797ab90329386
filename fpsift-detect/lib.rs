//! Fingerprint image enhancement and SIFT feature extraction.
//!
//! Detection and description are delegated to OpenCV's SIFT behind the
//! [`FeatureDetector`] trait; enhancement runs on `image` buffers.
//!
//! The usual entry point is [`ExtractorBuilder`], which produces a
//! [`FeatureExtractor`] turning encoded image bytes into a [`Template`].

pub mod builder;
pub mod config;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod preprocessing;
pub mod utils;

pub use builder::ExtractorBuilder;
pub use config::{ExtractorConfig, PreprocessConfig, SiftConfig};
pub use detector::{FeatureDetector, SiftDetector};
pub use error::{DetectError, DetectResult};
pub use extractor::FeatureExtractor;
pub use fpsift_core::{DescriptorMatrix, Keypoint, Template};
pub use preprocessing::ImagePreprocessing;

/// Extractor with default preprocessing and detector parameters.
pub fn default_extractor() -> DetectResult<FeatureExtractor<SiftDetector>> {
    ExtractorBuilder::new().build()
}
