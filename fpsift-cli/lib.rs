//! Command-line front end and high-level API for fingerprint SIFT templates.
//!
//! [`FingerprintSift`] bundles a configured extractor and matcher. The
//! `fpsift` binary is a thin wrapper over [`run_command`].

pub mod args;
pub mod commands;
pub mod config;
pub mod error;

use fpsift_detect::{DetectResult, ExtractorBuilder, FeatureExtractor, SiftDetector};
use fpsift_match::{ComparisonResult, ConfiguredMatcher, MatchResult, TemplateMatcher};

pub use args::{parse_args, CliArgs, ParsedArgs};
pub use commands::{run_command, Command, CommandOutput};
pub use config::AppConfig;
pub use error::{CliError, CliResult};
pub use fpsift_core::{self, DescriptorMatrix, Keypoint, Template};

/// High-level fingerprint feature extractor and comparator
pub struct FingerprintSift {
    extractor: FeatureExtractor<SiftDetector>,
    matcher: TemplateMatcher<ConfiguredMatcher>,
}

impl FingerprintSift {
    /// Build from configuration. Does not touch the global thread pool.
    pub fn new(config: &AppConfig) -> CliResult<Self> {
        let extractor = ExtractorBuilder::from_config(config.extractor.clone()).build()?;
        let matcher = TemplateMatcher::from_config(&config.matcher)?;
        Ok(Self { extractor, matcher })
    }

    /// Decode image bytes and extract a template
    pub fn extract(&self, image_bytes: &[u8]) -> DetectResult<Template> {
        self.extractor.extract(image_bytes)
    }

    /// Compare two templates; the first is the query side
    pub fn compare(&self, first: &Template, second: &Template) -> MatchResult<ComparisonResult> {
        self.matcher.compare(first, second)
    }

    pub fn extractor(&self) -> &FeatureExtractor<SiftDetector> {
        &self.extractor
    }

    pub fn matcher(&self) -> &TemplateMatcher<ConfiguredMatcher> {
        &self.matcher
    }
}
