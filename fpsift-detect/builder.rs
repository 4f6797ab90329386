use crate::config::{ExtractorConfig, PreprocessConfig, SiftConfig};
use crate::detector::SiftDetector;
use crate::error::DetectResult;
use crate::extractor::FeatureExtractor;

/// Builder for creating a SIFT-backed `FeatureExtractor`
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    preprocess: PreprocessConfig,
    sift: SiftConfig,
    name: Option<String>,
}

impl ExtractorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of keypoints kept (0 keeps all)
    pub fn max_features(mut self, max_features: usize) -> Self {
        self.sift.max_features = max_features;
        self
    }

    pub fn octave_layers(mut self, layers: usize) -> Self {
        self.sift.n_octave_layers = layers;
        self
    }

    pub fn contrast_threshold(mut self, threshold: f32) -> Self {
        self.sift.contrast_threshold = threshold;
        self
    }

    pub fn edge_threshold(mut self, threshold: f32) -> Self {
        self.sift.edge_threshold = threshold;
        self
    }

    pub fn sigma(mut self, sigma: f32) -> Self {
        self.sift.sigma = sigma;
        self
    }

    /// Enable or disable min-max normalization
    pub fn normalize(mut self, enable: bool) -> Self {
        self.preprocess.normalize = enable;
        self
    }

    /// Enable or disable histogram equalization
    pub fn equalize(mut self, enable: bool) -> Self {
        self.preprocess.equalize = enable;
        self
    }

    /// Bilateral filter diameter and sigmas. A diameter of 0 disables it.
    pub fn bilateral(mut self, diameter: u32, sigma_color: f32, sigma_space: f32) -> Self {
        self.preprocess.bilateral_diameter = diameter;
        self.preprocess.bilateral_sigma_color = sigma_color;
        self.preprocess.bilateral_sigma_space = sigma_space;
        self
    }

    /// Enable or disable the sharpening pass
    pub fn sharpen(mut self, enable: bool) -> Self {
        self.preprocess.sharpen = enable;
        self
    }

    /// Skip all enhancement stages
    pub fn without_preprocessing(mut self) -> Self {
        self.preprocess = PreprocessConfig::disabled();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Create builder from existing configuration
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self {
            preprocess: config.preprocess,
            sift: config.sift,
            name: config.name,
        }
    }

    pub fn to_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            preprocess: self.preprocess.clone(),
            sift: self.sift.clone(),
            name: self.name.clone(),
        }
    }

    /// Generate summary of current configuration
    pub fn summary(&self) -> String {
        format!("ExtractorBuilder: {}", self.to_config().summary())
    }

    /// Validate and build the extractor
    pub fn build(self) -> DetectResult<FeatureExtractor<SiftDetector>> {
        let config = self.to_config();
        config.validate()?;
        let detector = SiftDetector::new(config.sift.clone())?;
        Ok(FeatureExtractor::new(detector, config.preprocess))
    }
}
