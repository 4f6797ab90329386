use crate::error::{DetectError, DetectResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale-invariant detector parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SiftConfig {
    /// Keep at most this many keypoints, strongest response first. 0 keeps all.
    pub max_features: usize,
    /// DoG layers sampled per octave.
    pub n_octave_layers: usize,
    /// Minimum local contrast; weaker extrema are discarded.
    pub contrast_threshold: f32,
    /// Principal curvature ratio above which an extremum is treated as an edge.
    pub edge_threshold: f32,
    /// Gaussian sigma of the base scale.
    pub sigma: f32,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            n_octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
        }
    }
}

impl SiftConfig {
    pub fn validate(&self) -> DetectResult<()> {
        if self.n_octave_layers == 0 {
            return Err(DetectError::InvalidConfig(
                "n_octave_layers must be at least 1".to_string(),
            ));
        }
        if !(self.contrast_threshold >= 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "contrast_threshold must be non-negative, got {}",
                self.contrast_threshold
            )));
        }
        if !(self.edge_threshold > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "edge_threshold must be positive, got {}",
                self.edge_threshold
            )));
        }
        if !(self.sigma > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Fingerprint enhancement applied before detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PreprocessConfig {
    pub normalize: bool,
    pub equalize: bool,
    /// Bilateral neighbourhood diameter; 0 disables the filter.
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub sharpen: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            equalize: true,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            sharpen: true,
        }
    }
}

impl PreprocessConfig {
    /// Every stage switched off; the image passes through untouched.
    pub fn disabled() -> Self {
        Self {
            normalize: false,
            equalize: false,
            bilateral_diameter: 0,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            sharpen: false,
        }
    }

    pub fn validate(&self) -> DetectResult<()> {
        if self.bilateral_diameter > 0
            && !(self.bilateral_sigma_color > 0.0 && self.bilateral_sigma_space > 0.0)
        {
            return Err(DetectError::InvalidConfig(
                "bilateral sigmas must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete extraction configuration
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractorConfig {
    pub preprocess: PreprocessConfig,
    pub sift: SiftConfig,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector only, no enhancement. Useful for already clean scans.
    pub fn raw_preset() -> Self {
        Self {
            preprocess: PreprocessConfig::disabled(),
            sift: SiftConfig::default(),
            name: Some("Raw".to_string()),
        }
    }

    /// Denser keypoint set for high resolution scans.
    pub fn dense_preset() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            sift: SiftConfig {
                max_features: 2000,
                contrast_threshold: 0.03,
                ..SiftConfig::default()
            },
            name: Some("Dense".to_string()),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn to_builder(self) -> crate::builder::ExtractorBuilder {
        crate::builder::ExtractorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "ExtractorConfig: max_features={}, layers={}, contrast={}, edge={}, sigma={}, preprocess=[normalize:{}, equalize:{}, bilateral:{}, sharpen:{}]",
            self.sift.max_features,
            self.sift.n_octave_layers,
            self.sift.contrast_threshold,
            self.sift.edge_threshold,
            self.sift.sigma,
            self.preprocess.normalize,
            self.preprocess.equalize,
            self.preprocess.bilateral_diameter,
            self.preprocess.sharpen
        )
    }

    pub fn validate(&self) -> DetectResult<()> {
        self.preprocess.validate()?;
        self.sift.validate()
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
