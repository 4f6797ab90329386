use crate::error::{CliError, CliResult};
use fpsift_detect::ExtractorConfig;
use fpsift_match::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run needs: extraction, matching and the worker count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub matcher: MatcherConfig,
    /// Size of the global rayon pool.
    pub threads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            matcher: MatcherConfig::default(),
            threads: fpsift_core::default_threads(),
        }
    }
}

impl AppConfig {
    /// Load from a `.toml` file, or JSON for any other extension.
    pub fn load<P: AsRef<Path>>(path: P) -> CliResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(json: &str) -> CliResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> CliResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn validate(&self) -> CliResult<()> {
        self.extractor
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        self.matcher
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        if self.threads == 0 {
            return Err(CliError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{}; {}; threads={}",
            self.extractor.summary(),
            self.matcher.summary(),
            self.threads
        )
    }
}
