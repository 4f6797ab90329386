use crate::error::{MatchError, MatchResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nearest-neighbour search strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatcherBackend {
    /// FLANN randomized k-d forest, approximate.
    #[default]
    KdForest,
    /// OpenCV brute-force L2 scan, exact.
    BruteForce,
}

/// Descriptor matching parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatcherConfig {
    /// Lowe ratio: a match is good when `d1 < ratio * d2`.
    pub ratio: f32,
    /// Number of randomized trees in the forest.
    pub trees: usize,
    /// Leaf checks per query before the search may stop.
    pub checks: usize,
    /// Seed for the OpenCV RNG used while building the forest.
    pub seed: u64,
    pub backend: MatcherBackend,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.7,
            trees: 5,
            checks: 50,
            seed: 0,
            backend: MatcherBackend::KdForest,
        }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact matching, for small templates or reference scores.
    pub fn exact() -> Self {
        Self {
            backend: MatcherBackend::BruteForce,
            ..Self::default()
        }
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> MatchResult<()> {
        if !(self.ratio > 0.0 && self.ratio.is_finite()) {
            return Err(MatchError::InvalidConfig(format!(
                "ratio must be positive and finite, got {}",
                self.ratio
            )));
        }
        if self.trees == 0 {
            return Err(MatchError::InvalidConfig(
                "trees must be at least 1".to_string(),
            ));
        }
        if self.checks == 0 {
            return Err(MatchError::InvalidConfig(
                "checks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "MatcherConfig: backend={:?}, ratio={}, trees={}, checks={}, seed={}",
            self.backend, self.ratio, self.trees, self.checks, self.seed
        )
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
}
