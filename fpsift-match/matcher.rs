use crate::brute_force::BruteForceMatcher;
use crate::config::{MatcherBackend, MatcherConfig};
use crate::error::{MatchError, MatchResult};
use crate::flann::FlannMatcher;
use fpsift_core::{DescriptorMatch, DescriptorMatrix, Template};
use tracing::{debug, info_span};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// k-nearest-neighbour search of query rows against train rows.
///
/// Returns one list per query row, closest first, at most `k` long.
/// Lists are shorter than `k` only when `train` has fewer than `k` rows.
pub trait ApproximateMatcher: Send + Sync {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> MatchResult<Vec<Vec<DescriptorMatch>>>;
}

/// Backend chosen at runtime from a [`MatcherConfig`].
#[derive(Debug, Clone, Copy)]
pub enum ConfiguredMatcher {
    KdForest(FlannMatcher),
    BruteForce(BruteForceMatcher),
}

impl ConfiguredMatcher {
    pub fn from_config(cfg: &MatcherConfig) -> Self {
        match cfg.backend {
            MatcherBackend::KdForest => {
                Self::KdForest(FlannMatcher::new(cfg.trees, cfg.checks, cfg.seed))
            }
            MatcherBackend::BruteForce => Self::BruteForce(BruteForceMatcher::new()),
        }
    }
}

impl ApproximateMatcher for ConfiguredMatcher {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> MatchResult<Vec<Vec<DescriptorMatch>>> {
        match self {
            Self::KdForest(m) => m.knn_match(query, train, k),
            Self::BruteForce(m) => m.knn_match(query, train, k),
        }
    }
}

/// Lowe's ratio test: keep the best candidate of each list when a second
/// candidate exists and `d1 < ratio * d2`.
pub fn ratio_test(knn: &[Vec<DescriptorMatch>], ratio: f32) -> Vec<DescriptorMatch> {
    knn.iter()
        .filter_map(|candidates| match candidates.as_slice() {
            [best, second, ..] if best.distance < ratio * second.distance => Some(*best),
            _ => None,
        })
        .collect()
}

/// Outcome of comparing two templates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonResult {
    /// `good_matches / min(features_template1, features_template2)`, or 0.0
    /// when either template is empty. Not clamped to 1.0.
    pub similarity: f64,
    pub good_matches: usize,
    /// Query descriptors tried, one per descriptor of the first template.
    pub total_matches: usize,
    pub features_template1: usize,
    pub features_template2: usize,
}

/// Ratio-test matching and similarity scoring over any [`ApproximateMatcher`].
#[derive(Debug, Clone)]
pub struct TemplateMatcher<M: ApproximateMatcher> {
    matcher: M,
    ratio: f32,
}

impl TemplateMatcher<ConfiguredMatcher> {
    /// Validate `cfg` and build the matcher it describes.
    pub fn from_config(cfg: &MatcherConfig) -> MatchResult<Self> {
        cfg.validate()?;
        Ok(Self::new(ConfiguredMatcher::from_config(cfg), cfg.ratio))
    }
}

impl<M: ApproximateMatcher> TemplateMatcher<M> {
    pub fn new(matcher: M, ratio: f32) -> Self {
        Self { matcher, ratio }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn compare(&self, a: &Template, b: &Template) -> MatchResult<ComparisonResult> {
        self.compare_descriptors(a.descriptors(), b.descriptors())
    }

    /// Score two descriptor sets. `a` is the query side.
    pub fn compare_descriptors(
        &self,
        a: &DescriptorMatrix,
        b: &DescriptorMatrix,
    ) -> MatchResult<ComparisonResult> {
        let span = info_span!("compare", features_a = a.len(), features_b = b.len());
        let _guard = span.enter();

        let (n1, n2) = (a.len(), b.len());
        let min_features = n1.min(n2);
        if min_features == 0 {
            debug!("empty template, similarity is zero");
            return Ok(ComparisonResult {
                similarity: 0.0,
                good_matches: 0,
                total_matches: n1,
                features_template1: n1,
                features_template2: n2,
            });
        }
        if a.dim() != b.dim() {
            return Err(MatchError::DimensionMismatch {
                left: a.dim(),
                right: b.dim(),
            });
        }

        let knn = self.matcher.knn_match(a, b, 2)?;
        let good = ratio_test(&knn, self.ratio);
        let similarity = good.len() as f64 / min_features as f64;
        debug!(good = good.len(), total = knn.len(), similarity, "compared templates");

        Ok(ComparisonResult {
            similarity,
            good_matches: good.len(),
            total_matches: knn.len(),
            features_template1: n1,
            features_template2: n2,
        })
    }
}
