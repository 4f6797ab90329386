use crate::cv::knn_with;
use crate::error::MatchResult;
use crate::matcher::ApproximateMatcher;
use fpsift_core::{DescriptorMatch, DescriptorMatrix};
use opencv::core::NORM_L2;
use opencv::features2d::BFMatcher;

/// Exhaustive L2 matcher (`cv::BFMatcher`). Exact, quadratic in the number
/// of descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ApproximateMatcher for BruteForceMatcher {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> MatchResult<Vec<Vec<DescriptorMatch>>> {
        let matcher = BFMatcher::new(NORM_L2, false)?;
        knn_with(&matcher, query, train, k)
    }
}
