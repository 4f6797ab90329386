use crate::cv::knn_with;
use crate::error::MatchResult;
use crate::matcher::ApproximateMatcher;
use fpsift_core::{DescriptorMatch, DescriptorMatrix};
use opencv::core::{set_rng_seed, Ptr};
use opencv::features2d::FlannBasedMatcher;
use opencv::flann::{IndexParams, KDTreeIndexParams, SearchParams};

/// Approximate matcher over a FLANN randomized k-d forest.
///
/// A fresh index is built over the train descriptors on every call. The
/// OpenCV RNG is reseeded first, so identical inputs give identical trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlannMatcher {
    trees: usize,
    checks: usize,
    seed: u64,
}

impl Default for FlannMatcher {
    fn default() -> Self {
        Self::new(5, 50, 0)
    }
}

impl FlannMatcher {
    pub fn new(trees: usize, checks: usize, seed: u64) -> Self {
        Self {
            trees: trees.max(1),
            checks: checks.max(1),
            seed,
        }
    }

    pub fn trees(&self) -> usize {
        self.trees
    }

    pub fn checks(&self) -> usize {
        self.checks
    }

    fn create(&self) -> MatchResult<FlannBasedMatcher> {
        let index = KDTreeIndexParams::new(clamp_i32(self.trees))?;
        let index_params = Ptr::new(IndexParams::from(index));
        let search_params = Ptr::new(SearchParams::new(clamp_i32(self.checks), 0.0, true, false)?);
        Ok(FlannBasedMatcher::new(&index_params, &search_params)?)
    }
}

fn clamp_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl ApproximateMatcher for FlannMatcher {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> MatchResult<Vec<Vec<DescriptorMatch>>> {
        set_rng_seed((self.seed % i32::MAX as u64) as i32)?;
        let matcher = self.create()?;
        knn_with(&matcher, query, train, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scattered(rows: usize, cols: usize) -> DescriptorMatrix {
        let data = (0..rows * cols)
            .map(|i| ((i * 7919 + 13) % 251) as f32)
            .collect();
        DescriptorMatrix::from_flat(cols, data).unwrap()
    }

    #[test]
    fn test_parameters_are_clamped() {
        let m = FlannMatcher::new(0, 0, 3);
        assert_eq!((m.trees(), m.checks()), (1, 1));
        assert_eq!(FlannMatcher::default().trees(), 5);
        assert_eq!(FlannMatcher::default().checks(), 50);
    }

    #[test]
    fn test_finds_exact_copies() {
        let data = scattered(200, 32);
        let knn = FlannMatcher::default().knn_match(&data, &data, 2).unwrap();
        assert_eq!(knn.len(), 200);
        let hits = knn
            .iter()
            .enumerate()
            .filter(|(i, c)| c.first().is_some_and(|m| m.train_idx == *i && m.distance < 1e-3))
            .count();
        assert!(hits >= 190, "only {} exact hits", hits);
    }

    #[test]
    fn test_fewer_rows_than_k() {
        let train = scattered(1, 8);
        let query = scattered(3, 8);
        let knn = FlannMatcher::default().knn_match(&query, &train, 2).unwrap();
        assert_eq!(knn.len(), 3);
        assert!(knn.iter().all(|c| c.len() <= 1));
    }

    #[test]
    fn test_reproducible_with_seed() {
        let train = scattered(150, 16);
        let query = scattered(40, 16);
        let m = FlannMatcher::new(5, 50, 11);
        let a = m.knn_match(&query, &train, 2).unwrap();
        let b = m.knn_match(&query, &train, 2).unwrap();
        assert_eq!(a, b);
    }
}
