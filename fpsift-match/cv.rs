//! Glue between descriptor matrices and OpenCV's `DescriptorMatcher` API.

use crate::error::MatchResult;
use fpsift_core::{DescriptorMatch, DescriptorMatrix};
use opencv::core::{no_array, DMatch, Mat, Vector};
use opencv::features2d::DescriptorMatcherTraitConst;

/// Copy descriptors into a `rows x dim` `CV_32F` matrix.
pub fn descriptors_to_mat(descriptors: &DescriptorMatrix) -> MatchResult<Mat> {
    let rows: Vec<&[f32]> = descriptors.rows().collect();
    Ok(Mat::from_slice_2d(&rows)?)
}

pub fn match_from_cv(m: &DMatch) -> DescriptorMatch {
    DescriptorMatch {
        query_idx: m.query_idx as usize,
        train_idx: m.train_idx as usize,
        distance: m.distance,
    }
}

/// k-nearest-neighbour query through any OpenCV descriptor matcher.
///
/// `k` is capped at the train size. The result always holds one list per
/// query row; unmatched slots reported by OpenCV (negative train index) are
/// dropped.
pub fn knn_with<M: DescriptorMatcherTraitConst>(
    matcher: &M,
    query: &DescriptorMatrix,
    train: &DescriptorMatrix,
    k: usize,
) -> MatchResult<Vec<Vec<DescriptorMatch>>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let k = k.min(train.len());
    if k == 0 {
        return Ok(vec![Vec::new(); query.len()]);
    }

    let query_mat = descriptors_to_mat(query)?;
    let train_mat = descriptors_to_mat(train)?;
    let mut cv_matches = Vector::<Vector<DMatch>>::new();
    matcher.knn_match(
        &query_mat,
        &train_mat,
        &mut cv_matches,
        k as i32,
        &no_array(),
        false,
    )?;

    let mut knn: Vec<Vec<DescriptorMatch>> = cv_matches
        .iter()
        .map(|candidates| {
            candidates
                .iter()
                .filter(|m| m.train_idx >= 0 && m.query_idx >= 0)
                .map(|m| match_from_cv(&m))
                .collect()
        })
        .collect();
    knn.resize(query.len(), Vec::new());
    Ok(knn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::prelude::*;

    #[test]
    fn test_descriptors_to_mat_shape() {
        let d = DescriptorMatrix::from_rows(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let mat = descriptors_to_mat(&d).unwrap();
        assert_eq!((mat.rows(), mat.cols()), (2, 3));
        assert_eq!(mat.data_typed::<f32>().unwrap(), d.as_flat());
    }

    #[test]
    fn test_match_from_cv() {
        let m = DMatch {
            query_idx: 3,
            train_idx: 7,
            img_idx: 0,
            distance: 2.5,
        };
        let converted = match_from_cv(&m);
        assert_eq!((converted.query_idx, converted.train_idx), (3, 7));
        assert_eq!(converted.distance, 2.5);
    }
}
