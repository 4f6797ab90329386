use crate::config::SiftConfig;
use crate::error::DetectResult;
use fpsift_core::{DescriptorMatrix, Keypoint};
use image::GrayImage;
use opencv::core::{no_array, KeyPoint, Mat, Ptr, Vector};
use opencv::features2d::SIFT;
use opencv::prelude::*;
use tracing::debug;

/// Anything that turns a grayscale image into keypoints with aligned descriptors.
///
/// Row `i` of the returned matrix describes keypoint `i`. An image with no
/// detectable structure yields two empty collections, not an error.
pub trait FeatureDetector: Send + Sync {
    fn detect_and_compute(&self, img: &GrayImage) -> DetectResult<(Vec<Keypoint>, DescriptorMatrix)>;
}

/// Images below this side length have no complete octave and yield nothing.
const MIN_IMAGE_SIDE: u32 = 2;

/// OpenCV SIFT: scale-space extrema with 128-dimensional gradient descriptors.
///
/// A fresh `cv::SIFT` instance is created per call, so the detector can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct SiftDetector {
    cfg: SiftConfig,
}

impl SiftDetector {
    /// Creates a new detector with validation
    pub fn new(cfg: SiftConfig) -> DetectResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SiftConfig {
        &self.cfg
    }

    fn create(&self) -> DetectResult<Ptr<SIFT>> {
        let sift = SIFT::create(
            i32::try_from(self.cfg.max_features).unwrap_or(i32::MAX),
            i32::try_from(self.cfg.n_octave_layers).unwrap_or(i32::MAX),
            f64::from(self.cfg.contrast_threshold),
            f64::from(self.cfg.edge_threshold),
            f64::from(self.cfg.sigma),
            false,
        )?;
        Ok(sift)
    }

    /// Keypoints only, in input-image coordinates.
    pub fn detect(&self, img: &GrayImage) -> DetectResult<Vec<Keypoint>> {
        if img.width().min(img.height()) < MIN_IMAGE_SIDE {
            return Ok(Vec::new());
        }
        let mat = gray_to_mat(img)?;
        let mut cv_keypoints = Vector::<KeyPoint>::new();
        self.create()?.detect(&mat, &mut cv_keypoints, &no_array())?;
        Ok(cv_keypoints.iter().map(|kp| keypoint_from_cv(&kp)).collect())
    }
}

impl FeatureDetector for SiftDetector {
    fn detect_and_compute(&self, img: &GrayImage) -> DetectResult<(Vec<Keypoint>, DescriptorMatrix)> {
        if img.width().min(img.height()) < MIN_IMAGE_SIDE {
            debug!(width = img.width(), height = img.height(), "image too small for sift");
            return Ok((Vec::new(), DescriptorMatrix::empty()));
        }
        let mat = gray_to_mat(img)?;
        let mut cv_keypoints = Vector::<KeyPoint>::new();
        let mut cv_descriptors = Mat::default();
        self.create()?.detect_and_compute(
            &mat,
            &no_array(),
            &mut cv_keypoints,
            &mut cv_descriptors,
            false,
        )?;

        let keypoints: Vec<Keypoint> = cv_keypoints.iter().map(|kp| keypoint_from_cv(&kp)).collect();
        let descriptors = descriptors_from_mat(&cv_descriptors)?;
        let found = keypoints.len();
        let (keypoints, descriptors) = retain_strongest(keypoints, descriptors, self.cfg.max_features)?;
        debug!(found, kept = keypoints.len(), "sift keypoints");
        Ok((keypoints, descriptors))
    }
}

/// Cap the result at `max_features` rows, strongest response first.
///
/// OpenCV keeps every keypoint tied with the weakest survivor; this drops
/// them so the cap is exact. `0` keeps everything.
pub fn retain_strongest(
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
    max_features: usize,
) -> DetectResult<(Vec<Keypoint>, DescriptorMatrix)> {
    if max_features == 0 || keypoints.len() <= max_features {
        return Ok((keypoints, descriptors));
    }
    let mut order: Vec<usize> = (0..keypoints.len()).collect();
    order.sort_by(|&a, &b| keypoints[b].response.total_cmp(&keypoints[a].response));
    order.truncate(max_features);

    let kept_keypoints = order.iter().map(|&i| keypoints[i]).collect();
    let mut data = Vec::with_capacity(max_features * descriptors.dim());
    for &i in &order {
        data.extend_from_slice(descriptors.row(i));
    }
    let kept_descriptors = DescriptorMatrix::from_flat(descriptors.dim(), data)?;
    Ok((kept_keypoints, kept_descriptors))
}

/// Copy an 8-bit grayscale image into a single-channel `CV_8U` matrix.
pub fn gray_to_mat(img: &GrayImage) -> DetectResult<Mat> {
    let rows: Vec<&[u8]> = img.as_raw().chunks(img.width() as usize).collect();
    Ok(Mat::from_slice_2d(&rows)?)
}

pub fn keypoint_from_cv(kp: &KeyPoint) -> Keypoint {
    let pt = kp.pt();
    Keypoint {
        pt: [pt.x, pt.y],
        size: kp.size(),
        angle: kp.angle(),
        response: kp.response(),
        octave: kp.octave(),
        class_id: kp.class_id(),
    }
}

/// Read a `CV_32F` descriptor matrix row by row. An empty matrix maps to an
/// empty [`DescriptorMatrix`].
pub fn descriptors_from_mat(mat: &Mat) -> DetectResult<DescriptorMatrix> {
    if mat.rows() == 0 {
        return Ok(DescriptorMatrix::empty());
    }
    let cols = mat.cols() as usize;
    let data = mat.data_typed::<f32>()?.to_vec();
    Ok(DescriptorMatrix::from_flat(cols, data)?)
}
