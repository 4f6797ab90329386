use crate::config::PreprocessConfig;
use crate::detector::FeatureDetector;
use crate::error::{DetectError, DetectResult};
use crate::preprocessing::ImagePreprocessing;
use fpsift_core::Template;
use image::DynamicImage;
use tracing::{debug, info_span};

/// Encoded image bytes in, feature template out.
///
/// Decodes any format the `image` crate understands, converts to grayscale,
/// runs the enhancement pipeline and hands the result to the detector.
pub struct FeatureExtractor<D: FeatureDetector> {
    detector: D,
    preprocess: PreprocessConfig,
}

impl<D: FeatureDetector> FeatureExtractor<D> {
    pub fn new(detector: D, preprocess: PreprocessConfig) -> Self {
        Self {
            detector,
            preprocess,
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn preprocess_config(&self) -> &PreprocessConfig {
        &self.preprocess
    }

    /// Decode `bytes` and extract a template.
    pub fn extract(&self, bytes: &[u8]) -> DetectResult<Template> {
        let img = image::load_from_memory(bytes).map_err(|e| DetectError::Decode(e.to_string()))?;
        self.extract_image(&img)
    }

    /// Extract a template from an already decoded image.
    ///
    /// Fails with [`DetectError::NoFeatures`] when nothing is detected.
    pub fn extract_image(&self, img: &DynamicImage) -> DetectResult<Template> {
        let span = info_span!("extract", width = img.width(), height = img.height());
        let _guard = span.enter();

        let gray = ImagePreprocessing::preprocess_dynamic(img, &self.preprocess);
        let (keypoints, descriptors) = self.detector.detect_and_compute(&gray)?;
        if keypoints.is_empty() {
            debug!("no keypoints");
            return Err(DetectError::NoFeatures);
        }
        let template = Template::new(keypoints, descriptors)?;
        debug!(features = template.num_features(), "extracted template");
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpsift_core::{DescriptorMatrix, Keypoint};
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Emits `count` keypoints regardless of the image.
    struct FixedDetector {
        count: usize,
    }

    impl FeatureDetector for FixedDetector {
        fn detect_and_compute(
            &self,
            img: &GrayImage,
        ) -> DetectResult<(Vec<Keypoint>, DescriptorMatrix)> {
            let kps: Vec<Keypoint> = (0..self.count)
                .map(|i| Keypoint::new(i as f32, img.height() as f32 / 2.0, 3.0))
                .collect();
            let rows: Vec<Vec<f32>> = (0..self.count).map(|i| vec![i as f32; 4]).collect();
            let desc = if rows.is_empty() {
                DescriptorMatrix::empty()
            } else {
                DescriptorMatrix::from_rows(&rows)?
            };
            Ok((kps, desc))
        }
    }

    /// Keeps a copy of the last image it was given.
    #[derive(Default)]
    struct RecordingDetector {
        seen: Mutex<Option<GrayImage>>,
    }

    impl FeatureDetector for RecordingDetector {
        fn detect_and_compute(
            &self,
            img: &GrayImage,
        ) -> DetectResult<(Vec<Keypoint>, DescriptorMatrix)> {
            *self.seen.lock().unwrap() = Some(img.clone());
            let desc = DescriptorMatrix::from_rows(&[vec![1.0f32; 4]])?;
            Ok((vec![Keypoint::new(1.0, 1.0, 3.0)], desc))
        }
    }

    fn png_bytes(img: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_extract_decodes_and_builds_template() {
        let ex = FeatureExtractor::new(FixedDetector { count: 3 }, PreprocessConfig::default());
        let bytes = png_bytes(&GrayImage::from_pixel(10, 8, Luma([40])));
        let template = ex.extract(&bytes).unwrap();
        assert_eq!(template.num_features(), 3);
        assert_eq!(template.keypoints()[0].y(), 4.0);
        assert_eq!(template.descriptors().dim(), 4);
    }

    #[test]
    fn test_extract_rejects_garbage_bytes() {
        let ex = FeatureExtractor::new(FixedDetector { count: 1 }, PreprocessConfig::default());
        let err = ex.extract(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DetectError::Decode(_)));
    }

    #[test]
    fn test_extract_reports_no_features() {
        let ex = FeatureExtractor::new(FixedDetector { count: 0 }, PreprocessConfig::disabled());
        let bytes = png_bytes(&GrayImage::from_pixel(10, 10, Luma([0])));
        assert_eq!(ex.extract(&bytes).unwrap_err(), DetectError::NoFeatures);
    }

    #[test]
    fn test_colour_images_are_accepted() {
        let ex = FeatureExtractor::new(FixedDetector { count: 2 }, PreprocessConfig::default());
        let rgb = image::RgbImage::from_pixel(6, 6, image::Rgb([10, 200, 30]));
        let mut buf = Cursor::new(Vec::new());
        rgb.write_to(&mut buf, ImageFormat::Png).unwrap();
        assert_eq!(ex.extract(buf.get_ref()).unwrap().num_features(), 2);
    }

    #[test]
    fn test_detector_sees_preprocessed_pixels() {
        let raw = GrayImage::from_fn(20, 16, |x, y| Luma([(60 + (x * 5 + y * 2) % 90) as u8]));
        let cfg = PreprocessConfig::default();
        let ex = FeatureExtractor::new(RecordingDetector::default(), cfg.clone());
        ex.extract(&png_bytes(&raw)).unwrap();

        let seen = ex.detector().seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, ImagePreprocessing::preprocess(&raw, &cfg));
        assert_ne!(seen, raw);
    }
}
