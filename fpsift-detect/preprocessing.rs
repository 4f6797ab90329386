use crate::config::PreprocessConfig;
use crate::utils::{reflect_101, saturate_u8};
use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use tracing::debug;

/// 3x3 high-pass emphasis: centre 9, neighbours -1.
const SHARPEN_KERNEL: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Fingerprint enhancement stages run before feature detection.
///
/// Stages run in a fixed order, each on the previous stage's output:
/// min-max normalization, histogram equalization, bilateral smoothing and
/// sharpening. Dimensions are preserved.
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Collapse any colour layout to 8-bit luma.
    pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
        match img {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => other.to_luma8(),
        }
    }

    /// Full pipeline on an image of any colour layout.
    pub fn preprocess_dynamic(img: &DynamicImage, cfg: &PreprocessConfig) -> GrayImage {
        Self::preprocess(&Self::to_grayscale(img), cfg)
    }

    /// Full pipeline on an 8-bit grayscale image.
    pub fn preprocess(img: &GrayImage, cfg: &PreprocessConfig) -> GrayImage {
        let mut out = img.clone();
        if cfg.normalize {
            out = Self::normalize_min_max(&out);
        }
        if cfg.equalize {
            out = Self::equalize_histogram(&out);
        }
        if cfg.bilateral_diameter > 0 {
            out = Self::bilateral_filter(
                &out,
                cfg.bilateral_diameter,
                cfg.bilateral_sigma_color,
                cfg.bilateral_sigma_space,
            );
        }
        if cfg.sharpen {
            out = Self::sharpen(&out);
        }
        debug!(
            width = out.width(),
            height = out.height(),
            "preprocessed image"
        );
        out
    }

    /// Stretch intensities linearly onto [0, 255]. A constant image maps to 0.
    pub fn normalize_min_max(img: &GrayImage) -> GrayImage {
        let raw = img.as_raw();
        let (min, max) = raw
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if raw.is_empty() || min == max {
            return GrayImage::new(img.width(), img.height());
        }
        let scale = 255.0 / (max - min) as f32;
        let data = raw
            .iter()
            .map(|&v| saturate_u8((v - min) as f32 * scale))
            .collect();
        GrayImage::from_raw(img.width(), img.height(), data)
            .unwrap_or_else(|| GrayImage::new(img.width(), img.height()))
    }

    /// Global histogram equalization for contrast enhancement.
    ///
    /// The darkest occupied level maps to 0 and the brightest to 255:
    /// `lut[v] = (cdf[v] - cdf_min) * 255 / (total - cdf_min)`. A single-level
    /// image is returned unchanged.
    pub fn equalize_histogram(img: &GrayImage) -> GrayImage {
        let hist = &imageproc::stats::histogram(img).channels[0];
        let total: u64 = hist.iter().map(|&c| u64::from(c)).sum();
        let Some(first) = hist.iter().position(|&c| c > 0) else {
            return img.clone();
        };
        let cdf_min = u64::from(hist[first]);
        if cdf_min == total {
            return img.clone();
        }

        let scale = 255.0 / (total - cdf_min) as f32;
        let mut lut = [0u8; 256];
        let mut cdf = 0u64;
        for (level, &count) in hist.iter().enumerate().skip(first + 1) {
            cdf += u64::from(count);
            lut[level] = saturate_u8(cdf as f32 * scale);
        }

        let mut out = img.clone();
        for p in out.iter_mut() {
            *p = lut[*p as usize];
        }
        out
    }

    /// Edge-preserving smoothing over a circular window of `diameter`.
    pub fn bilateral_filter(
        img: &GrayImage,
        diameter: u32,
        sigma_color: f32,
        sigma_space: f32,
    ) -> GrayImage {
        let (w, h) = (img.width() as usize, img.height() as usize);
        if w == 0 || h == 0 {
            return img.clone();
        }
        let sigma_color = if sigma_color <= 0.0 { 1.0 } else { sigma_color };
        let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
        let radius = (diameter / 2).max(1) as isize;

        let color_coeff = -0.5 / (sigma_color * sigma_color);
        let space_coeff = -0.5 / (sigma_space * sigma_space);
        let color_weight: Vec<f32> = (0..256)
            .map(|i| ((i * i) as f32 * color_coeff).exp())
            .collect();

        let mut window: Vec<(isize, isize, f32)> = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let r = ((dy * dy + dx * dx) as f32).sqrt();
                if r > radius as f32 {
                    continue;
                }
                window.push((dy, dx, (r * r * space_coeff).exp()));
            }
        }

        let src = img.as_raw();
        let mut out = vec![0u8; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate() {
                let center = src[y * w + x] as i32;
                let mut sum = 0.0f32;
                let mut wsum = 0.0f32;
                for &(dy, dx, space_w) in &window {
                    let yy = reflect_101(y as isize + dy, h);
                    let xx = reflect_101(x as isize + dx, w);
                    let v = src[yy * w + xx] as i32;
                    let weight = space_w * color_weight[(v - center).unsigned_abs() as usize];
                    sum += v as f32 * weight;
                    wsum += weight;
                }
                *dst = saturate_u8(sum / wsum);
            }
        });

        GrayImage::from_raw(img.width(), img.height(), out).unwrap_or_else(|| img.clone())
    }

    /// 3x3 sharpening convolution, saturated to 8 bits.
    pub fn sharpen(img: &GrayImage) -> GrayImage {
        let (w, h) = (img.width() as usize, img.height() as usize);
        if w == 0 || h == 0 {
            return img.clone();
        }
        let src = img.as_raw();
        let mut out = vec![0u8; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate() {
                let mut acc = 0i32;
                for (ky, kernel_row) in SHARPEN_KERNEL.iter().enumerate() {
                    let yy = reflect_101(y as isize + ky as isize - 1, h);
                    for (kx, &k) in kernel_row.iter().enumerate() {
                        let xx = reflect_101(x as isize + kx as isize - 1, w);
                        acc += k * src[yy * w + xx] as i32;
                    }
                }
                *dst = acc.clamp(0, 255) as u8;
            }
        });
        GrayImage::from_raw(img.width(), img.height(), out).unwrap_or_else(|| img.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};
    use proptest::prelude::*;

    fn gradient_image(width: u32, height: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1) as f32;
            Luma([(lo as f32 + t * (hi - lo) as f32).round() as u8])
        })
    }

    #[test]
    fn test_normalize_stretches_range() {
        let img = gradient_image(32, 4, 100, 150);
        let out = ImagePreprocessing::normalize_min_max(&img);
        let min = *out.as_raw().iter().min().unwrap();
        let max = *out.as_raw().iter().max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn test_normalize_constant_image() {
        let img = GrayImage::from_pixel(8, 8, Luma([77]));
        let out = ImagePreprocessing::normalize_min_max(&img);
        assert!(out.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_equalize_spans_full_range() {
        // half black, half white
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([if x < 8 { 0 } else { 255 }]));
        let out = ImagePreprocessing::equalize_histogram(&img);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(15, 0)[0], 255);

        let stretched = ImagePreprocessing::equalize_histogram(&ImagePreprocessing::normalize_min_max(
            &gradient_image(32, 4, 60, 180),
        ));
        assert_eq!(*stretched.as_raw().iter().min().unwrap(), 0);
        assert_eq!(*stretched.as_raw().iter().max().unwrap(), 255);
    }

    #[test]
    fn test_equalize_known_lut() {
        // levels 10, 20, 30 with counts 2, 1, 1: cdf_min = 2, total = 4
        let img = GrayImage::from_raw(4, 1, vec![10, 10, 20, 30]).unwrap();
        let out = ImagePreprocessing::equalize_histogram(&img);
        assert_eq!(out.as_raw(), &vec![0, 0, 128, 255]);
    }

    #[test]
    fn test_equalize_constant_image_unchanged() {
        let img = GrayImage::from_pixel(6, 6, Luma([42]));
        assert_eq!(ImagePreprocessing::equalize_histogram(&img), img);
    }

    #[test]
    fn test_pipeline_runs_stages_in_order() {
        let img = GrayImage::from_fn(24, 20, |x, y| Luma([(40 + (x * 7 + y * 3) % 120) as u8]));
        let cfg = PreprocessConfig::default();
        let expected = ImagePreprocessing::sharpen(&ImagePreprocessing::bilateral_filter(
            &ImagePreprocessing::equalize_histogram(&ImagePreprocessing::normalize_min_max(&img)),
            cfg.bilateral_diameter,
            cfg.bilateral_sigma_color,
            cfg.bilateral_sigma_space,
        ));
        assert_eq!(ImagePreprocessing::preprocess(&img, &cfg), expected);
    }

    #[test]
    fn test_bilateral_preserves_flat_regions() {
        let img = GrayImage::from_pixel(16, 16, Luma([90]));
        let out = ImagePreprocessing::bilateral_filter(&img, 9, 75.0, 75.0);
        assert!(out.as_raw().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_bilateral_keeps_strong_edge() {
        // step edge much larger than sigma_color survives smoothing
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let out = ImagePreprocessing::bilateral_filter(&img, 9, 20.0, 75.0);
        assert!(out.get_pixel(8, 10)[0] < 10);
        assert!(out.get_pixel(11, 10)[0] > 245);
    }

    #[test]
    fn test_sharpen_identity_on_flat() {
        // kernel sums to 1, so flat regions are unchanged
        let img = GrayImage::from_pixel(10, 10, Luma([120]));
        let out = ImagePreprocessing::sharpen(&img);
        assert!(out.as_raw().iter().all(|&v| v == 120));
    }

    #[test]
    fn test_sharpen_saturates() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([10]));
        img.put_pixel(4, 4, Luma([200]));
        let out = ImagePreprocessing::sharpen(&img);
        assert_eq!(out.get_pixel(4, 4)[0], 255);
        assert_eq!(out.get_pixel(3, 4)[0], 0);
    }

    #[test]
    fn test_pipeline_preserves_dimensions() {
        let img = gradient_image(37, 23, 20, 220);
        let out = ImagePreprocessing::preprocess(&img, &PreprocessConfig::default());
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn test_disabled_pipeline_is_identity() {
        let img = gradient_image(16, 16, 20, 220);
        let out = ImagePreprocessing::preprocess(&img, &PreprocessConfig::disabled());
        assert_eq!(out, img);
    }

    #[test]
    fn test_colour_input_is_converted() {
        let rgb = RgbImage::from_pixel(12, 7, image::Rgb([200, 10, 10]));
        let gray = ImagePreprocessing::to_grayscale(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.dimensions(), (12, 7));
        let out = ImagePreprocessing::preprocess_dynamic(
            &DynamicImage::ImageLuma8(gray.clone()),
            &PreprocessConfig::disabled(),
        );
        assert_eq!(out, gray);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_pipeline_keeps_shape(w in 1u32..24, h in 1u32..24, seed in 0u32..1000) {
            let img = GrayImage::from_fn(w, h, |x, y| Luma([((x * 37 + y * 91 + seed) % 256) as u8]));
            let out = ImagePreprocessing::preprocess(&img, &PreprocessConfig::default());
            prop_assert_eq!(out.dimensions(), (w, h));
        }
    }
}
