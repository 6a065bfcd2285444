//! Image cleanup applied before handing a scan to Tesseract.
use image::{DynamicImage, GrayImage};
use imageproc::filter::median_filter;
use serde::{Deserialize, Serialize};

/// Filters applied in order: grayscale, contrast, denoise, threshold, sharpen.
///
/// Contrast and threshold imply grayscale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocess {
    pub grayscale: bool,
    /// Contrast factor around the mean gray level; `1.0` leaves the image as is.
    pub contrast: Option<f32>,
    /// 3x3 median filter.
    pub denoise: bool,
    /// Pixels brighter than this become white, the rest black.
    pub threshold: Option<u8>,
    pub sharpen: bool,
}

impl Preprocess {
    /// Just a grayscale conversion.
    pub fn minimal() -> Self {
        Self {
            grayscale: true,
            ..Default::default()
        }
    }

    /// Contrast boost, median denoise, then a global threshold.
    pub fn high_contrast(threshold: u8, contrast: f32) -> Self {
        Self {
            grayscale: true,
            contrast: Some(contrast),
            denoise: true,
            threshold: Some(threshold),
            sharpen: false,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.grayscale
            && self.contrast.is_none()
            && !self.denoise
            && self.threshold.is_none()
            && !self.sharpen
    }

    /// Short label used when reporting which variant won.
    pub fn label(&self) -> String {
        if self.is_identity() {
            return "original".to_string();
        }
        let mut parts = Vec::new();
        if self.grayscale {
            parts.push("gray".to_string());
        }
        if let Some(c) = self.contrast {
            parts.push(format!("contrast{}", c));
        }
        if self.denoise {
            parts.push("median".to_string());
        }
        if let Some(t) = self.threshold {
            parts.push(format!("thresh{}", t));
        }
        if self.sharpen {
            parts.push("sharpen".to_string());
        }
        parts.join("+")
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        if self.is_identity() {
            return image;
        }
        if !self.grayscale && self.contrast.is_none() && self.threshold.is_none() && !self.denoise {
            return image.filter3x3(&SHARPEN_KERNEL);
        }

        let mut gray = image.to_luma8();
        if let Some(factor) = self.contrast {
            gray = enhance_contrast(&gray, factor);
        }
        if self.denoise {
            gray = median_filter(&gray, 1, 1);
        }
        if let Some(threshold) = self.threshold {
            binarize(&mut gray, threshold);
        }
        let out = DynamicImage::ImageLuma8(gray);
        if self.sharpen {
            out.filter3x3(&SHARPEN_KERNEL)
        } else {
            out
        }
    }
}

const SHARPEN_KERNEL: [f32; 9] = [
    -2.0 / 16.0, -2.0 / 16.0, -2.0 / 16.0,
    -2.0 / 16.0, 32.0 / 16.0, -2.0 / 16.0,
    -2.0 / 16.0, -2.0 / 16.0, -2.0 / 16.0,
];

fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let count = (image.width() as u64 * image.height() as u64).max(1);
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    let mean = (sum as f32 / count as f32).round();

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let value = mean + factor * (pixel[0] as f32 - mean);
        pixel[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    output
}

fn binarize(image: &mut GrayImage, threshold: u8) {
    for pixel in image.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
}
