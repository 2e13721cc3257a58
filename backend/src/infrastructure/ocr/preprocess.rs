/// Image preprocessing that makes handwriting easier to recognize
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;

use super::backend::{OcrError, OcrResult, ProcessingMethod};

/// Images smaller than this on either side are upscaled
pub const MIN_SIDE: u32 = 300;

/// Largest upscale factor; thin strips stay thin instead of growing without bound
pub const MAX_SCALE: f64 = 16.0;

/// Pixel budget for any image entering the enhancement chain
pub const MAX_PIXELS: u64 = 40_000_000;

const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Sigma matching a 5x5 Gaussian kernel
const BLUR_SIGMA: f32 = 1.1;

pub fn decode(bytes: &[u8]) -> OcrResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|_| OcrError::Decode)
}

/// Target size for [`upscale`]; sizes truncate like integer pixel counts
pub fn scaled_dimensions(width: u32, height: u32) -> OcrResult<(u32, u32)> {
    let too_large = || OcrError::TooLarge { width, height };
    if width == 0 || height == 0 || u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(too_large());
    }
    if width >= MIN_SIDE && height >= MIN_SIDE {
        return Ok((width, height));
    }

    let scale = (f64::from(MIN_SIDE) / f64::from(height))
        .max(f64::from(MIN_SIDE) / f64::from(width))
        .min(MAX_SCALE);
    let new_width = ((f64::from(width) * scale) as u32).max(1);
    let new_height = ((f64::from(height) * scale) as u32).max(1);
    if u64::from(new_width) * u64::from(new_height) > MAX_PIXELS {
        return Err(too_large());
    }
    Ok((new_width, new_height))
}

/// Upscale so both sides reach [`MIN_SIDE`] when either is smaller
pub fn upscale(image: DynamicImage) -> OcrResult<DynamicImage> {
    let (width, height) = scaled_dimensions(image.width(), image.height())?;
    if (width, height) == (image.width(), image.height()) {
        return Ok(image);
    }
    Ok(image.resize_exact(width, height, FilterType::CatmullRom))
}

/// Full enhancement chain: upscale, sharpen, grayscale, blur, binarize
pub fn enhance(image: DynamicImage) -> OcrResult<GrayImage> {
    let sharpened = upscale(image)?.filter3x3(&SHARPEN_KERNEL);
    let gray = sharpened.to_luma8();
    let blurred = imageops::blur(&gray, BLUR_SIGMA);
    Ok(binarize(&blurred))
}

/// Decode an upload and turn it into the PNG handed to the recognizer.
/// CPU bound; async callers run it on the blocking pool.
pub fn prepare(bytes: &[u8], enhanced: bool) -> OcrResult<(Vec<u8>, ProcessingMethod)> {
    let decoded = decode(bytes)?;
    if enhanced {
        let binary = DynamicImage::ImageLuma8(enhance(decoded)?);
        Ok((encode_png(&binary)?, ProcessingMethod::EnhancedPreprocessing))
    } else {
        let (width, height) = (decoded.width(), decoded.height());
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(OcrError::TooLarge { width, height });
        }
        Ok((encode_png(&decoded)?, ProcessingMethod::DirectExtraction))
    }
}

/// Otsu threshold of a grayscale image
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_background = 0u64;
    let mut sum_background = 0f64;
    let mut best_variance = -1f64;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += level as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_all - sum_background) / weight_foreground as f64;
        let between = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between > best_variance {
            best_variance = between;
            best_level = level as u8;
        }
    }

    best_level
}

/// Pixels above the Otsu threshold become white, the rest black
pub fn binarize(image: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(image);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = Luma([if pixel[0] > threshold { 255 } else { 0 }]);
    }
    out
}

/// PNG bytes of an image, as fed to the recognizer
pub fn encode_png(image: &DynamicImage) -> OcrResult<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| OcrError::Engine(format!("Failed to encode image: {}", e)))?;
    Ok(buffer)
}
