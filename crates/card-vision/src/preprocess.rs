use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// One alternate rendering of a field crop handed to OCR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variant {
    Original,
    Grayscale,
    /// Global binary threshold at the Otsu level
    Otsu,
    /// Light blur, then a local Gaussian-weighted threshold
    AdaptiveGaussian,
    /// 3x3 median
    Median,
    Equalize,
    /// 2x bicubic upscale of the color crop
    Upscale2x,
    /// Channel gain with saturation
    Contrast(f32),
    /// Edge map with the given hysteresis thresholds
    Canny(f32, f32),
}

/// Sigma matching a 5x5 kernel with automatic sigma.
const PRE_BLUR_SIGMA: f32 = 1.1;
/// Sigma of the 11x11 neighbourhood for the adaptive threshold.
const BLOCK_SIGMA: f32 = 2.0;
/// Subtracted from the local mean before comparing.
const ADAPTIVE_C: f32 = 2.0;

impl Variant {
    pub fn render(&self, crop: &RgbImage) -> DynamicImage {
        match *self {
            Variant::Original => DynamicImage::ImageRgb8(crop.clone()),
            Variant::Grayscale => DynamicImage::ImageLuma8(imageops::grayscale(crop)),
            Variant::Otsu => DynamicImage::ImageLuma8(otsu(&imageops::grayscale(crop))),
            Variant::AdaptiveGaussian => {
                DynamicImage::ImageLuma8(adaptive_gaussian(&imageops::grayscale(crop)))
            }
            Variant::Median => {
                DynamicImage::ImageLuma8(median_filter(&imageops::grayscale(crop), 1, 1))
            }
            Variant::Equalize => {
                DynamicImage::ImageLuma8(equalize_histogram(&imageops::grayscale(crop)))
            }
            Variant::Upscale2x => DynamicImage::ImageRgb8(imageops::resize(
                crop,
                crop.width() * 2,
                crop.height() * 2,
                FilterType::CatmullRom,
            )),
            Variant::Contrast(gain) => DynamicImage::ImageRgb8(scale_channels(crop, gain)),
            Variant::Canny(low, high) => {
                DynamicImage::ImageLuma8(canny(&imageops::grayscale(crop), low, high))
            }
        }
    }
}

/// Pixels strictly above the Otsu level become white.
fn otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn adaptive_gaussian(gray: &GrayImage) -> GrayImage {
    let smoothed = gaussian_blur_f32(gray, PRE_BLUR_SIGMA);
    let local = gaussian_blur_f32(&smoothed, BLOCK_SIGMA);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = smoothed.get_pixel(x, y)[0] as f32;
        let mean = local.get_pixel(x, y)[0] as f32;
        if v > mean - ADAPTIVE_C {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn scale_channels(crop: &RgbImage, gain: f32) -> RgbImage {
    let scale = |c: u8| (c as f32 * gain).round().min(255.0) as u8;
    RgbImage::from_fn(crop.width(), crop.height(), |x, y| {
        let p = crop.get_pixel(x, y);
        Rgb([scale(p[0]), scale(p[1]), scale(p[2])])
    })
}
