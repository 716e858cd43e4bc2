use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{GrayImage, RgbImage};
use std::path::Path;
use tracing::{debug, info, warn};

/// Side length templates and inputs are resized to.
const MATCH_SIZE: u32 = 48;

/// Scales correlation scores before the softmax; higher is more decisive.
const SHARPNESS: f64 = 20.0;

/// A field crop resized to a classifier's input size, channels scaled to [0, 1].
#[derive(Debug, Clone)]
pub struct ClassifierInput {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB samples.
    pub pixels: Vec<[f32; 3]>,
}

impl ClassifierInput {
    pub fn from_image(image: &RgbImage, width: u32, height: u32) -> Self {
        let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
        let pixels = resized
            .pixels()
            .map(|p| {
                [
                    p[0] as f32 / 255.0,
                    p[1] as f32 / 255.0,
                    p[2] as f32 / 255.0,
                ]
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    fn luma(&self) -> Vec<f64> {
        self.pixels
            .iter()
            .map(|[r, g, b]| 0.299 * *r as f64 + 0.587 * *g as f64 + 0.114 * *b as f64)
            .collect()
    }
}

/// A trained per-field model: one probability per class.
pub trait Classifier: Send + Sync {
    /// (width, height) inputs must be resized to.
    fn input_size(&self) -> (u32, u32);

    fn predict(&self, input: &ClassifierInput) -> Result<Vec<f32>>;
}

/// Grayscale template with pre-computed stats for NCC.
struct Template {
    pixels: Vec<f64>,
    mean: f64,
    std_dev: f64,
}

impl Template {
    fn new(pixels: Vec<f64>) -> Self {
        let (mean, std_dev) = compute_stats(&pixels);
        Self {
            pixels,
            mean,
            std_dev,
        }
    }
}

/// Classifies by correlating the input against reference crops of each class.
///
/// Loaded from a directory of `<class_index>.png` or `<class_index>_<any>.png`
/// files; a class may have several references and the best one counts.
pub struct TemplateClassifier {
    classes: Vec<Vec<Template>>,
}

impl TemplateClassifier {
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read model directory {}", dir.display()))?;

        let mut classes: Vec<Vec<Template>> = Vec::new();
        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(index) = class_index(&path) else {
                debug!("Skipping {}", path.display());
                continue;
            };
            match load_template(&path) {
                Ok(tmpl) => {
                    if classes.len() <= index {
                        classes.resize_with(index + 1, Vec::new);
                    }
                    classes[index].push(tmpl);
                    count += 1;
                }
                Err(e) => warn!("Failed to load template {}: {:#}", path.display(), e),
            }
        }

        if count == 0 {
            bail!("No templates in {}", dir.display());
        }
        info!(
            "Loaded {} template(s) for {} class(es) from {}",
            count,
            classes.len(),
            dir.display()
        );
        Ok(Self { classes })
    }

    /// Build from in-memory references, indexed by class.
    pub fn from_images(classes: &[Vec<GrayImage>]) -> Self {
        let classes = classes
            .iter()
            .map(|refs| {
                refs.iter()
                    .map(|img| Template::new(normalized(img)))
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { classes }
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl Classifier for TemplateClassifier {
    fn input_size(&self) -> (u32, u32) {
        (MATCH_SIZE, MATCH_SIZE)
    }

    fn predict(&self, input: &ClassifierInput) -> Result<Vec<f32>> {
        if (input.width, input.height) != self.input_size() {
            bail!(
                "Expected a {}x{} input, got {}x{}",
                MATCH_SIZE,
                MATCH_SIZE,
                input.width,
                input.height
            );
        }
        let luma = input.luma();
        let (mean, std_dev) = compute_stats(&luma);

        let scores: Vec<f64> = self
            .classes
            .iter()
            .map(|refs| {
                refs.iter()
                    .map(|t| normalized_cross_correlation(&luma, mean, std_dev, t))
                    .fold(-1.0, f64::max)
            })
            .collect();
        Ok(softmax(&scores))
    }
}

/// Leading integer of the file stem, for `.png` files only.
fn class_index(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.split('_').next()?.parse().ok()
}

fn load_template(path: &Path) -> Result<Template> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Template::new(normalized(&img.to_luma8())))
}

/// Resize to the match size and scale to [0, 1].
fn normalized(gray: &GrayImage) -> Vec<f64> {
    image::imageops::resize(gray, MATCH_SIZE, MATCH_SIZE, FilterType::Triangle)
        .pixels()
        .map(|p| p[0] as f64 / 255.0)
        .collect()
}

fn compute_stats(pixels: &[f64]) -> (f64, f64) {
    let n = pixels.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = pixels.iter().sum::<f64>() / n;
    let variance = pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Zero-mean normalized cross-correlation in [-1, 1]; 0 when either side is flat.
fn normalized_cross_correlation(img: &[f64], img_mean: f64, img_std: f64, tmpl: &Template) -> f64 {
    let denom = img_std * tmpl.std_dev;
    if denom < 1e-10 || img.len() != tmpl.pixels.len() {
        return 0.0;
    }
    let cross: f64 = img
        .iter()
        .zip(&tmpl.pixels)
        .map(|(i, t)| (i - img_mean) * (t - tmpl.mean))
        .sum();
    cross / (img.len() as f64 * denom)
}

fn softmax(scores: &[f64]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| ((s - max) * SHARPNESS).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| (e / total) as f32).collect()
}
