use card_state::RecognitionOutcome;
use image::{GrayImage, RgbImage};
use tracing::{debug, warn};

use crate::color::{self, HsvRange};
use crate::debug::DebugSink;

/// Fill color of the boost bar.
const GREEN: HsvRange = HsvRange::new([35, 40, 40], [85, 255, 255]);

/// Gaps up to this many pixels inside the fill are treated as separator lines.
const MAX_GAP: usize = 5;

/// Possible gauge readings, each selected once the fill ratio reaches its threshold.
const STEPS: [(f64, u32); 7] = [
    (0.05, 0),
    (0.25, 20),
    (0.45, 40),
    (0.55, 50),
    (0.65, 60),
    (0.85, 80),
    (0.95, 100),
];

/// Intermediate measurements of one gauge read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeReading {
    /// Mean right edge of the fill over the sampled rows.
    pub fill_end: f64,
    pub ratio: f64,
    pub percent: u32,
}

/// Read the boost gauge. Always authoritative on success; `"0"` with zero
/// confidence when the crop cannot be analyzed.
pub fn analyze(image: &RgbImage, debug: Option<&DebugSink>) -> RecognitionOutcome {
    match measure(image) {
        Some(reading) => {
            debug!(
                "Gauge: fill end {:.1} of {}, ratio {:.2}, {}%",
                reading.fill_end,
                image.width(),
                reading.ratio,
                reading.percent
            );
            if let Some(sink) = debug {
                sink.save_rgb(
                    "gauge_analysis",
                    &crate::debug::gauge_visualization(image.width(), reading.fill_end),
                );
            }
            RecognitionOutcome::new(reading.percent.to_string(), 1.0)
        }
        None => {
            warn!(
                "Gauge analysis failed on a {}x{} crop",
                image.width(),
                image.height()
            );
            RecognitionOutcome::new("0", 0.0)
        }
    }
}

/// Measure the fill of a gauge crop; `None` for an empty crop.
pub fn measure(image: &RgbImage) -> Option<GaugeReading> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let mask = color::close_2x2(&color::in_range(&color::to_hsv(image), &GREEN));
    let rows = [h / 4, h / 2, h * 3 / 4];
    let ends: Vec<usize> = rows.iter().map(|&y| row_fill_end(&mask, y)).collect();
    let fill_end = ends.iter().sum::<usize>() as f64 / ends.len() as f64;

    let ratio = (fill_end + 1.0) / w as f64;
    Some(GaugeReading {
        fill_end,
        ratio,
        percent: quantize(ratio),
    })
}

/// Largest step whose threshold the ratio reaches; 0 below the first.
pub fn quantize(ratio: f64) -> u32 {
    STEPS
        .iter()
        .filter(|(threshold, _)| ratio >= *threshold)
        .last()
        .map_or(0, |&(_, step)| step)
}

/// Right edge of the first green run in row `y`, bridging short gaps.
fn row_fill_end(mask: &GrayImage, y: u32) -> usize {
    let row: Vec<bool> = (0..mask.width()).map(|x| mask.get_pixel(x, y)[0] > 0).collect();
    let width = row.len();
    let mut end = 0;
    for x in 0..width {
        if row[x] {
            end = x;
            continue;
        }
        if x + MAX_GAP < width && row[x..x + MAX_GAP].iter().any(|&on| on) {
            continue;
        }
        if end > 0 {
            break;
        }
    }
    end
}
