use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;

/// Inclusive HSV bounds on the 8-bit scale (H in 0-179, S and V in 0-255).
#[derive(Debug, Clone, Copy)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Convert RGB to HSV with hue halved into 0-179.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    // Hue is circular: 180 wraps to 0
    let h = ((h / 2.0).round() as u16 % 180) as u8;

    let s = if max == 0.0 { 0.0 } else { delta / max };
    let s = (s * 255.0).round() as u8;
    let v = (max * 255.0).round() as u8;

    [h, s, v]
}

/// Per-pixel HSV conversion; the channels of the result hold H, S, V.
pub fn to_hsv(image: &RgbImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgb(rgb_to_hsv(p[0], p[1], p[2]))
    })
}

/// Binary mask (0/255) of pixels inside `range`.
pub fn in_range(hsv: &RgbImage, range: &HsvRange) -> GrayImage {
    GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        let p = hsv.get_pixel(x, y);
        if range.contains(p.0) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Pixel-wise OR of masks with identical dimensions.
pub fn union(masks: &[GrayImage]) -> Option<GrayImage> {
    let first = masks.first()?;
    let mut out = first.clone();
    for mask in &masks[1..] {
        for (o, m) in out.pixels_mut().zip(mask.pixels()) {
            o[0] = o[0].max(m[0]);
        }
    }
    Some(out)
}

/// Closing with a square structuring element of side `2 * radius + 1`.
pub fn close_square(mask: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::close(mask, Norm::LInf, radius)
}

/// Opening with a square structuring element of side `2 * radius + 1`.
pub fn open_square(mask: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::open(mask, Norm::LInf, radius)
}

/// Closing with a 2x2 structuring element anchored at its bottom-right cell.
///
/// Even-sized elements have no centre, so this is done directly instead of
/// through the distance-transform morphology.
pub fn close_2x2(mask: &GrayImage) -> GrayImage {
    let dilated = window_2x2(mask, u8::max);
    window_2x2(&dilated, u8::min)
}

fn window_2x2(mask: &GrayImage, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = mask.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = mask.get_pixel(x, y)[0];
        for (dx, dy) in [(1u32, 0u32), (0, 1), (1, 1)] {
            if x >= dx && y >= dy {
                acc = pick(acc, mask.get_pixel(x - dx, y - dy)[0]);
            }
        }
        Luma([acc])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(200, 200, 200), [0, 0, 200]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_in_range_mask() {
        let img = RgbImage::from_fn(4, 1, |x, _| {
            if x < 2 {
                Rgb([0, 200, 0])
            } else {
                Rgb([200, 0, 0])
            }
        });
        let green = HsvRange::new([35, 40, 40], [85, 255, 255]);
        let mask = in_range(&to_hsv(&img), &green);
        let row: Vec<u8> = mask.pixels().map(|p| p[0]).collect();
        assert_eq!(row, vec![255, 255, 0, 0]);
    }

    #[test]
    fn test_union_of_masks() {
        let a = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let b = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 1 { 255 } else { 0 }]));
        let u = union(&[a, b]).unwrap();
        assert!(u.pixels().all(|p| p[0] == 255));
        assert!(union(&[]).is_none());
    }

    #[test]
    fn test_close_2x2_fills_single_pixel_gap() {
        let mask = GrayImage::from_fn(7, 3, |x, _| Luma([if x == 3 { 0 } else { 255 }]));
        let closed = close_2x2(&mask);
        assert_eq!(closed.get_pixel(3, 1)[0], 255);
    }

    #[test]
    fn test_open_removes_speckle() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([255]));
        let opened = open_square(&mask, 2);
        assert!(opened.pixels().all(|p| p[0] == 0));
    }
}
