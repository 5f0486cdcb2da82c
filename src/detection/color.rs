//! Color-space thresholding.
//!
//! Source rasters are `RgbImage` with channels in R, G, B order. The `image`
//! crate decodes every supported format into that order, so nothing in this
//! crate ever sees BGR data; feeding swapped channels would move foliage hues
//! from ~120° to ~0° and empty the mask.

use image::{GrayImage, Luma, RgbImage};

use crate::config::{ColorRange, HueScale};
use crate::error::{PlantError, Result};

pub const FOREGROUND: Luma<u8> = Luma([255]);
pub const BACKGROUND: Luma<u8> = Luma([0]);

/// Convert one RGB pixel to 8-bit HSV with the hue on the given scale.
pub fn rgb_to_hsv(rgb: [u8; 3], scale: HueScale) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let hue = match scale {
        HueScale::Half => (h / 2.0).round() as u32 % 180,
        HueScale::Full => (h * 256.0 / 360.0).round() as u32 % 256,
    };

    [hue as u8, s.round() as u8, v as u8]
}

/// Binary mask of the pixels whose HSV triple falls inside `range`.
pub fn color_mask(img: &RgbImage, range: &ColorRange) -> Result<GrayImage> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PlantError::InvalidInput(format!(
            "image has zero dimension ({width}x{height})"
        )));
    }

    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels() {
        if range.contains(rgb_to_hsv(pixel.0, range.hue_scale)) {
            mask.put_pixel(x, y, FOREGROUND);
        }
    }
    Ok(mask)
}

/// BT.601 luma in 14-bit fixed point (0.299 R + 0.587 G + 0.114 B), rounded.
pub fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8
}

/// Clear mask pixels whose source luma is at or below `floor`.
pub fn suppress_dark(mask: &GrayImage, source: &RgbImage, floor: u8) -> Result<GrayImage> {
    if mask.dimensions() != source.dimensions() {
        return Err(PlantError::InvalidInput(format!(
            "mask is {:?} but source is {:?}",
            mask.dimensions(),
            source.dimensions()
        )));
    }

    let mut out = mask.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if pixel[0] != 0 && luma(source.get_pixel(x, y).0) <= floor {
            *pixel = BACKGROUND;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelBounds;
    use image::Rgb;

    #[test]
    fn primary_hues_on_half_scale() {
        assert_eq!(rgb_to_hsv([255, 0, 0], HueScale::Half), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0], HueScale::Half), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255], HueScale::Half), [120, 255, 255]);
    }

    #[test]
    fn full_scale_stretches_hue() {
        assert_eq!(rgb_to_hsv([0, 255, 0], HueScale::Full)[0], 85);
        assert_eq!(rgb_to_hsv([0, 0, 255], HueScale::Full)[0], 171);
    }

    #[test]
    fn grays_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0], HueScale::Half), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128], HueScale::Half), [0, 0, 128]);
    }

    #[test]
    fn hue_just_below_red_wraps_into_range() {
        // 359 degrees would round to 180 on the half scale.
        let [h, _, _] = rgb_to_hsv([255, 0, 4], HueScale::Half);
        assert!(h < 180);
    }

    #[test]
    fn all_green_image_is_all_foreground() {
        let img = RgbImage::from_pixel(16, 9, Rgb([40, 220, 60]));
        let mask = color_mask(&img, &ColorRange::default()).unwrap();
        assert_eq!(mask.dimensions(), (16, 9));
        assert!(mask.pixels().all(|p| *p == FOREGROUND));
    }

    #[test]
    fn out_of_range_image_is_all_background() {
        for color in [[200, 30, 30], [30, 30, 200], [60, 120, 60], [255, 255, 255]] {
            let img = RgbImage::from_pixel(8, 8, Rgb(color));
            let mask = color_mask(&img, &ColorRange::default()).unwrap();
            assert!(mask.pixels().all(|p| *p == BACKGROUND), "{color:?}");
        }
    }

    #[test]
    fn bounds_are_closed_intervals() {
        let range = ColorRange {
            hue: ChannelBounds::new(60, 60),
            saturation: ChannelBounds::new(255, 255),
            value: ChannelBounds::new(255, 255),
            hue_scale: HueScale::Half,
        };
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]));
        let mask = color_mask(&img, &range).unwrap();
        assert!(mask.pixels().all(|p| *p == FOREGROUND));
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let img = RgbImage::new(0, 10);
        assert!(matches!(
            color_mask(&img, &ColorRange::default()),
            Err(PlantError::InvalidInput(_))
        ));
    }

    #[test]
    fn dark_pixels_are_gated() {
        let mut source = RgbImage::from_pixel(2, 1, Rgb([0, 255, 0]));
        source.put_pixel(1, 0, Rgb([0, 4, 0]));
        let mask = GrayImage::from_pixel(2, 1, FOREGROUND);
        let gated = suppress_dark(&mask, &source, 5).unwrap();
        assert_eq!(*gated.get_pixel(0, 0), FOREGROUND);
        assert_eq!(*gated.get_pixel(1, 0), BACKGROUND);
    }

    #[test]
    fn luma_uses_bt601_weights() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn dark_blue_sits_on_the_floor() {
        // 0.114 * 40 rounds to 5, 0.114 * 50 to 6
        let mut source = RgbImage::from_pixel(2, 1, Rgb([0, 0, 40]));
        source.put_pixel(1, 0, Rgb([0, 0, 50]));
        let mask = GrayImage::from_pixel(2, 1, FOREGROUND);
        let gated = suppress_dark(&mask, &source, 5).unwrap();
        assert_eq!(*gated.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*gated.get_pixel(1, 0), FOREGROUND);
    }

    #[test]
    fn gate_rejects_mismatched_sizes() {
        let source = RgbImage::new(3, 3);
        let mask = GrayImage::new(2, 3);
        assert!(matches!(
            suppress_dark(&mask, &source, 5),
            Err(PlantError::InvalidInput(_))
        ));
    }
}
