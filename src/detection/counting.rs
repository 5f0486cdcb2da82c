use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, BresenhamLineIter};
use imageproc::rect::Rect;

use crate::config::{AreaMeasure, OutlineStyle};
use crate::models::Region;

/// Keep regions strictly larger than `threshold` under `measure`.
pub fn filter_plants(regions: &[Region], threshold: u32, measure: AreaMeasure) -> Vec<Region> {
    regions
        .iter()
        .filter(|r| r.area(measure) > threshold as f64)
        .cloned()
        .collect()
}

/// Fill a `width`-pixel square around `(x, y)`, clipped to the canvas.
fn stamp(canvas: &mut RgbImage, x: i32, y: i32, style: &OutlineStyle) {
    let back = (style.width / 2) as i32;
    draw_filled_rect_mut(
        canvas,
        Rect::at(x - back, y - back).of_size(style.width, style.width),
        Rgb(style.color),
    );
}

/// Trace the closed outline of `region` with the configured stroke.
fn draw_outline_mut(canvas: &mut RgbImage, region: &Region, style: &OutlineStyle) {
    let n = region.points.len();
    if n == 1 {
        let p = region.points[0];
        stamp(canvas, p.x, p.y, style);
        return;
    }
    for i in 0..n {
        let p = region.points[i];
        let q = region.points[(i + 1) % n];
        for (x, y) in BresenhamLineIter::new((p.x as f32, p.y as f32), (q.x as f32, q.y as f32)) {
            stamp(canvas, x, y, style);
        }
    }
}

/// Copy of `source` with every region outlined.
pub fn annotate(source: &RgbImage, regions: &[Region], style: &OutlineStyle) -> RgbImage {
    let mut canvas = source.clone();
    for region in regions {
        draw_outline_mut(&mut canvas, region, style);
    }
    canvas
}
