use image::RgbImage;
use imageproc::point::Point;

use crate::config::AreaMeasure;

/// One connected foreground blob of a cleaned mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Outer boundary, in tracing order. Consecutive points are 8-neighbours
    /// and the last point connects back to the first.
    pub points: Vec<Point<i32>>,
    /// Pixels enclosed by the outer boundary, holes included.
    pub pixel_count: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Shoelace area of the boundary polygon through pixel centres.
    ///
    /// Smaller than [`Region::pixel_count`] by roughly half the perimeter, and
    /// zero for blobs one pixel thick.
    pub fn polygon_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    pub fn area(&self, measure: AreaMeasure) -> f64 {
        match measure {
            AreaMeasure::Pixels => self.pixel_count as f64,
            AreaMeasure::Polygon => self.polygon_area(),
        }
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.min_x + self.max_x) / 2, (self.min_y + self.max_y) / 2)
    }
}

/// Everything one counting run produces.
#[derive(Debug, Clone)]
pub struct CountOutcome {
    /// Cleaned binary mask (0 or 255).
    pub mask: image::GrayImage,
    /// Copy of the source with accepted regions outlined.
    pub annotated: RgbImage,
    /// Regions whose area passed the threshold, in scan order.
    pub plants: Vec<Region>,
    /// Every region found, accepted or not.
    pub candidates: usize,
}

impl CountOutcome {
    pub fn plant_count(&self) -> usize {
        self.plants.len()
    }
}
