use image::{GrayImage, Luma};
use imageproc::point::Point;
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::{HashMap, HashSet};

use crate::detection::color::{BACKGROUND, FOREGROUND};
use crate::models::Region;

/// Set every background pixel that cannot reach the image border.
///
/// Background is 4-connected, the dual of 8-connected foreground, so a hole
/// is exactly what an 8-connected outer boundary encloses.
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] == 0 {
            FOREGROUND
        } else {
            BACKGROUND
        }
    });
    let labeled = connected_components(&inverted, Connectivity::Four, Luma([0]));

    let mut outside: HashSet<u32> = HashSet::new();
    for x in 0..width {
        outside.insert(labeled.get_pixel(x, 0)[0]);
        outside.insert(labeled.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        outside.insert(labeled.get_pixel(0, y)[0]);
        outside.insert(labeled.get_pixel(width - 1, y)[0]);
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labeled.get_pixel(x, y)[0];
        if label == 0 || !outside.contains(&label) {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

/// Find the outer boundary of every 8-connected foreground blob.
///
/// Blobs lying inside another blob's hole are part of the enclosing region.
/// Regions are returned in raster order of their first boundary pixel.
pub fn find_regions(mask: &GrayImage) -> Vec<Region> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let filled = fill_holes(mask);
    let labeled = connected_components(&filled, Connectivity::Eight, Luma([0]));

    let mut stats: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue;
        }

        stats
            .entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    // The tracer never starts an outer border in column 0, so trace inside a
    // one-pixel background frame and shift the points back out of it.
    let mut framed = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut framed, &filled, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let points: Vec<Point<i32>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            let start = points.first()?;
            let label = labeled.get_pixel(start.x as u32, start.y as u32)[0];
            let &(min_x, min_y, max_x, max_y, pixel_count) = stats.get(&label)?;
            Some(Region {
                points,
                pixel_count,
                min_x,
                min_y,
                max_x,
                max_y,
            })
        })
        .collect()
}
