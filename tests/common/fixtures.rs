use image::{Rgb, RgbImage};
use std::path::PathBuf;
use tempfile::TempDir;

/// Bare soil: hue well outside the default green range.
pub const SOIL: Rgb<u8> = Rgb([120, 80, 50]);
/// Bright foliage inside the default HSV range.
pub const LEAF: Rgb<u8> = Rgb([40, 200, 60]);
/// Default outline color.
pub const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);

/// Axis-aligned leaf patch: (x, y, width, height).
pub type Blob = (u32, u32, u32, u32);

/// Creates a soil-colored image with the given leaf patches painted on.
pub fn field_image(width: u32, height: u32, blobs: &[Blob]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, SOIL);
    for &(x0, y0, w, h) in blobs {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, LEAF);
            }
        }
    }
    img
}

/// Saves `img` as a PNG named `name` in a fresh temp directory.
/// Returns the directory (keep alive) and the file path.
pub fn save_temp_image(img: &RgbImage, name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    (dir, path)
}

/// Three well separated 40x25 patches (area 1000 each) on a 160x110 field.
pub fn three_plant_field() -> RgbImage {
    field_image(160, 110, &[(10, 10, 40, 25), (90, 10, 40, 25), (10, 70, 40, 25)])
}

/// One 10x10 patch (area 100) on a 80x80 field.
pub fn seedling_field() -> RgbImage {
    field_image(80, 80, &[(30, 30, 10, 10)])
}
