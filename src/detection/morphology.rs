use image::GrayImage;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

use crate::config::StructuringElement;
use crate::detection::color::FOREGROUND;
use crate::error::Result;

/// Rectangular mask of the kernel's size, anchored at `(width / 2, height / 2)`.
///
/// Pixels under the mask that fall outside the image are skipped, so the
/// image border neither erodes nor seeds dilation.
fn kernel_mask(kernel: &StructuringElement) -> Result<Mask> {
    kernel.validate()?;
    let (ax, ay) = kernel.anchor();
    let footprint = GrayImage::from_pixel(kernel.width, kernel.height, FOREGROUND);
    Ok(Mask::from_image(&footprint, ax as u8, ay as u8))
}

/// Shrink foreground regions: a pixel survives only if every kernel neighbour is set.
pub fn erode(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> Result<GrayImage> {
    let element = kernel_mask(kernel)?;
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = grayscale_erode(&current, &element);
    }
    Ok(current)
}

/// Grow foreground regions: a pixel is set if any kernel neighbour is set.
pub fn dilate(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> Result<GrayImage> {
    let element = kernel_mask(kernel)?;
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = grayscale_dilate(&current, &element);
    }
    Ok(current)
}

/// Erode, then dilate. Extra dilation passes restore blob size after the
/// erosion has removed isolated specks.
pub fn clean(
    mask: &GrayImage,
    kernel: &StructuringElement,
    erode_iterations: u32,
    dilate_iterations: u32,
) -> Result<GrayImage> {
    let eroded = erode(mask, kernel, erode_iterations)?;
    dilate(&eroded, kernel, dilate_iterations)
}

pub fn foreground_area(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}
