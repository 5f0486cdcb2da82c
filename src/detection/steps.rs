use crate::config::{ColorRange, StructuringElement};
use crate::detection::{color, morphology};
use crate::error::Result;
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use image::DynamicImage;
use tracing::debug;

/// Threshold the source image in HSV space
pub struct ColorMaskStep {
    pub range: ColorRange,
}

impl PipelineStep for ColorMaskStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let mask = color::color_mask(&data.original, &self.range)?;
        debug!(
            foreground = morphology::foreground_area(&mask),
            "color mask built"
        );
        Ok(data.with_image(DynamicImage::ImageLuma8(mask)))
    }

    fn name(&self) -> &str {
        "Color Mask"
    }
}

/// Drop mask pixels that are near-black in the source
pub struct DarkPixelStep {
    pub floor: u8,
}

impl PipelineStep for DarkPixelStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let mask = data.image.to_luma8();
        let gated = color::suppress_dark(&mask, &data.original, self.floor)?;
        Ok(data.with_image(DynamicImage::ImageLuma8(gated)))
    }

    fn name(&self) -> &str {
        "Dark Pixel Gate"
    }
}

/// Erode the mask
pub struct ErodeStep {
    pub kernel: StructuringElement,
    pub iterations: u32,
}

impl PipelineStep for ErodeStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let mask = data.image.to_luma8();
        let eroded = morphology::erode(&mask, &self.kernel, self.iterations)?;
        debug!(
            kernel = %self.kernel,
            iterations = self.iterations,
            foreground = morphology::foreground_area(&eroded),
            "eroded"
        );
        Ok(data.with_image(DynamicImage::ImageLuma8(eroded)))
    }

    fn name(&self) -> &str {
        "Erode"
    }
}

/// Dilate the mask
pub struct DilateStep {
    pub kernel: StructuringElement,
    pub iterations: u32,
}

impl PipelineStep for DilateStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let mask = data.image.to_luma8();
        let dilated = morphology::dilate(&mask, &self.kernel, self.iterations)?;
        debug!(
            kernel = %self.kernel,
            iterations = self.iterations,
            foreground = morphology::foreground_area(&dilated),
            "dilated"
        );
        Ok(data.with_image(DynamicImage::ImageLuma8(dilated)))
    }

    fn name(&self) -> &str {
        "Dilate"
    }
}
