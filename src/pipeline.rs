use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{PlantError, Result};

/// Data that flows through the pipeline
#[derive(Clone)]
pub struct PipelineData {
    /// The current raster: the source color image on entry, a mask after the first step
    pub image: DynamicImage,

    /// The untouched source image (shared via Arc)
    pub original: Arc<RgbImage>,
}

impl PipelineData {
    /// Create PipelineData for a source image
    pub fn from_image(image: RgbImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image: DynamicImage::ImageRgb8(image),
            original,
        }
    }

    /// Replace the current raster, keeping the source
    pub fn with_image(self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Directory that receives one PNG per step
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    /// Save a raster to the debug directory, if debug mode is on
    fn save_debug(&self, image: &DynamicImage, file_stem: &str) -> Result<()> {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };

        let path = debug_config.output_dir.join(format!("{file_stem}.png"));
        image.save(&path).map_err(|source| PlantError::ImageEncode {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "saved debug raster");
        Ok(())
    }
}

/// One stage of the mask pipeline
pub trait PipelineStep: Send + Sync {
    /// Transform the current raster into the next one
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData>;

    /// Human-readable name for this step (used in logs and debug file names)
    fn name(&self) -> &str;
}

/// Linear pipeline of mask-producing steps
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if output_dir.exists() {
            let mut entries = std::fs::read_dir(&output_dir)?;
            if entries.next().is_some() {
                return Err(PlantError::InvalidConfig(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order on the input image
    pub fn run(&self, input: RgbImage) -> Result<PipelineData> {
        self.run_partial(input, self.steps.len())
    }

    /// Run only the first `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: RgbImage, num_steps: usize) -> Result<PipelineData> {
        let mut data = PipelineData::from_image(input);
        self.context.save_debug(&data.image, "00_input")?;

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(step = step.name(), "running step");
            data = step.process(data, &self.context)?;

            let file_stem = format!(
                "{:02}_{}",
                step_idx + 1,
                step.name().to_lowercase().replace(' ', "_")
            );
            self.context.save_debug(&data.image, &file_stem)?;
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    struct Invert;

    impl PipelineStep for Invert {
        fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
            let mut gray = data.image.to_luma8();
            image::imageops::invert(&mut gray);
            Ok(data.with_image(DynamicImage::ImageLuma8(gray)))
        }

        fn name(&self) -> &str {
            "Invert Luma"
        }
    }

    #[test]
    fn steps_run_in_order_and_keep_the_source() {
        let source = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(Invert))
            .add_step_boxed(Box::new(Invert))
            .add_step_boxed(Box::new(Invert));

        let out = pipeline.run(source.clone()).unwrap();
        assert_eq!(out.image.to_luma8(), GrayImage::from_pixel(4, 4, Luma([255])));
        assert_eq!(*out.original, source);

        let partial = pipeline.run_partial(source, 2).unwrap();
        assert_eq!(partial.image.to_luma8(), GrayImage::from_pixel(4, 4, Luma([0])));
    }

    #[test]
    fn debug_mode_writes_one_file_per_step() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let debug_dir = dir.path().join("debug");
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(Invert))
            .with_debug(&debug_dir)?;

        pipeline.run(RgbImage::new(3, 3))?;

        assert!(debug_dir.join("00_input.png").exists());
        assert!(debug_dir.join("01_invert_luma.png").exists());
        Ok(())
    }

    #[test]
    fn debug_dir_must_be_empty() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        std::fs::write(dir.path().join("leftover.txt"), "x")?;
        let result = Pipeline::new().with_debug(dir.path());
        assert!(matches!(result, Err(PlantError::InvalidConfig(_))));
        Ok(())
    }
}
