pub mod color;
pub mod contours;
pub mod counting;
pub mod morphology;
pub mod steps;

use image::{GrayImage, ImageReader, RgbImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CountConfig;
use crate::error::{PlantError, Result};
use crate::models::CountOutcome;
use crate::pipeline::Pipeline;
use steps::{ColorMaskStep, DarkPixelStep, DilateStep, ErodeStep};

/// Load an image file as RGB. Missing, unreadable and empty files are all invalid input.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| PlantError::InvalidInput(format!("cannot open {}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| PlantError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    let img = reader.decode().map_err(PlantError::ImageDecode)?.to_rgb8();

    if img.width() == 0 || img.height() == 0 {
        return Err(PlantError::InvalidInput(format!(
            "{} has zero dimension",
            path.display()
        )));
    }
    Ok(img)
}

/// Build the mask pipeline described by `config`
pub fn build_mask_pipeline(config: &CountConfig) -> Pipeline {
    let mut pipeline = Pipeline::new().add_step(Arc::new(ColorMaskStep {
        range: config.color_range,
    }));

    if let Some(floor) = config.dark_floor {
        pipeline = pipeline.add_step(Arc::new(DarkPixelStep { floor }));
    }

    pipeline
        .add_step(Arc::new(ErodeStep {
            kernel: config.kernel,
            iterations: config.erode_iterations,
        }))
        .add_step(Arc::new(DilateStep {
            kernel: config.kernel,
            iterations: config.dilate_iterations,
        }))
}

/// Segment foliage and count plants in a single image
#[derive(Clone)]
pub struct PlantCounter {
    config: CountConfig,
    pipeline: Pipeline,
}

impl PlantCounter {
    /// Validate `config` and build the counter. Nothing touches an image until this succeeds.
    pub fn new(config: CountConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = build_mask_pipeline(&config);
        Ok(Self { config, pipeline })
    }

    /// Dump every intermediate mask into `output_dir` (must be empty or absent)
    pub fn with_debug(mut self, output_dir: impl AsRef<Path>) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn config(&self) -> &CountConfig {
        &self.config
    }

    /// Color mask, dark gate, erosion and dilation
    pub fn clean_mask(&self, img: &RgbImage) -> Result<GrayImage> {
        let data = self.pipeline.run(img.clone())?;
        Ok(data.image.to_luma8())
    }

    /// Run the whole pipeline. Pure: reads `img`, returns new rasters.
    pub fn count(&self, img: &RgbImage) -> Result<CountOutcome> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(PlantError::InvalidInput(format!(
                "image has zero dimension ({width}x{height})"
            )));
        }

        let mask = self.clean_mask(img)?;

        let regions = contours::find_regions(&mask);
        debug!(regions = regions.len(), "regions extracted");

        let plants = counting::filter_plants(
            &regions,
            self.config.area_threshold,
            self.config.area_measure,
        );
        for (i, plant) in plants.iter().enumerate() {
            debug!(
                plant = i + 1,
                x = plant.center().0,
                y = plant.center().1,
                area = plant.area(self.config.area_measure),
                "accepted region"
            );
        }

        let annotated = counting::annotate(img, &plants, &self.config.outline);

        info!(
            plants = plants.len(),
            candidates = regions.len(),
            threshold = self.config.area_threshold,
            "counting complete"
        );

        Ok(CountOutcome {
            mask,
            annotated,
            plants,
            candidates: regions.len(),
        })
    }

    /// Load `path` and count it
    pub fn count_file(&self, path: &Path) -> Result<CountOutcome> {
        let img = load_image(path)?;
        debug!(width = img.width(), height = img.height(), "image loaded");
        self.count(&img)
    }
}
