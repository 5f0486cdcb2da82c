use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plantcount::{
    AreaMeasure, ChannelBounds, CountConfig, PlantCounter, ResultReporter, StructuringElement,
};

#[derive(Parser)]
#[command(name = "plantcount")]
#[command(about = "Count plants in an image by segmenting green foliage")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Directory for the mask, annotated image and details.json
    /// [default: hsv_results/<image stem>]
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hue range, e.g. 45-77
    #[arg(long, value_name = "MIN-MAX")]
    hue: Option<ChannelBounds>,

    /// Saturation range, e.g. 19-255
    #[arg(long, value_name = "MIN-MAX")]
    saturation: Option<ChannelBounds>,

    /// Value range, e.g. 164-255
    #[arg(long, value_name = "MIN-MAX")]
    value: Option<ChannelBounds>,

    /// Structuring element, e.g. 2x2
    #[arg(long, value_name = "WxH")]
    kernel: Option<StructuringElement>,

    /// Erosion iterations
    #[arg(long, value_name = "N")]
    erode: Option<u32>,

    /// Dilation iterations
    #[arg(long, value_name = "N")]
    dilate: Option<u32>,

    /// Regions must be strictly larger than this many pixels
    #[arg(long, value_name = "PIXELS")]
    area_threshold: Option<u32>,

    /// Measure regions by boundary polygon instead of enclosed pixels
    #[arg(long)]
    polygon_area: bool,

    /// Keep near-black pixels that fall inside the color range
    #[arg(long)]
    no_dark_gate: bool,

    /// Print the count without writing any files
    #[arg(long)]
    count_only: bool,

    /// Save every intermediate mask to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_config(&self) -> anyhow::Result<CountConfig> {
        let mut config = match &self.config {
            Some(path) => CountConfig::from_json_file(path)?,
            None => CountConfig::default(),
        };

        if let Some(hue) = self.hue {
            config.color_range.hue = hue;
        }
        if let Some(saturation) = self.saturation {
            config.color_range.saturation = saturation;
        }
        if let Some(value) = self.value {
            config.color_range.value = value;
        }
        if let Some(kernel) = self.kernel {
            config.kernel = kernel;
        }
        if let Some(erode) = self.erode {
            config.erode_iterations = erode;
        }
        if let Some(dilate) = self.dilate {
            config.dilate_iterations = dilate;
        }
        if let Some(threshold) = self.area_threshold {
            config.area_threshold = threshold;
        }
        if self.polygon_area {
            config.area_measure = AreaMeasure::Polygon;
        }
        if self.no_dark_gate {
            config.dark_floor = None;
        }

        config.validate()?;
        Ok(config)
    }

    fn out_dir(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(|| {
            let stem = self
                .image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            PathBuf::from("hsv_results").join(stem)
        })
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Validate everything before the image is touched
    let config = args.build_config()?;
    let mut counter = PlantCounter::new(config)?;
    if let Some(debug_dir) = &args.debug_out {
        counter = counter.with_debug(debug_dir)?;
    }

    info!(image = %args.image_path.display(), "processing");
    let outcome = counter.count_file(&args.image_path)?;

    if !args.count_only {
        let reporter = ResultReporter::new(args.out_dir());
        let paths = reporter.report(&args.image_path, counter.config(), &outcome)?;
        info!(
            mask = %paths.mask.display(),
            annotated = %paths.annotated.display(),
            details = %paths.details.display(),
            "artifacts saved"
        );
    }

    println!("Total number of plants: {}", outcome.plant_count());

    if args.verbose {
        for (i, plant) in outcome.plants.iter().enumerate() {
            let (x, y) = plant.center();
            println!(
                "  Plant {} at ({}, {}) - area: {:.0}",
                i + 1,
                x,
                y,
                plant.area(counter.config().area_measure)
            );
        }
    }

    Ok(())
}
