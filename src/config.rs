//! Run configuration for the plant counter.
//!
//! Every tunable of the pipeline lives in [`CountConfig`]. The defaults are the
//! hand-tuned values the counter was calibrated with on overhead field photos;
//! they are a starting point, not a law. A config can be loaded from JSON with
//! any subset of fields present:
//!
//! ```no_run
//! use plantcount::CountConfig;
//! use std::path::Path;
//!
//! let config = CountConfig::from_json_file(Path::new("plants.json"))?;
//! # Ok::<(), plantcount::PlantError>(())
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlantError, Result};

/// Closed interval `[min, max]` on one 8-bit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub min: u8,
    pub max: u8,
}

impl ChannelBounds {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u8) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for ChannelBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for ChannelBounds {
    type Err = PlantError;

    /// Parses `"45-77"`.
    fn from_str(s: &str) -> Result<Self> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| PlantError::InvalidConfig(format!("expected MIN-MAX, got '{s}'")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u8>()
                .map_err(|e| PlantError::InvalidConfig(format!("bad bound '{part}' in '{s}': {e}")))
        };
        Ok(Self::new(parse(min)?, parse(max)?))
    }
}

/// Scale the hue channel is expressed in, for both conversion and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueScale {
    /// Degrees / 2, giving 0..=179.
    #[default]
    Half,
    /// Degrees * 256 / 360, wrapping, giving 0..=255.
    Full,
}

impl HueScale {
    /// Largest hue value the conversion can produce on this scale.
    pub const fn max_hue(self) -> u8 {
        match self {
            HueScale::Half => 179,
            HueScale::Full => 255,
        }
    }
}

/// HSV box a pixel must fall in to count as foliage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRange {
    pub hue: ChannelBounds,
    pub saturation: ChannelBounds,
    pub value: ChannelBounds,
    pub hue_scale: HueScale,
}

impl ColorRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        self.hue.contains(hsv[0]) && self.saturation.contains(hsv[1]) && self.value.contains(hsv[2])
    }

    pub fn validate(&self) -> Result<()> {
        for (name, bounds) in [
            ("hue", self.hue),
            ("saturation", self.saturation),
            ("value", self.value),
        ] {
            if bounds.min > bounds.max {
                return Err(PlantError::InvalidConfig(format!(
                    "{name} range {} has min > max",
                    bounds
                )));
            }
        }
        let max_hue = self.hue_scale.max_hue();
        if self.hue.max > max_hue {
            return Err(PlantError::InvalidConfig(format!(
                "hue max {} exceeds {max_hue}, the top of the {:?} hue scale",
                self.hue.max, self.hue_scale
            )));
        }
        Ok(())
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self {
            hue: ChannelBounds::new(45, 77),
            saturation: ChannelBounds::new(19, 255),
            value: ChannelBounds::new(164, 255),
            hue_scale: HueScale::Half,
        }
    }
}

/// Rectangular structuring element shared by erosion and dilation.
///
/// The anchor sits at `(width / 2, height / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringElement {
    pub width: u32,
    pub height: u32,
}

impl StructuringElement {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Longest side a kernel may have.
    pub const MAX_SIDE: u32 = 511;

    /// Anchor at `(width / 2, height / 2)`. Always fits in a `u8` once
    /// [`validate`](Self::validate) has passed.
    pub fn anchor(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PlantError::InvalidConfig(format!(
                "structuring element must have positive dimensions, got {self}"
            )));
        }
        if self.width > Self::MAX_SIDE || self.height > Self::MAX_SIDE {
            return Err(PlantError::InvalidConfig(format!(
                "structuring element {self} is larger than {max}x{max}",
                max = Self::MAX_SIDE
            )));
        }
        Ok(())
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

impl fmt::Display for StructuringElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for StructuringElement {
    type Err = PlantError;

    /// Parses `"2x2"`; a single number means a square kernel.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| PlantError::InvalidConfig(format!("bad kernel size '{s}': {e}")))
        };
        let kernel = match s.split_once(['x', 'X']) {
            Some((w, h)) => Self::new(parse(w)?, parse(h)?),
            None => {
                let side = parse(s)?;
                Self::new(side, side)
            }
        };
        kernel.validate()?;
        Ok(kernel)
    }
}

/// How a region's area is measured before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMeasure {
    /// Pixels inside the outer boundary, holes included.
    #[default]
    Pixels,
    /// Shoelace area of the boundary polygon through pixel centres.
    Polygon,
}

/// Stroke used to outline accepted regions on the annotated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineStyle {
    /// RGB
    pub color: [u8; 3],
    pub width: u32,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            width: 2,
        }
    }
}

/// Complete configuration for one counting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountConfig {
    pub color_range: ColorRange,

    /// Mask pixels whose source luma is at or below this floor are dropped.
    /// `None` disables the gate.
    pub dark_floor: Option<u8>,

    pub kernel: StructuringElement,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,

    /// Regions must be strictly larger than this to be counted.
    pub area_threshold: u32,
    pub area_measure: AreaMeasure,

    pub outline: OutlineStyle,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            color_range: ColorRange::default(),
            dark_floor: Some(5),
            kernel: StructuringElement::default(),
            erode_iterations: 2,
            dilate_iterations: 4,
            area_threshold: 500,
            area_measure: AreaMeasure::Pixels,
            outline: OutlineStyle::default(),
        }
    }
}

impl CountConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            PlantError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.color_range.validate()?;
        self.kernel.validate()?;
        if self.outline.width == 0 {
            return Err(PlantError::InvalidConfig(
                "outline width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Human-readable list of the mask operations, as recorded in `details.json`.
    pub fn operations(&self) -> Vec<String> {
        let range = &self.color_range;
        vec![
            format!("h {}", range.hue),
            format!("s {}", range.saturation),
            format!("v {}", range.value),
            format!("erode {} x{}", self.kernel, self.erode_iterations),
            format!("dilate {} x{}", self.kernel, self.dilate_iterations),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CountConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = CountConfig::default();
        config.color_range.saturation = ChannelBounds::new(200, 100);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PlantError::InvalidConfig(_)));
        assert!(err.to_string().contains("saturation"));
    }

    #[test]
    fn zero_kernel_is_rejected() {
        let mut config = CountConfig::default();
        config.kernel = StructuringElement::new(0, 3);
        assert!(matches!(config.validate(), Err(PlantError::InvalidConfig(_))));
        assert!("0x3".parse::<StructuringElement>().is_err());
    }

    #[test]
    fn oversized_kernel_is_rejected() {
        let mut config = CountConfig::default();
        config.kernel = StructuringElement::new(511, 3);
        assert!(config.validate().is_ok());
        config.kernel = StructuringElement::new(3, 512);
        assert!(matches!(config.validate(), Err(PlantError::InvalidConfig(_))));
    }

    #[test]
    fn hue_bounds_must_fit_the_scale() {
        let mut range = ColorRange {
            hue: ChannelBounds::new(100, 200),
            ..ColorRange::default()
        };
        let err = range.validate().unwrap_err();
        assert!(matches!(err, PlantError::InvalidConfig(_)));
        assert!(err.to_string().contains("179"));

        range.hue = ChannelBounds::new(100, 179);
        assert!(range.validate().is_ok());

        range.hue = ChannelBounds::new(100, 200);
        range.hue_scale = HueScale::Full;
        assert!(range.validate().is_ok());
    }

    #[test]
    fn parses_cli_shorthands() {
        assert_eq!("45-77".parse::<ChannelBounds>().unwrap(), ChannelBounds::new(45, 77));
        assert_eq!(
            "3x5".parse::<StructuringElement>().unwrap(),
            StructuringElement::new(3, 5)
        );
        assert_eq!(
            "4".parse::<StructuringElement>().unwrap(),
            StructuringElement::new(4, 4)
        );
        assert!("45".parse::<ChannelBounds>().is_err());
        assert!("45-300".parse::<ChannelBounds>().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: CountConfig =
            serde_json::from_str(r#"{ "area_threshold": 800, "dark_floor": null }"#).unwrap();
        assert_eq!(config.area_threshold, 800);
        assert_eq!(config.dark_floor, None);
        assert_eq!(config.kernel, StructuringElement::new(2, 2));
        assert_eq!(config.erode_iterations, 2);
    }

    #[test]
    fn operations_describe_the_mask() {
        let ops = CountConfig::default().operations();
        assert_eq!(
            ops,
            vec![
                "h 45-77",
                "s 19-255",
                "v 164-255",
                "erode 2x2 x2",
                "dilate 2x2 x4"
            ]
        );
    }
}
