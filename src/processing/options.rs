use crate::error::LabError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLAHE_CLIP_LIMIT: f32 = 2.0;
pub const DEFAULT_CLAHE_TILE_SIZE: u32 = 8;
pub const DEFAULT_KERNEL_SIZE: u32 = 5;
pub const DEFAULT_CANNY_LOW: f32 = 50.0;
pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
/// Upper bound on the CLAHE tile grid per axis
pub const MAX_CLAHE_TILE_SIZE: u32 = 64;
/// Largest blur kernel accepted, in taps per axis
pub const MAX_KERNEL_SIZE: u32 = 31;
/// Largest resize target accepted per axis
pub const MAX_RESIZE_DIMENSION: u32 = 8192;

/// Target dimensions for the resize stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

/// Flat set of transformations to apply. Every field is optional in JSON.
///
/// The equalization flags are expected to be mutually exclusive; when several
/// are set the pipeline honours [`ProcessingOptions::equalization_mode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub grayscale: bool,
    pub histogram_equalization: bool,
    pub clahe: bool,
    pub clahe_clip_limit: f32,
    /// Number of tiles per axis
    pub clahe_tile_size: u32,
    pub color_clahe: bool,
    pub gaussian_blur: bool,
    pub gaussian_kernel: u32,
    pub average_blur: bool,
    pub average_kernel: u32,
    pub sharpen: bool,
    pub sobel: bool,
    pub canny: bool,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Degrees; only multiples of 90 rotate
    pub rotation: i32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub center_crop: bool,
    pub resize: Option<ResizeTarget>,
    /// Single-field alternative to the three equalization flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalization: Option<EqualizationMode>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            grayscale: false,
            histogram_equalization: false,
            clahe: false,
            clahe_clip_limit: DEFAULT_CLAHE_CLIP_LIMIT,
            clahe_tile_size: DEFAULT_CLAHE_TILE_SIZE,
            color_clahe: false,
            gaussian_blur: false,
            gaussian_kernel: DEFAULT_KERNEL_SIZE,
            average_blur: false,
            average_kernel: DEFAULT_KERNEL_SIZE,
            sharpen: false,
            sobel: false,
            canny: false,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            center_crop: false,
            resize: None,
            equalization: None,
        }
    }
}

/// Contrast stage selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EqualizationMode {
    #[default]
    None,
    Histogram,
    Clahe,
    ColorClahe,
}

impl EqualizationMode {
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Clahe | Self::ColorClahe)
    }
}

/// Flip applied by the flip stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    Horizontal,
    Vertical,
    Both,
}

impl ProcessingOptions {
    pub fn from_json(json: &str) -> Result<Self, LabError> {
        let mut options: Self =
            serde_json::from_str(json).map_err(|e| LabError::InvalidOptions(e.to_string()))?;
        if let Some(mode) = options.equalization {
            options = options.with_equalization(mode);
        }
        options.validate()?;
        Ok(options)
    }

    /// Contrast stage: an explicit `equalization` wins, otherwise the flags in
    /// priority order color CLAHE, CLAHE, global equalization
    pub fn equalization_mode(&self) -> EqualizationMode {
        if let Some(mode) = self.equalization {
            mode
        } else if self.color_clahe {
            EqualizationMode::ColorClahe
        } else if self.clahe {
            EqualizationMode::Clahe
        } else if self.histogram_equalization {
            EqualizationMode::Histogram
        } else {
            EqualizationMode::None
        }
    }

    /// Select one equalization mode, clearing the others
    pub fn with_equalization(mut self, mode: EqualizationMode) -> Self {
        self.histogram_equalization = mode == EqualizationMode::Histogram;
        self.clahe = mode == EqualizationMode::Clahe;
        self.color_clahe = mode == EqualizationMode::ColorClahe;
        self.equalization = None;
        self
    }

    /// Quarter turns clockwise, if the rotation is a non-zero multiple of 90
    pub fn quarter_turns(&self) -> Option<u8> {
        match self.rotation.rem_euclid(360) {
            90 => Some(1),
            180 => Some(2),
            270 => Some(3),
            _ => None,
        }
    }

    pub fn flip(&self) -> Option<Flip> {
        match (self.flip_horizontal, self.flip_vertical) {
            (true, true) => Some(Flip::Both),
            (true, false) => Some(Flip::Horizontal),
            (false, true) => Some(Flip::Vertical),
            (false, false) => None,
        }
    }

    /// Resize target, ignoring targets with a zero dimension
    pub fn resize_target(&self) -> Option<ResizeTarget> {
        self.resize.filter(|t| t.width > 0 && t.height > 0)
    }

    pub fn validate(&self) -> Result<(), LabError> {
        if !self.clahe_clip_limit.is_finite() || self.clahe_clip_limit <= 0.0 {
            return Err(LabError::InvalidOptions(format!(
                "claheClipLimit must be positive, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.clahe_tile_size == 0 || self.clahe_tile_size > MAX_CLAHE_TILE_SIZE {
            return Err(LabError::InvalidOptions(format!(
                "claheTileSize must be between 1 and {}, got {}",
                MAX_CLAHE_TILE_SIZE, self.clahe_tile_size
            )));
        }
        for (name, value) in [
            ("gaussianKernel", self.gaussian_kernel),
            ("averageKernel", self.average_kernel),
        ] {
            if value > MAX_KERNEL_SIZE {
                return Err(LabError::InvalidOptions(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_KERNEL_SIZE, value
                )));
            }
        }
        if let Some(target) = self.resize {
            if target.width > MAX_RESIZE_DIMENSION || target.height > MAX_RESIZE_DIMENSION {
                return Err(LabError::InvalidOptions(format!(
                    "resize must be at most {}x{}, got {}x{}",
                    MAX_RESIZE_DIMENSION, MAX_RESIZE_DIMENSION, target.width, target.height
                )));
            }
        }
        for (name, value) in [("cannyLow", self.canny_low), ("cannyHigh", self.canny_high)] {
            if !value.is_finite() || value < 0.0 {
                return Err(LabError::InvalidOptions(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
