//! Per-channel 256-bin intensity histograms

use crate::buffer::Mat;
use crate::error::LabError;
use image::DynamicImage;
use imageproc::stats::histogram as channel_histogram;
use serde::Serialize;

pub const BINS: usize = 256;

/// Frequency tables keyed the way the chart consumes them:
/// `{"gray": [...]}` or `{"red": [...], "green": [...], "blue": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HistogramData<T> {
    Gray { gray: Vec<T> },
    Color { red: Vec<T>, green: Vec<T>, blue: Vec<T> },
}

pub type Histogram = HistogramData<u32>;
pub type NormalizedHistogram = HistogramData<f32>;

impl<T> HistogramData<T> {
    pub fn channels(&self) -> Vec<&[T]> {
        match self {
            HistogramData::Gray { gray } => vec![gray.as_slice()],
            HistogramData::Color { red, green, blue } => {
                vec![red.as_slice(), green.as_slice(), blue.as_slice()]
            }
        }
    }

    pub fn is_gray(&self) -> bool {
        matches!(self, HistogramData::Gray { .. })
    }

    fn map<U>(&self, f: impl Fn(&[T]) -> Vec<U>) -> HistogramData<U> {
        match self {
            HistogramData::Gray { gray } => HistogramData::Gray { gray: f(gray) },
            HistogramData::Color { red, green, blue } => HistogramData::Color {
                red: f(red),
                green: f(green),
                blue: f(blue),
            },
        }
    }
}

impl Histogram {
    /// Largest bin over all channels
    pub fn max_bin(&self) -> u32 {
        self.channels()
            .iter()
            .flat_map(|c| c.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Scale every bin into [0, 1] by the largest bin
    pub fn normalized(&self) -> NormalizedHistogram {
        let max = self.max_bin();
        self.map(|bins| {
            if max == 0 {
                vec![0.0; bins.len()]
            } else {
                bins.iter().map(|&b| b as f32 / max as f32).collect()
            }
        })
    }
}

/// Count pixel intensities of a buffer.
///
/// Single-channel buffers produce one gray table; multi-channel buffers
/// produce red/green/blue tables and any further channel is ignored.
pub fn compute(buffer: &Mat) -> Result<Histogram, LabError> {
    let tables = match buffer.image()? {
        DynamicImage::ImageLuma8(img) => channel_histogram(img).channels,
        DynamicImage::ImageRgb8(img) => channel_histogram(img).channels,
        DynamicImage::ImageRgba8(img) => channel_histogram(img).channels,
        other => channel_histogram(&other.to_rgb8()).channels,
    };

    let mut tables = tables.into_iter().map(|t| t.to_vec());
    let mut next = || tables.next().unwrap_or_else(|| vec![0; BINS]);

    if buffer.channels()? == 1 {
        Ok(HistogramData::Gray { gray: next() })
    } else {
        Ok(HistogramData::Color {
            red: next(),
            green: next(),
            blue: next(),
        })
    }
}
