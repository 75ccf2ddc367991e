//! Explain mode: a fixed enhancement walk-through
//!
//! Each step feeds the previous step's output through the pipeline with its
//! own options and keeps the result, so a viewer can page through how an
//! image changes from the original to an edge map.

use crate::backend::{Capabilities, Equalizer};
use crate::buffer::Mat;
use crate::error::LabError;
use crate::histogram::{self, Histogram, NormalizedHistogram};
use crate::processing::{Pipeline, ProcessingOptions};
use serde::Serialize;

pub struct ExplainStep {
    pub key: &'static str,
    pub title: &'static str,
    pub explanation: &'static str,
    pub options: ProcessingOptions,
}

/// The walk-through, in order
pub fn steps() -> Vec<ExplainStep> {
    vec![
        ExplainStep {
            key: "original",
            title: "Original image",
            explanation: "The image as decoded. A color image has three channels (red, green, \
                blue) holding values from 0 to 255; its histogram shows how often each \
                intensity occurs in every channel.",
            options: ProcessingOptions::default(),
        },
        ExplainStep {
            key: "grayscale",
            title: "Convert to grayscale",
            explanation: "Most classical enhancement works on brightness alone. Each pixel \
                becomes a weighted sum of its channels (0.299 R + 0.587 G + 0.114 B), \
                matching how sensitive the eye is to each color. The three histograms \
                collapse into one.",
            options: ProcessingOptions {
                grayscale: true,
                ..Default::default()
            },
        },
        ExplainStep {
            key: "denoise",
            title: "Reduce noise with a Gaussian blur",
            explanation: "A 5x5 Gaussian kernel replaces every pixel with a weighted average \
                of its neighbours, nearer pixels counting more. Sensor noise is smoothed \
                away so the next step does not amplify it; the histogram becomes \
                smoother too.",
            options: ProcessingOptions {
                gaussian_blur: true,
                gaussian_kernel: 5,
                ..Default::default()
            },
        },
        ExplainStep {
            key: "contrast",
            title: "Boost local contrast with CLAHE",
            explanation: "Contrast-Limited Adaptive Histogram Equalization splits the image \
                into an 8x8 grid of tiles and equalizes each tile's histogram, clipping \
                tall bins at a limit of 2.0 so flat regions are not blown up into noise. \
                Tile results are blended bilinearly to hide tile borders. The histogram \
                spreads across the full intensity range.",
            options: ProcessingOptions {
                clahe: true,
                clahe_clip_limit: 2.0,
                clahe_tile_size: 8,
                ..Default::default()
            },
        },
        ExplainStep {
            key: "sharpen",
            title: "Sharpen details",
            explanation: "A 3x3 kernel with weight 5 in the center and -1 on the four direct \
                neighbours adds back the difference between a pixel and its surroundings. \
                Flat areas stay the same while edges gain contrast.",
            options: ProcessingOptions {
                sharpen: true,
                ..Default::default()
            },
        },
        ExplainStep {
            key: "edges",
            title: "Detect edges with Canny",
            explanation: "The Canny detector measures gradient strength, thins edges to one \
                pixel, and keeps pixels above the high threshold (150) plus connected \
                pixels above the low threshold (50). The result is a binary edge map, so \
                the histogram has only two bins: background and edges.",
            options: ProcessingOptions {
                canny: true,
                canny_low: 50.0,
                canny_high: 150.0,
                ..Default::default()
            },
        },
    ]
}

/// Everything about a frame except its pixels
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSummary {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub explanation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub histogram: Histogram,
    pub normalized_histogram: NormalizedHistogram,
}

#[derive(Debug)]
pub struct ExplainFrame {
    pub summary: FrameSummary,
    pub buffer: Mat,
}

/// Run the walk-through over `source`, which is left untouched
pub fn run(source: &Mat, capabilities: Capabilities) -> Result<Vec<ExplainFrame>, LabError> {
    let pipeline = Pipeline::new(capabilities);
    let mut frames: Vec<ExplainFrame> = Vec::new();

    for (index, step) in steps().into_iter().enumerate() {
        let input = frames.last().map(|f| &f.buffer).unwrap_or(source);
        let output = pipeline.process(input, &step.options)?;

        let note = (output.equalizer == Some(Equalizer::Global)).then(|| {
            "Adaptive equalization is not available in this build; \
             global histogram equalization was used instead."
                .to_string()
        });

        let (width, height) = output.buffer.dimensions()?;
        let histogram = histogram::compute(&output.buffer)?;
        tracing::debug!("Explain step {} ({}) produced {}x{}", index, step.key, width, height);

        frames.push(ExplainFrame {
            summary: FrameSummary {
                index,
                key: step.key,
                title: step.title,
                explanation: step.explanation,
                note,
                width,
                height,
                channels: output.buffer.channels()?,
                normalized_histogram: histogram.normalized(),
                histogram,
            },
            buffer: output.buffer,
        });
    }

    Ok(frames)
}
