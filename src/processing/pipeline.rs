use crate::backend::{Capabilities, Equalizer};
use crate::buffer::{self, Mat};
use crate::error::LabError;
use serde::Serialize;
use std::time::Instant;

use super::options::ProcessingOptions;
use super::steps;

/// Timing information for a single stage that ran
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Newly allocated result; the caller owns it
    pub buffer: Mat,
    pub total_time_ms: u64,
    /// Stages that allocated a new buffer, in order
    pub steps: Vec<StepTiming>,
    /// Set when a CLAHE stage ran, telling which equalizer served it
    pub equalizer: Option<Equalizer>,
}

/// The buffer a stage reads from: the caller's source or an intermediate we own
enum Working<'a> {
    Source(&'a Mat),
    Derived(Mat),
}

impl Working<'_> {
    fn buffer(&self) -> &Mat {
        match self {
            Working::Source(mat) => *mat,
            Working::Derived(mat) => mat,
        }
    }
}

/// Applies the fixed sequence of stages selected by a [`ProcessingOptions`]
pub struct Pipeline {
    capabilities: Capabilities,
}

impl Pipeline {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Run every active stage over `source`, which is left untouched.
    ///
    /// Order: rotate, flip, center crop, resize, contrast, Gaussian blur,
    /// average blur, sharpen, Sobel, Canny.
    pub fn process(
        &self,
        source: &Mat,
        options: &ProcessingOptions,
    ) -> Result<PipelineOutput, LabError> {
        options.validate()?;
        let start = Instant::now();
        let mut timings = Vec::new();
        let caps = self.capabilities;

        let mut working = Working::Source(source);
        working = run_stage("rotate", working, &mut timings, |m| steps::rotate::apply(m, options))?;
        working = run_stage("flip", working, &mut timings, |m| steps::flip::apply(m, options))?;
        working = run_stage("center_crop", working, &mut timings, |m| steps::crop::apply(m, options))?;
        working = run_stage("resize", working, &mut timings, |m| steps::resize::apply(m, options))?;
        working = run_stage("contrast", working, &mut timings, |m| {
            steps::contrast::apply(m, options, caps)
        })?;
        working = run_stage("gaussian_blur", working, &mut timings, |m| {
            steps::blur::gaussian(m, options)
        })?;
        working = run_stage("average_blur", working, &mut timings, |m| {
            steps::blur::average(m, options)
        })?;
        working = run_stage("sharpen", working, &mut timings, |m| steps::sharpen::apply(m, options))?;
        working = run_stage("sobel", working, &mut timings, |m| steps::edges::sobel(m, options))?;
        working = run_stage("canny", working, &mut timings, |m| steps::edges::canny(m, options))?;

        let buffer = match working {
            Working::Source(mat) => mat.try_clone()?,
            Working::Derived(mat) => mat,
        };

        let equalizer = options
            .equalization_mode()
            .is_adaptive()
            .then(|| caps.equalizer());

        Ok(PipelineOutput {
            buffer,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
            equalizer,
        })
    }
}

/// Run one stage; when it allocates, release the intermediate it replaces
fn run_stage<'a, F>(
    name: &str,
    working: Working<'a>,
    timings: &mut Vec<StepTiming>,
    stage: F,
) -> Result<Working<'a>, LabError>
where
    F: FnOnce(&Mat) -> Result<Option<Mat>, LabError>,
{
    let step_start = Instant::now();
    let Some(next) = stage(working.buffer())? else {
        return Ok(working);
    };

    if let Working::Derived(mut previous) = working {
        buffer::release(Some(&mut previous));
    }

    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Stage {} took {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(Working::Derived(next))
}

/// Convenience wrapper returning only the processed buffer
pub fn process_image(
    source: &Mat,
    options: &ProcessingOptions,
    capabilities: Capabilities,
) -> Result<Mat, LabError> {
    Pipeline::new(capabilities)
        .process(source, options)
        .map(|output| output.buffer)
}
