//! The image currently being worked on
//!
//! A session owns the original and processed buffers plus any explain
//! frames. Every replacement releases the buffer it overwrites first.

use crate::backend::{Capabilities, Equalizer};
use crate::buffer::{self, BufferLedger, Mat};
use crate::error::LabError;
use crate::explain::{self, ExplainFrame, FrameSummary};
use crate::histogram::{self, Histogram, NormalizedHistogram};
use crate::processing::{Pipeline, ProcessingOptions, StepTiming};
use serde::Serialize;
use std::sync::Arc;

/// What a client needs to render one processing result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub equalizer: Option<Equalizer>,
    pub original_histogram: Histogram,
    pub processed_histogram: Histogram,
    pub normalized_histogram: NormalizedHistogram,
    pub steps: Vec<StepTiming>,
    pub total_time_ms: u64,
    pub options: ProcessingOptions,
}

pub struct Session {
    ledger: Arc<BufferLedger>,
    original: Option<Mat>,
    processed: Option<Mat>,
    options: ProcessingOptions,
    explain: Vec<ExplainFrame>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BufferLedger::global())
    }
}

impl Session {
    pub fn new(ledger: Arc<BufferLedger>) -> Self {
        Self {
            ledger,
            original: None,
            processed: None,
            options: ProcessingOptions::default(),
            explain: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<BufferLedger> {
        &self.ledger
    }

    /// Decode `bytes` and load the result as the new original
    pub fn load_bytes(
        &mut self,
        bytes: &[u8],
        options: ProcessingOptions,
        capabilities: Capabilities,
    ) -> Result<ProcessOutcome, LabError> {
        let mat = Mat::decode(bytes, Arc::clone(&self.ledger))?;
        self.load(mat, options, capabilities)
    }

    /// Replace the session image, releasing everything held for the old one.
    ///
    /// The new image is processed first; on failure the session keeps the
    /// previous pair and options and `original` is released.
    pub fn load(
        &mut self,
        original: Mat,
        options: ProcessingOptions,
        capabilities: Capabilities,
    ) -> Result<ProcessOutcome, LabError> {
        let (processed, outcome) = match Self::process(&original, options, capabilities) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Processing failed, keeping previous image: {}", e);
                return Err(e);
            }
        };

        let (width, height) = original.dimensions()?;
        self.clear();
        tracing::info!("Loaded {}x{} image", width, height);
        self.original = Some(original);
        self.processed = Some(processed);
        self.options = outcome.options.clone();
        Ok(outcome)
    }

    /// Re-run the pipeline on the original with new options.
    ///
    /// On failure the previous processed buffer and options stay in place.
    pub fn apply_options(
        &mut self,
        options: ProcessingOptions,
        capabilities: Capabilities,
    ) -> Result<ProcessOutcome, LabError> {
        let original = self.original.as_ref().ok_or(LabError::NoImageLoaded)?;
        let (processed, outcome) = match Self::process(original, options, capabilities) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Processing failed, keeping previous result: {}", e);
                return Err(e);
            }
        };

        buffer::release(self.processed.as_mut());
        self.processed = Some(processed);
        self.options = outcome.options.clone();
        Ok(outcome)
    }

    /// Run the pipeline and histograms without touching session state
    fn process(
        original: &Mat,
        options: ProcessingOptions,
        capabilities: Capabilities,
    ) -> Result<(Mat, ProcessOutcome), LabError> {
        options.validate()?;
        let output = Pipeline::new(capabilities).process(original, &options)?;
        let original_histogram = histogram::compute(original)?;
        let processed_histogram = histogram::compute(&output.buffer)?;
        let (width, height) = output.buffer.dimensions()?;
        let channels = output.buffer.channels()?;

        let outcome = ProcessOutcome {
            width,
            height,
            channels,
            equalizer: output.equalizer,
            normalized_histogram: processed_histogram.normalized(),
            original_histogram,
            processed_histogram,
            steps: output.steps,
            total_time_ms: output.total_time_ms,
            options,
        };
        Ok((output.buffer, outcome))
    }

    /// Run explain mode on the original, replacing earlier frames
    pub fn explain(&mut self, capabilities: Capabilities) -> Result<Vec<FrameSummary>, LabError> {
        let original = self.original.as_ref().ok_or(LabError::NoImageLoaded)?;
        let frames = explain::run(original, capabilities)?;

        self.release_explain();
        self.explain = frames;
        Ok(self.explain.iter().map(|f| f.summary.clone()).collect())
    }

    pub fn original(&self) -> Result<&Mat, LabError> {
        self.original.as_ref().ok_or(LabError::NoImageLoaded)
    }

    pub fn processed(&self) -> Result<&Mat, LabError> {
        self.processed.as_ref().ok_or(LabError::NoImageLoaded)
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn explain_frame(&self, index: usize) -> Result<&Mat, LabError> {
        self.explain
            .get(index)
            .map(|f| &f.buffer)
            .ok_or(LabError::FrameNotFound(index))
    }

    pub fn has_image(&self) -> bool {
        self.original.is_some()
    }

    /// Release every buffer the session holds
    pub fn clear(&mut self) {
        self.release_explain();
        buffer::release(self.processed.as_mut());
        buffer::release(self.original.as_mut());
        self.processed = None;
        self.original = None;
    }

    fn release_explain(&mut self) {
        for frame in self.explain.iter_mut() {
            buffer::release(Some(&mut frame.buffer));
        }
        self.explain.clear();
    }
}
