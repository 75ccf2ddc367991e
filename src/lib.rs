//! Educational image-processing lab
//!
//! Classical computer-vision filters driven by a flat options record, with
//! per-channel histograms of the original and processed image and a
//! step-by-step explain mode. [`server`] exposes it all over HTTP.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod explain;
pub mod histogram;
pub mod processing;
pub mod runtime;
pub mod server;
pub mod session;

pub use backend::{Capabilities, Equalizer, NativeBackend, VisionBackend};
pub use buffer::{BufferLedger, Mat};
pub use error::LabError;
pub use histogram::Histogram;
pub use processing::{process_image, Pipeline, ProcessingOptions};
pub use runtime::Runtime;
pub use session::Session;
