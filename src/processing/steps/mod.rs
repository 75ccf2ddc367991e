//! Individual pipeline stages
//!
//! Every stage returns `Ok(None)` when the options leave it inactive and a
//! freshly allocated buffer otherwise.

pub mod blur;
pub mod clahe;
pub mod color;
pub mod contrast;
pub mod crop;
pub mod edges;
pub mod flip;
pub mod resize;
pub mod rotate;
pub mod sharpen;
