use super::color::map_planes;
use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;
use imageproc::filter::{box_filter, gaussian_blur_f32};

/// Bump even kernel sizes to the next odd one; sizes of 0 or 1 blur nothing
pub fn odd_kernel(size: u32) -> Option<u32> {
    if size <= 1 {
        None
    } else {
        Some(size | 1)
    }
}

/// Sigma a Gaussian kernel of `size` taps implies
pub fn sigma_for_kernel(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn gaussian(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.gaussian_blur {
        return Ok(None);
    }
    let Some(size) = odd_kernel(options.gaussian_kernel) else {
        return Ok(None);
    };

    let sigma = sigma_for_kernel(size);
    let blurred = map_planes(buffer.image()?, |plane| gaussian_blur_f32(plane, sigma))?;
    Ok(Some(buffer.derive(blurred)))
}

/// Box blur: every output pixel is the mean of its `size x size` neighbourhood
pub fn average(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.average_blur {
        return Ok(None);
    }
    let Some(size) = odd_kernel(options.average_kernel) else {
        return Ok(None);
    };

    let radius = size / 2;
    let blurred = map_planes(buffer.image()?, |plane| box_filter(plane, radius, radius))?;
    Ok(Some(buffer.derive(blurred)))
}
