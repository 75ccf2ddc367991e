use super::color::map_planes;
use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;
use image::GrayImage;
use imageproc::filter::filter3x3;

/// Center weight 5, 4-neighbours -1: boosts local contrast, keeps flat areas
const KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Apply the fixed 3x3 sharpening kernel to every channel
pub fn apply(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.sharpen {
        return Ok(None);
    }

    let sharpened = map_planes(buffer.image()?, |plane| {
        let out: GrayImage = filter3x3(plane, &KERNEL);
        out
    })?;
    Ok(Some(buffer.derive(sharpened)))
}
