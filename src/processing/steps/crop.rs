use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;
use image::GenericImageView;

/// Keep the middle half of the image in each dimension
pub fn apply(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.center_crop {
        return Ok(None);
    }

    let image = buffer.image()?;
    let (width, height) = image.dimensions();
    let (crop_width, crop_height) = (width / 2, height / 2);
    if crop_width == 0 || crop_height == 0 {
        return Err(LabError::ProcessingError(format!(
            "a {}x{} image is too small to center crop",
            width, height
        )));
    }

    let cropped = image.crop_imm(width / 4, height / 4, crop_width, crop_height);
    Ok(Some(buffer.derive(cropped)))
}
