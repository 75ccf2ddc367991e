use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;

/// Rotate clockwise by a multiple of 90 degrees; any other angle is a no-op
pub fn apply(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    let image = buffer.image()?;
    let rotated = match options.quarter_turns() {
        Some(1) => image.rotate90(),
        Some(2) => image.rotate180(),
        Some(3) => image.rotate270(),
        _ => return Ok(None),
    };
    Ok(Some(buffer.derive(rotated)))
}
