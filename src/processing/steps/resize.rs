use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;
use image::imageops::FilterType;

/// Resize to the exact target dimensions with linear interpolation
pub fn apply(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    let Some(target) = options.resize_target() else {
        return Ok(None);
    };

    let resized = buffer
        .image()?
        .resize_exact(target.width, target.height, FilterType::Triangle);
    Ok(Some(buffer.derive(resized)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::options::ResizeTarget;
    use image::{DynamicImage, RgbImage};

    fn resize(width: u32, height: u32) -> ProcessingOptions {
        ProcessingOptions {
            resize: Some(ResizeTarget { width, height }),
            ..Default::default()
        }
    }

    #[test]
    fn test_resize_ignores_aspect_ratio() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::new(300, 80)));
        let result = apply(&mat, &resize(50, 50)).unwrap().unwrap();
        assert_eq!(result.dimensions().unwrap(), (50, 50));
        assert_eq!(result.channels().unwrap(), 3);
    }

    #[test]
    fn test_upscales() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let result = apply(&mat, &resize(40, 12)).unwrap().unwrap();
        assert_eq!(result.dimensions().unwrap(), (40, 12));
    }

    #[test]
    fn test_missing_target_is_noop() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        assert!(apply(&mat, &ProcessingOptions::default()).unwrap().is_none());
        assert!(apply(&mat, &resize(0, 4)).unwrap().is_none());
    }
}
