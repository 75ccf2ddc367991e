use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::{Flip, ProcessingOptions};
use image::imageops;

/// Mirror horizontally, vertically, or across both axes at once
pub fn apply(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    let image = buffer.image()?;
    let flipped = match options.flip() {
        Some(Flip::Horizontal) => image.fliph(),
        Some(Flip::Vertical) => image.flipv(),
        Some(Flip::Both) => {
            let mut flipped = image.flipv();
            imageops::flip_horizontal_in_place(&mut flipped);
            flipped
        }
        None => return Ok(None),
    };
    Ok(Some(buffer.derive(flipped)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn marked() -> Mat {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        Mat::new(DynamicImage::ImageRgb8(img))
    }

    fn marker_position(mat: &Mat) -> (u32, u32) {
        let rgb = mat.image().unwrap().to_rgb8();
        let (x, y, _) = rgb
            .enumerate_pixels()
            .find(|(_, _, p)| p.0[0] == 255)
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_horizontal_flip() {
        let opts = ProcessingOptions {
            flip_horizontal: true,
            ..Default::default()
        };
        let result = apply(&marked(), &opts).unwrap().unwrap();
        assert_eq!(marker_position(&result), (2, 0));
    }

    #[test]
    fn test_vertical_flip() {
        let opts = ProcessingOptions {
            flip_vertical: true,
            ..Default::default()
        };
        let result = apply(&marked(), &opts).unwrap().unwrap();
        assert_eq!(marker_position(&result), (0, 1));
    }

    #[test]
    fn test_both_axes() {
        let opts = ProcessingOptions {
            flip_horizontal: true,
            flip_vertical: true,
            ..Default::default()
        };
        let result = apply(&marked(), &opts).unwrap().unwrap();
        assert_eq!(marker_position(&result), (2, 1));
    }

    #[test]
    fn test_no_flip_is_noop() {
        assert!(apply(&marked(), &ProcessingOptions::default())
            .unwrap()
            .is_none());
    }
}
