use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::ProcessingOptions;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny as canny_edges;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Gradient magnitude as `0.5 * |Gx| + 0.5 * |Gy|`, each term saturated to 8 bits first
pub fn sobel(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.sobel {
        return Ok(None);
    }

    let gray = buffer.image()?.to_luma8();
    let gx = horizontal_sobel(&gray);
    let gy = vertical_sobel(&gray);

    let magnitude = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let ax = (gx.get_pixel(x, y).0[0] as i32).abs().min(255) as f32;
        let ay = (gy.get_pixel(x, y).0[0] as i32).abs().min(255) as f32;
        Luma([(0.5 * ax + 0.5 * ay).round() as u8])
    });

    Ok(Some(buffer.derive(DynamicImage::ImageLuma8(magnitude))))
}

/// Canny edge map; swapped thresholds are put back in order
pub fn canny(buffer: &Mat, options: &ProcessingOptions) -> Result<Option<Mat>, LabError> {
    if !options.canny {
        return Ok(None);
    }

    let (low, high) = if options.canny_low <= options.canny_high {
        (options.canny_low, options.canny_high)
    } else {
        (options.canny_high, options.canny_low)
    };

    let gray = buffer.image()?.to_luma8();
    let edges = canny_edges(&gray, low, high);
    Ok(Some(buffer.derive(DynamicImage::ImageLuma8(edges))))
}
