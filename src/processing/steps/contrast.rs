use super::{clahe, color};
use crate::backend::{Capabilities, Equalizer};
use crate::buffer::Mat;
use crate::error::LabError;
use crate::processing::options::{EqualizationMode, ProcessingOptions};
use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;

/// Contrast stage: exactly one of color CLAHE, CLAHE, global equalization or
/// plain grayscale, in that priority order
pub fn apply(
    buffer: &Mat,
    options: &ProcessingOptions,
    capabilities: Capabilities,
) -> Result<Option<Mat>, LabError> {
    let image = buffer.image()?;
    let equalizer = capabilities.equalizer();

    let result = match options.equalization_mode() {
        EqualizationMode::ColorClahe => color_clahe(image, options, equalizer)?,
        EqualizationMode::Clahe => DynamicImage::ImageLuma8(equalize_plane(
            &image.to_luma8(),
            options,
            equalizer,
        )?),
        EqualizationMode::Histogram => {
            DynamicImage::ImageLuma8(equalize_histogram(&image.to_luma8()))
        }
        EqualizationMode::None if options.grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
        EqualizationMode::None => return Ok(None),
    };

    Ok(Some(buffer.derive(result)))
}

/// Equalize the luminance channel only, leaving chrominance untouched
pub fn color_clahe(
    image: &DynamicImage,
    options: &ProcessingOptions,
    equalizer: Equalizer,
) -> Result<DynamicImage, LabError> {
    let [luma, cr, cb] = color::to_ycrcb(&image.to_rgb8());
    let luma = equalize_plane(&luma, options, equalizer)?;
    Ok(DynamicImage::ImageRgb8(color::from_ycrcb(&[luma, cr, cb])))
}

/// CLAHE when the runtime supports it, global equalization otherwise
fn equalize_plane(
    plane: &GrayImage,
    options: &ProcessingOptions,
    equalizer: Equalizer,
) -> Result<GrayImage, LabError> {
    match equalizer {
        Equalizer::Adaptive => clahe::apply(plane, options.clahe_clip_limit, options.clahe_tile_size),
        Equalizer::Global => {
            tracing::debug!("Adaptive equalization unavailable, using global equalization");
            Ok(equalize_histogram(plane))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn options(mode: EqualizationMode) -> ProcessingOptions {
        ProcessingOptions::default().with_equalization(mode)
    }

    #[test]
    fn test_no_contrast_options_is_noop() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let result = apply(&mat, &ProcessingOptions::default(), Capabilities::full()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_grayscale_alone_converts() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let opts = ProcessingOptions {
            grayscale: true,
            ..Default::default()
        };
        let result = apply(&mat, &opts, Capabilities::full()).unwrap().unwrap();
        assert_eq!(result.channels().unwrap(), 1);
    }

    #[test]
    fn test_clahe_demotes_color_to_gray() {
        let mat = Mat::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            16,
            16,
            Rgb([200, 10, 10]),
        )));
        let result = apply(&mat, &options(EqualizationMode::Clahe), Capabilities::full())
            .unwrap()
            .unwrap();
        assert_eq!(result.channels().unwrap(), 1);
    }

    #[test]
    fn test_color_clahe_promotes_gray_to_color() {
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([(x * 8) as u8]));
        let mat = Mat::new(DynamicImage::ImageLuma8(img));
        let result = apply(&mat, &options(EqualizationMode::ColorClahe), Capabilities::full())
            .unwrap()
            .unwrap();
        assert_eq!(result.channels().unwrap(), 3);
    }

    #[test]
    fn test_histogram_equalization_forces_gray() {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 50]));
        let mat = Mat::new(DynamicImage::ImageRgb8(img));
        let result = apply(&mat, &options(EqualizationMode::Histogram), Capabilities::full())
            .unwrap()
            .unwrap();
        assert_eq!(result.channels().unwrap(), 1);
    }

    #[test]
    fn test_clahe_without_support_matches_global_equalization() {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([60 + ((x * y) % 40) as u8]));
        let mat = Mat::new(DynamicImage::ImageLuma8(img.clone()));
        let caps = Capabilities {
            adaptive_equalization: false,
        };

        let result = apply(&mat, &options(EqualizationMode::Clahe), caps)
            .unwrap()
            .unwrap();

        assert_eq!(result.image().unwrap().to_luma8(), equalize_histogram(&img));
    }
}
