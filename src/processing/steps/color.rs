//! Channel plumbing: plane split/merge and the Y-Cr-Cb round trip

use crate::error::LabError;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage, RgbaImage};

/// Split a buffer into one gray plane per channel
pub fn split(image: &DynamicImage) -> Result<Vec<GrayImage>, LabError> {
    let (width, height) = image.dimensions();
    let channels = image.color().channel_count() as usize;
    let raw = image.as_bytes();

    (0..channels)
        .map(|c| {
            let plane: Vec<u8> = raw.iter().skip(c).step_by(channels).copied().collect();
            GrayImage::from_raw(width, height, plane)
                .ok_or_else(|| LabError::Internal("plane size mismatch".to_string()))
        })
        .collect()
}

/// Interleave 1, 3 or 4 equally sized planes back into a buffer
pub fn merge(planes: &[GrayImage]) -> Result<DynamicImage, LabError> {
    let first = planes
        .first()
        .ok_or_else(|| LabError::Internal("no planes to merge".to_string()))?;
    let (width, height) = first.dimensions();
    if planes.iter().any(|p| p.dimensions() != (width, height)) {
        return Err(LabError::Internal("planes differ in size".to_string()));
    }

    let n = planes.len();
    let mut raw = vec![0u8; width as usize * height as usize * n];
    for (c, plane) in planes.iter().enumerate() {
        for (i, value) in plane.as_raw().iter().enumerate() {
            raw[i * n + c] = *value;
        }
    }

    let mismatch = || LabError::Internal("merged buffer size mismatch".to_string());
    match n {
        1 => Ok(DynamicImage::ImageLuma8(
            GrayImage::from_raw(width, height, raw).ok_or_else(mismatch)?,
        )),
        3 => Ok(DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, raw).ok_or_else(mismatch)?,
        )),
        4 => Ok(DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, raw).ok_or_else(mismatch)?,
        )),
        other => Err(LabError::Internal(format!(
            "cannot merge {} planes",
            other
        ))),
    }
}

/// Apply a single-plane operation to every channel
pub fn map_planes<F>(image: &DynamicImage, f: F) -> Result<DynamicImage, LabError>
where
    F: Fn(&GrayImage) -> GrayImage,
{
    if let DynamicImage::ImageLuma8(gray) = image {
        return Ok(DynamicImage::ImageLuma8(f(gray)));
    }
    let planes: Vec<GrayImage> = split(image)?.iter().map(f).collect();
    merge(&planes)
}

/// RGB to Y, Cr, Cb planes (BT.601, chroma offset 128)
pub fn to_ycrcb(image: &RgbImage) -> [GrayImage; 3] {
    let (width, height) = image.dimensions();
    let mut y_plane = GrayImage::new(width, height);
    let mut cr_plane = GrayImage::new(width, height);
    let mut cb_plane = GrayImage::new(width, height);

    for (x, y, Rgb([r, g, b])) in image.enumerate_pixels() {
        let (r, g, b) = (*r as f32, *g as f32, *b as f32);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let cr = (r - luma) * 0.713 + 128.0;
        let cb = (b - luma) * 0.564 + 128.0;
        y_plane.put_pixel(x, y, Luma([saturate(luma)]));
        cr_plane.put_pixel(x, y, Luma([saturate(cr)]));
        cb_plane.put_pixel(x, y, Luma([saturate(cb)]));
    }

    [y_plane, cr_plane, cb_plane]
}

/// Y, Cr, Cb planes back to RGB
pub fn from_ycrcb(planes: &[GrayImage; 3]) -> RgbImage {
    let [y_plane, cr_plane, cb_plane] = planes;
    RgbImage::from_fn(y_plane.width(), y_plane.height(), |x, y| {
        let luma = y_plane.get_pixel(x, y).0[0] as f32;
        let cr = cr_plane.get_pixel(x, y).0[0] as f32 - 128.0;
        let cb = cb_plane.get_pixel(x, y).0[0] as f32 - 128.0;
        Rgb([
            saturate(luma + 1.403 * cr),
            saturate(luma - 0.714 * cr - 0.344 * cb),
            saturate(luma + 1.773 * cb),
        ])
    })
}

fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
