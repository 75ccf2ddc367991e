//! Contrast-limited adaptive histogram equalization
//!
//! The image is divided into a `grid x grid` set of tiles (extended with
//! reflect-101 borders when the size is not a multiple of the grid). Each
//! tile gets a clipped-histogram lookup table and every pixel is mapped by
//! bilinear interpolation between the four nearest tile tables.

use crate::error::LabError;
use image::{GrayImage, Luma};

const HIST_SIZE: usize = 256;

pub fn apply(image: &GrayImage, clip_limit: f32, grid: u32) -> Result<GrayImage, LabError> {
    if grid == 0 {
        return Err(LabError::ProcessingError(
            "CLAHE tile grid must be at least 1x1".to_string(),
        ));
    }
    if !clip_limit.is_finite() || clip_limit <= 0.0 {
        return Err(LabError::ProcessingError(format!(
            "CLAHE clip limit must be positive, got {}",
            clip_limit
        )));
    }

    let (width, height) = (image.width() as usize, image.height() as usize);
    if width == 0 || height == 0 {
        return Ok(image.clone());
    }

    let grid = grid as usize;
    let tile_width = width.div_ceil(grid);
    let tile_height = height.div_ceil(grid);

    let luts: Vec<[u8; HIST_SIZE]> = (0..grid * grid)
        .map(|i| {
            let (tx, ty) = (i % grid, i / grid);
            tile_lut(image, tx * tile_width, ty * tile_height, tile_width, tile_height, clip_limit)
        })
        .collect();

    Ok(interpolate(image, &luts, grid, tile_width, tile_height))
}

/// Clipped, redistributed histogram of one tile turned into a lookup table
fn tile_lut(
    image: &GrayImage,
    x0: usize,
    y0: usize,
    tile_width: usize,
    tile_height: usize,
    clip_limit: f32,
) -> [u8; HIST_SIZE] {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let area = tile_width * tile_height;

    let mut hist = [0usize; HIST_SIZE];
    for y in y0..y0 + tile_height {
        let sy = reflect101(y, height) as u32;
        for x in x0..x0 + tile_width {
            let sx = reflect101(x, width) as u32;
            hist[image.get_pixel(sx, sy).0[0] as usize] += 1;
        }
    }

    let limit = ((clip_limit * area as f32 / HIST_SIZE as f32) as usize).max(1);
    let mut clipped = 0;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / HIST_SIZE;
    let mut residual = clipped % HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; HIST_SIZE];
    let mut sum = 0;
    for (entry, count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn interpolate(
    image: &GrayImage,
    luts: &[[u8; HIST_SIZE]],
    grid: usize,
    tile_width: usize,
    tile_height: usize,
) -> GrayImage {
    let last = grid as isize - 1;
    let neighbours = |coord: u32, tile: usize| {
        let f = coord as f32 / tile as f32 - 0.5;
        let t1 = f.floor() as isize;
        let weight = f - t1 as f32;
        let a = t1.clamp(0, last) as usize;
        let b = (t1 + 1).clamp(0, last) as usize;
        (a, b, weight)
    };

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let (tx1, tx2, xa) = neighbours(x, tile_width);
        let (ty1, ty2, ya) = neighbours(y, tile_height);
        let value = image.get_pixel(x, y).0[0] as usize;

        let at = |tx: usize, ty: usize| luts[ty * grid + tx][value] as f32;
        let top = (1.0 - xa) * at(tx1, ty1) + xa * at(tx2, ty1);
        let bottom = (1.0 - xa) * at(tx1, ty2) + xa * at(tx2, ty2);
        let mapped = (1.0 - ya) * top + ya * bottom;

        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Mirror an out-of-range coordinate back into `0..len` without repeating the edge
fn reflect101(i: usize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * len - 2;
    let r = i % period;
    if r >= len {
        period - r
    } else {
        r
    }
}
