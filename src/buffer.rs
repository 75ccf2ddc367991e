//! Owned pixel buffers and their release discipline
//!
//! Every transformation that is not a no-op allocates a new [`Mat`]; whoever
//! replaces a buffer releases the old one. Release is idempotent and never
//! fails, and `Drop` releases as well so error paths cannot leak.

use crate::error::LabError;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

static GLOBAL_LEDGER: LazyLock<Arc<BufferLedger>> =
    LazyLock::new(|| Arc::new(BufferLedger::default()));

/// Counts buffer allocations and releases
#[derive(Debug, Default)]
pub struct BufferLedger {
    allocated: AtomicU64,
    released: AtomicU64,
}

impl BufferLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Ledger shared by buffers created without an explicit one
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_LEDGER)
    }

    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Buffers allocated and not yet released
    pub fn live(&self) -> u64 {
        self.allocated().saturating_sub(self.released())
    }
}

/// An 8-bit pixel buffer with 1, 3 or 4 channels
#[derive(Debug)]
pub struct Mat {
    image: Option<DynamicImage>,
    ledger: Arc<BufferLedger>,
}

impl Mat {
    pub fn new(image: DynamicImage) -> Self {
        Self::with_ledger(image, BufferLedger::global())
    }

    pub fn with_ledger(image: DynamicImage, ledger: Arc<BufferLedger>) -> Self {
        ledger.allocated.fetch_add(1, Ordering::Relaxed);
        Self {
            image: Some(to_8bit(image)),
            ledger,
        }
    }

    /// Decode an encoded raster image (PNG, JPEG, ...) into a new buffer
    pub fn decode(bytes: &[u8], ledger: Arc<BufferLedger>) -> Result<Self, LabError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| LabError::DecodeError(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(LabError::DecodeError("image has no pixels".to_string()));
        }
        Ok(Self::with_ledger(image, ledger))
    }

    /// Allocate a buffer in the same ledger as `self`
    pub fn derive(&self, image: DynamicImage) -> Self {
        Self::with_ledger(image, Arc::clone(&self.ledger))
    }

    pub fn try_clone(&self) -> Result<Self, LabError> {
        Ok(self.derive(self.image()?.clone()))
    }

    pub fn image(&self) -> Result<&DynamicImage, LabError> {
        self.image.as_ref().ok_or(LabError::BufferReleased)
    }

    pub fn dimensions(&self) -> Result<(u32, u32), LabError> {
        Ok(self.image()?.dimensions())
    }

    pub fn channels(&self) -> Result<u8, LabError> {
        Ok(self.image()?.color().channel_count())
    }

    pub fn ledger(&self) -> &Arc<BufferLedger> {
        &self.ledger
    }

    pub fn is_released(&self) -> bool {
        self.image.is_none()
    }

    /// Free the pixel data. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.image.take().is_some() {
            self.ledger.released.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, LabError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image()?
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| LabError::Internal(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes.into_inner())
    }
}

impl Drop for Mat {
    fn drop(&mut self) {
        self.release();
    }
}

/// Best-effort release of an optional buffer.
///
/// Absent and already-released buffers are accepted; nothing is ever
/// reported to the caller.
pub fn release(buffer: Option<&mut Mat>) {
    match buffer {
        Some(mat) if !mat.is_released() => {
            mat.release();
            tracing::debug!("Released pixel buffer, {} live", mat.ledger.live());
        }
        Some(_) => tracing::debug!("Skipping release of an already released buffer"),
        None => {}
    }
}

/// Reduce any decoded image to Luma8, Rgb8 or Rgba8
fn to_8bit(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            image
        }
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}
