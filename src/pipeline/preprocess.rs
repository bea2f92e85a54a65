//! Image preprocessing: raw upload bytes → normalized classifier input.
//!
//! Steps: validate bytes → decode → EXIF orientation fix → RGB → aspect-fit
//! resize + pad → per-channel mean/std normalization into a CHW tensor.
//!
//! Orientation correction is a correctness requirement, not a nicety: a
//! sideways face silently degrades the classifier without raising anything,
//! so the fix is an explicit, separately testable step that always runs
//! before resizing. Everything here is deterministic — same bytes, same
//! parameters, bit-identical tensor.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array3;
use tracing::debug;

use super::classifier::{CHANNEL_MEAN, CHANNEL_STD, INPUT_SIZE};
use super::GradeError;

/// Maximum input size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Inputs larger than this on either axis are pre-downscaled before the
/// final resize (avoids OOM on high-resolution phone photos).
const MAX_INPUT_DIMENSION: u32 = 4096;

/// Fixed numeric input for one classifier evaluation.
///
/// Derived deterministically from the raw bytes; the tensor is CHW,
/// `3 × INPUT_SIZE × INPUT_SIZE`, normalized with the checkpoint's
/// per-channel constants.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub tensor: Array3<f32>,
    /// Dimensions before any processing (post-orientation).
    pub original_width: u32,
    pub original_height: u32,
    /// Face content area within the padded square canvas.
    pub content_width: u32,
    pub content_height: u32,
}

// ═══════════════════════════════════════════════════════════
// Orientation correction
// ═══════════════════════════════════════════════════════════

/// Fixes image orientation from EXIF metadata.
///
/// Phone photos embed rotation in EXIF tag 0x0112 — without correction,
/// portrait photos appear sideways to the classifier.
pub trait OrientationCorrector: Send + Sync {
    /// Correct image orientation based on EXIF metadata.
    ///
    /// `raw_bytes`: original file bytes (needed for EXIF reading).
    /// `image`: decoded image (rotation applied here).
    /// Returns the corrected image. No-op if no EXIF or orientation=1.
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage;
}

/// EXIF-based orientation correction.
///
/// EXIF orientation values:
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub struct ExifOrientationCorrector;

impl OrientationCorrector for ExifOrientationCorrector {
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        let orientation = read_exif_orientation(raw_bytes);
        if orientation != 1 {
            debug!(orientation, "Applying EXIF orientation fix");
        }
        apply_orientation(image, orientation)
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// No-op orientation corrector — returns image unchanged.
/// Use when the caller has already rotated the image upright.
pub struct NoOpOrientationCorrector;

impl OrientationCorrector for NoOpOrientationCorrector {
    fn correct(&self, _raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        image
    }
}

// ═══════════════════════════════════════════════════════════
// Preprocessor
// ═══════════════════════════════════════════════════════════

/// Decodes, orients, and normalizes one uploaded photo for the classifier.
///
/// Pure bytes-to-tensor transform — no I/O, no model calls, fully testable.
/// Aspect ratio is always preserved: the face is fit inside the square
/// canvas and the remainder padded black, never stretched.
pub struct Preprocessor {
    orientation: Box<dyn OrientationCorrector>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Production preprocessor with EXIF orientation correction.
    pub fn new() -> Self {
        Self {
            orientation: Box::new(ExifOrientationCorrector),
        }
    }

    /// Swap the orientation step (e.g. `NoOpOrientationCorrector` for
    /// pre-rotated input).
    pub fn with_orientation(orientation: Box<dyn OrientationCorrector>) -> Self {
        Self { orientation }
    }

    /// Full preprocessing: raw bytes → [`NormalizedInput`].
    ///
    /// Fails with [`GradeError::InvalidImage`] when the bytes cannot be
    /// decoded or the decoded image has zero area.
    pub fn prepare(&self, image_bytes: &[u8]) -> Result<NormalizedInput, GradeError> {
        validate_image_bytes(image_bytes)?;

        let img = image::load_from_memory(image_bytes)
            .map_err(|e| GradeError::InvalidImage(format!("failed to decode image: {e}")))?;

        let img = self.orientation.correct(image_bytes, img);

        let (orig_w, orig_h) = img.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(GradeError::InvalidImage("decoded image has zero area".into()));
        }

        let rgb = img.to_rgb8();
        let working = pre_downscale(&rgb, MAX_INPUT_DIMENSION);

        // Aspect-ratio-preserving fit onto the square canvas
        let (content_w, content_h) =
            compute_fit_dimensions(working.width(), working.height(), INPUT_SIZE);
        let resized =
            image::imageops::resize(&*working, content_w, content_h, FilterType::CatmullRom);

        let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([0, 0, 0]));
        let offset_x = (INPUT_SIZE - content_w) / 2;
        let offset_y = (INPUT_SIZE - content_h) / 2;
        image::imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

        let tensor = to_normalized_tensor(&canvas);

        debug!(
            original = format!("{orig_w}x{orig_h}"),
            content = format!("{content_w}x{content_h}"),
            output = format!("{INPUT_SIZE}x{INPUT_SIZE}"),
            "Image preprocessed for classifier"
        );

        Ok(NormalizedInput {
            tensor,
            original_width: orig_w,
            original_height: orig_h,
            content_width: content_w,
            content_height: content_h,
        })
    }
}

/// Byte-level sanity bounds before attempting a decode.
fn validate_image_bytes(bytes: &[u8]) -> Result<(), GradeError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(GradeError::InvalidImage(format!(
            "{} bytes is too small to be an image",
            bytes.len()
        )));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(GradeError::InvalidImage(format!(
            "{} bytes exceeds the {MAX_IMAGE_BYTES} byte limit",
            bytes.len()
        )));
    }
    Ok(())
}

/// Scale-to-fit dimensions preserving aspect ratio, never exceeding
/// `target` on either axis, never zero.
pub fn compute_fit_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = (target as f64 / width as f64).min(target as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, target);
    let h = ((height as f64 * scale).round() as u32).clamp(1, target);
    (w, h)
}

/// Pre-downscale guard for oversized images (avoids OOM on the quality
/// resize). Returns a borrowed image when no downscale is needed.
fn pre_downscale(image: &RgbImage, max_dimension: u32) -> std::borrow::Cow<'_, RgbImage> {
    let (w, h) = (image.width(), image.height());
    if w <= max_dimension && h <= max_dimension {
        return std::borrow::Cow::Borrowed(image);
    }

    let (new_w, new_h) = compute_fit_dimensions(w, h, max_dimension);
    debug!(from = format!("{w}x{h}"), to = format!("{new_w}x{new_h}"), "Pre-downscaling oversized input");
    std::borrow::Cow::Owned(image::imageops::resize(
        image,
        new_w,
        new_h,
        FilterType::Triangle,
    ))
}

/// Encode an `INPUT_SIZE²` RGB canvas as a CHW f32 tensor, scaled to [0,1]
/// then centered with the checkpoint's per-channel mean/std.
pub fn to_normalized_tensor(canvas: &RgbImage) -> Array3<f32> {
    let size = INPUT_SIZE as usize;
    let mut tensor = Array3::<f32>::zeros((3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            let scaled = pixel.0[c] as f32 / 255.0;
            tensor[[c, y as usize, x as usize]] = (scaled - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }
    tensor
}
