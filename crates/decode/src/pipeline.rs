//! Decode pipeline
//!
//! Turns an [`ImageFile`] into a ready-to-display [`Bitmap`]:
//!
//! 1. Raw-extension files route to the pluggable [`RawDecoder`]; all other
//!    files decode through the `image` crate with format guessing.
//! 2. Zero-dimension results are rejected.
//! 3. The EXIF orientation is read from the [`MetadataProvider`] (default
//!    1 on any metadata failure) and its rotation component applied.
//!    Mirror components are deliberately not applied.
//! 4. When alpha stripping is enabled, 4-byte-per-pixel output is
//!    converted to RGB row by row.
//!
//! Errors never escape as panics; every failure maps to a [`DecodeError`].

use crate::bitmap::{Bitmap, PixelFormat};
use crate::raw::{is_raw_extension, NoRawDecoder, RawDecoder};
use crate::source::{ImageFile, MetadataProvider, NoMetadata};
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use thiserror::Error;

/// Failure modes of the decode pipeline.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the file contents failed.
    #[error("failed to read image file: {0}")]
    Io(#[from] io::Error),

    /// The standard decoder rejected the data.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// The decoded image has a zero dimension.
    #[error("decoded image has invalid dimensions {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// The file has a raw extension but no raw codec is installed, or the
    /// installed codec failed.
    #[error("raw format is not supported for '{name}'")]
    UnsupportedRaw { name: String },
}

/// Image decode pipeline with orientation correction and alpha stripping.
///
/// # Example
///
/// ```no_run
/// use photo_viewer_decode::{DecodePipeline, DiskImageFile};
///
/// let pipeline = DecodePipeline::with_defaults();
/// let bitmap = pipeline.decode(&DiskImageFile::new("photo.jpg"))?;
/// assert!(bitmap.width > 0);
/// # Ok::<(), photo_viewer_decode::DecodeError>(())
/// ```
pub struct DecodePipeline {
    raw: Arc<dyn RawDecoder>,
    metadata: Arc<dyn MetadataProvider>,
    strip_alpha: bool,
}

impl DecodePipeline {
    /// Create a pipeline with explicit collaborators.
    pub fn new(
        raw: Arc<dyn RawDecoder>,
        metadata: Arc<dyn MetadataProvider>,
        strip_alpha: bool,
    ) -> Self {
        Self {
            raw,
            metadata,
            strip_alpha,
        }
    }

    /// Pipeline with no raw codec, no metadata reader, alpha stripping on.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(NoRawDecoder), Arc::new(NoMetadata), true)
    }

    /// Whether alpha stripping is enabled.
    pub fn strips_alpha(&self) -> bool {
        self.strip_alpha
    }

    /// Decode the full-size image for `file`.
    pub fn decode(&self, file: &dyn ImageFile) -> Result<Bitmap, DecodeError> {
        let bitmap = if is_raw_extension(file.path()) {
            self.decode_raw(file)?
        } else {
            self.decode_standard(file)?
        };
        self.finish(file, bitmap)
    }

    /// Decode a reduced-size preview with the longest edge at most `max_px`.
    pub fn decode_thumbnail(&self, file: &dyn ImageFile, max_px: u32) -> Result<Bitmap, DecodeError> {
        let bitmap = if is_raw_extension(file.path()) {
            if !self.raw.is_supported() {
                return Err(DecodeError::UnsupportedRaw {
                    name: file.name().to_string(),
                });
            }
            self.raw
                .decode_thumbnail(file, max_px)
                .ok_or_else(|| DecodeError::UnsupportedRaw {
                    name: file.name().to_string(),
                })?
        } else {
            let img = self.read_image(file)?;
            let (w, h) = (img.width(), img.height());
            if w == 0 || h == 0 {
                return Err(DecodeError::EmptyImage {
                    width: w,
                    height: h,
                });
            }
            let scaled = if w > max_px || h > max_px {
                // thumbnail() preserves aspect ratio within the bounding box
                img.thumbnail(max_px, max_px).into_rgba8()
            } else {
                img.into_rgba8()
            };
            let (sw, sh) = scaled.dimensions();
            Bitmap::new(PixelFormat::Rgba8, sw, sh, scaled.into_raw())
        };
        self.finish(file, bitmap)
    }

    /// Orientation correction and alpha stripping shared by both paths.
    ///
    /// The pre-rotation buffer is dropped here once the rotated copy
    /// exists; the resource is released exactly once.
    fn finish(&self, file: &dyn ImageFile, bitmap: Bitmap) -> Result<Bitmap, DecodeError> {
        if bitmap.width == 0 || bitmap.height == 0 {
            return Err(DecodeError::EmptyImage {
                width: bitmap.width,
                height: bitmap.height,
            });
        }

        let orientation = self.metadata.orientation(file);
        let turns = orientation.rotation_quarter_turns();
        let rotated = if turns == 0 {
            bitmap
        } else {
            log::debug!(
                "rotating '{}' by {} quarter turns (orientation {})",
                file.name(),
                turns,
                orientation.code()
            );
            bitmap.rotated(turns)
        };

        if self.strip_alpha && rotated.format.has_alpha() {
            Ok(rotated.strip_alpha())
        } else {
            Ok(rotated)
        }
    }

    fn decode_raw(&self, file: &dyn ImageFile) -> Result<Bitmap, DecodeError> {
        if !self.raw.is_supported() {
            return Err(DecodeError::UnsupportedRaw {
                name: file.name().to_string(),
            });
        }
        self.raw
            .decode(file)
            .ok_or_else(|| DecodeError::UnsupportedRaw {
                name: file.name().to_string(),
            })
    }

    fn decode_standard(&self, file: &dyn ImageFile) -> Result<Bitmap, DecodeError> {
        let img = self.read_image(file)?;
        let (w, h) = (img.width(), img.height());
        if w == 0 || h == 0 {
            return Err(DecodeError::EmptyImage {
                width: w,
                height: h,
            });
        }
        let rgba = img.into_rgba8();
        Ok(Bitmap::new(PixelFormat::Rgba8, w, h, rgba.into_raw()))
    }

    fn read_image(&self, file: &dyn ImageFile) -> Result<image::DynamicImage, DecodeError> {
        let mut data = Vec::new();
        file.open_read()?.read_to_end(&mut data)?;
        let reader = image::ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        Ok(reader.decode()?)
    }
}
