//! Pluggable camera-raw decoder
//!
//! Raw formats (CR2, NEF, ARW, ...) are decoded by an external plug-in
//! behind the [`RawDecoder`] trait. The pipeline queries `is_supported()`
//! and fails gracefully when no real decoder is installed, so the viewer
//! still works for standard formats without the raw codec present.

use crate::bitmap::Bitmap;
use crate::source::ImageFile;
use std::path::Path;

/// File extensions routed to the raw decoder (lowercase, no dot).
pub const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "nef", "arw", "dng", "raf", "orf", "rw2", "pef", "srw",
];

/// Check whether a path carries a recognized raw extension.
pub fn is_raw_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            RAW_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Decoder plug-in for camera raw formats.
///
/// `decode` and `decode_thumbnail` return `None` on any failure; the
/// pipeline converts that into a graceful decode error rather than a
/// crash.
pub trait RawDecoder: Send + Sync {
    /// Whether a real raw codec is installed.
    fn is_supported(&self) -> bool;

    /// Decode the full-size image.
    fn decode(&self, file: &dyn ImageFile) -> Option<Bitmap>;

    /// Decode a reduced-size preview with the longest edge at most
    /// `max_px` pixels.
    fn decode_thumbnail(&self, file: &dyn ImageFile, max_px: u32) -> Option<Bitmap>;
}

/// No-op raw decoder used when no plug-in is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRawDecoder;

impl RawDecoder for NoRawDecoder {
    fn is_supported(&self) -> bool {
        false
    }

    fn decode(&self, _file: &dyn ImageFile) -> Option<Bitmap> {
        None
    }

    fn decode_thumbnail(&self, _file: &dyn ImageFile, _max_px: u32) -> Option<Bitmap> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DiskImageFile;

    #[test]
    fn test_raw_extension_detection() {
        assert!(is_raw_extension(Path::new("shot.cr2")));
        assert!(is_raw_extension(Path::new("shot.NEF")));
        assert!(is_raw_extension(Path::new("/a/b/shot.dng")));
        assert!(!is_raw_extension(Path::new("shot.jpg")));
        assert!(!is_raw_extension(Path::new("shot")));
        assert!(!is_raw_extension(Path::new(".cr2"))); // hidden file, no extension
    }

    #[test]
    fn test_no_raw_decoder() {
        let decoder = NoRawDecoder;
        let file = DiskImageFile::new("shot.cr2");
        assert!(!decoder.is_supported());
        assert!(decoder.decode(&file).is_none());
        assert!(decoder.decode_thumbnail(&file, 256).is_none());
    }
}
