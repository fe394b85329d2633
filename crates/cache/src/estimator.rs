//! Pre-decode size estimation.
//!
//! Predicts the decoded memory footprint of a file so admission control
//! can run before the expensive decode. Estimation never fails; each
//! source degrades to the next fallback:
//!
//! 1. metadata pixel dimensions → `width * height * bytes_per_pixel`
//! 2. the average size of current cache entries
//! 3. a fixed, deliberately pessimistic constant (100 MiB by default)

use crate::config::CacheConfig;
use photo_viewer_decode::{ImageFile, MetadataProvider};

/// Estimate the decoded size of `file` in bytes.
///
/// `cache_average` is the current average entry size, if the cache holds
/// anything. Bytes per pixel follows the alpha-stripping setting: 3 when
/// stripping, 4 otherwise.
pub fn estimate_size(
    file: &dyn ImageFile,
    metadata: &dyn MetadataProvider,
    cache_average: Option<u64>,
    config: &CacheConfig,
) -> u64 {
    let bytes_per_pixel: u64 = if config.strip_alpha { 3 } else { 4 };

    if let Some((width, height)) = metadata.dimensions(file) {
        return width as u64 * height as u64 * bytes_per_pixel;
    }

    if let Some(average) = cache_average {
        return average;
    }

    config.fallback_estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_viewer_decode::Orientation;
    use std::io::{self, Read};
    use std::path::{Path, PathBuf};

    struct FakeFile(PathBuf);

    impl ImageFile for FakeFile {
        fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
            Err(io::Error::new(io::ErrorKind::Other, "not readable"))
        }

        fn name(&self) -> &str {
            "fake.jpg"
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    struct DimsProvider(Option<(u32, u32)>);

    impl MetadataProvider for DimsProvider {
        fn orientation(&self, _file: &dyn ImageFile) -> Orientation {
            Orientation::NORMAL
        }

        fn dimensions(&self, _file: &dyn ImageFile) -> Option<(u32, u32)> {
            self.0
        }
    }

    fn file() -> FakeFile {
        FakeFile(PathBuf::from("/photos/fake.jpg"))
    }

    #[test]
    fn test_dimensions_win() {
        let config = CacheConfig::default(); // strip_alpha = true
        let est = estimate_size(&file(), &DimsProvider(Some((100, 200))), Some(999), &config);
        assert_eq!(est, 100 * 200 * 3);
    }

    #[test]
    fn test_bytes_per_pixel_without_stripping() {
        let config = CacheConfig::default().with_strip_alpha(false);
        let est = estimate_size(&file(), &DimsProvider(Some((100, 200))), None, &config);
        assert_eq!(est, 100 * 200 * 4);
    }

    #[test]
    fn test_cache_average_fallback() {
        let config = CacheConfig::default();
        let est = estimate_size(&file(), &DimsProvider(None), Some(12_345), &config);
        assert_eq!(est, 12_345);
    }

    #[test]
    fn test_constant_fallback() {
        let config = CacheConfig::default();
        let est = estimate_size(&file(), &DimsProvider(None), None, &config);
        assert_eq!(est, 100 * 1024 * 1024);
    }
}
