//! File handle and metadata collaborator traits
//!
//! The decode pipeline and the cache consume files and EXIF metadata
//! through these traits rather than touching the filesystem or a metadata
//! library directly. [`DiskImageFile`] is the production file handle;
//! tests substitute in-memory implementations.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A readable image file.
///
/// Implementations must be cheap to clone behind an `Arc`; `open_read` is
/// called once per decode attempt.
pub trait ImageFile: Send + Sync {
    /// Open the file contents for reading.
    fn open_read(&self) -> io::Result<Box<dyn Read + Send>>;

    /// File name including extension.
    fn name(&self) -> &str;

    /// Full path; used as the cache key after normalization.
    fn path(&self) -> &Path;
}

/// [`ImageFile`] backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskImageFile {
    path: PathBuf,
    name: String,
}

impl DiskImageFile {
    /// Create a handle for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

impl ImageFile for DiskImageFile {
    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// EXIF orientation code, 1..=8.
///
/// Only the rotation component is honored by the pipeline; the mirror
/// component of codes 2, 4, 5 and 7 is intentionally ignored (known
/// limitation carried over from the original behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation(u16);

impl Orientation {
    /// Identity orientation (no rotation).
    pub const NORMAL: Orientation = Orientation(1);

    /// Create from an EXIF code; anything outside 1..=8 normalizes to 1.
    pub fn from_exif(code: u16) -> Self {
        if (1..=8).contains(&code) {
            Orientation(code)
        } else {
            Orientation(1)
        }
    }

    /// The raw EXIF code.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Clockwise quarter turns implied by this orientation.
    ///
    /// Rotation component only: 3/4 rotate 180, 6/7 rotate 90, 5/8
    /// rotate 270, 1/2 do not rotate.
    pub fn rotation_quarter_turns(&self) -> u8 {
        match self.0 {
            3 | 4 => 2,
            6 | 7 => 1,
            5 | 8 => 3,
            _ => 0,
        }
    }

    /// Whether applying this orientation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        self.rotation_quarter_turns() % 2 == 1
    }
}

/// Cheap metadata lookups consumed by the pipeline and the size estimator.
///
/// Both methods must degrade rather than fail: a broken or absent EXIF
/// block yields the default orientation and no dimensions.
pub trait MetadataProvider: Send + Sync {
    /// EXIF orientation for the file; 1 on any failure.
    fn orientation(&self, file: &dyn ImageFile) -> Orientation;

    /// Pixel dimensions if obtainable without a full decode.
    fn dimensions(&self, file: &dyn ImageFile) -> Option<(u32, u32)>;
}

/// Metadata provider that reports nothing.
///
/// Default collaborator when no EXIF reader is installed; every file
/// decodes with orientation 1 and the size estimator falls back to cache
/// averages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn orientation(&self, _file: &dyn ImageFile) -> Orientation {
        Orientation::NORMAL
    }

    fn dimensions(&self, _file: &dyn ImageFile) -> Option<(u32, u32)> {
        None
    }
}
