//! Photo Viewer Decode Library
//!
//! Image decode pipeline with EXIF-driven orientation correction and
//! optional alpha stripping.
//!
//! The pipeline turns a file handle into a ready-to-display [`Bitmap`].
//! Camera raw formats are routed to a pluggable [`RawDecoder`]; everything
//! else goes through the standard decode path. Orientation codes are read
//! from a [`MetadataProvider`] collaborator and only the rotation component
//! is applied (mirroring codes are a documented limitation).
//!
//! # Example
//!
//! ```no_run
//! use photo_viewer_decode::{DecodePipeline, DiskImageFile};
//!
//! let pipeline = DecodePipeline::with_defaults();
//! let file = DiskImageFile::new("photo.jpg");
//!
//! match pipeline.decode(&file) {
//!     Ok(bitmap) => println!("Decoded {}x{}", bitmap.width, bitmap.height),
//!     Err(err) => eprintln!("Decode failed: {}", err),
//! }
//! ```

mod bitmap;
mod pipeline;
mod raw;
mod source;

pub use bitmap::{Bitmap, PixelFormat};
pub use pipeline::{DecodeError, DecodePipeline};
pub use raw::{is_raw_extension, NoRawDecoder, RawDecoder, RAW_EXTENSIONS};
pub use source::{DiskImageFile, ImageFile, MetadataProvider, NoMetadata, Orientation};
