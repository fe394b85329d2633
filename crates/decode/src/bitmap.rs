//! Decoded bitmap payload
//!
//! [`Bitmap`] is the unit stored by the image cache: an owned pixel buffer
//! plus dimensions and pixel format. Rotation and alpha stripping operate
//! directly on the buffer so that both the standard decode path and raw
//! decoder output (which may arrive in BGRA order) share one code path.

/// Pixel layout of a decoded bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel, red first
    Rgb8,

    /// 4 bytes per pixel, red first, alpha last
    Rgba8,

    /// 4 bytes per pixel, blue first, alpha last
    Bgra8,
}

impl PixelFormat {
    /// Bytes occupied by one pixel in this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }

    /// Whether the format carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::Rgba8 | PixelFormat::Bgra8)
    }
}

/// An owned, decoded bitmap ready for display.
///
/// Invariant: `pixels.len() == width * height * format.bytes_per_pixel()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Pixel layout of `pixels`
    pub format: PixelFormat,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Raw pixel data in row-major order
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Create a new bitmap.
    ///
    /// # Panics
    ///
    /// Panics if the buffer length does not match the dimensions; a
    /// mismatched buffer is a programming error, not a decode failure.
    pub fn new(format: PixelFormat, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        assert_eq!(
            pixels.len(),
            expected,
            "bitmap buffer length {} does not match {}x{} {:?}",
            pixels.len(),
            width,
            height,
            format
        );
        Self {
            format,
            width,
            height,
            pixels,
        }
    }

    /// Memory footprint of the pixel buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }

    /// Return a copy rotated clockwise by `quarter_turns` * 90 degrees.
    ///
    /// 1 and 3 quarter turns swap the output dimensions. 0 returns an
    /// unmodified copy. Values are taken modulo 4.
    pub fn rotated(&self, quarter_turns: u8) -> Bitmap {
        match quarter_turns % 4 {
            0 => self.clone(),
            1 => self.rotate_quarter(true),
            2 => self.rotate_half(),
            3 => self.rotate_quarter(false),
            _ => unreachable!(),
        }
    }

    /// 90-degree rotation, clockwise when `cw` is true.
    fn rotate_quarter(&self, cw: bool) -> Bitmap {
        let bpp = self.format.bytes_per_pixel();
        let (w, h) = (self.width as usize, self.height as usize);
        let (dw, dh) = (h, w);
        let mut out = vec![0u8; self.pixels.len()];

        for yd in 0..dh {
            for xd in 0..dw {
                let (xs, ys) = if cw {
                    // src (0,0) lands in the top-right corner
                    (yd, h - 1 - xd)
                } else {
                    // src (0,0) lands in the bottom-left corner
                    (w - 1 - yd, xd)
                };
                let src = (ys * w + xs) * bpp;
                let dst = (yd * dw + xd) * bpp;
                out[dst..dst + bpp].copy_from_slice(&self.pixels[src..src + bpp]);
            }
        }

        Bitmap::new(self.format, dh as u32, dw as u32, out)
    }

    fn rotate_half(&self) -> Bitmap {
        let bpp = self.format.bytes_per_pixel();
        let (w, h) = (self.width as usize, self.height as usize);
        let mut out = vec![0u8; self.pixels.len()];

        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * bpp;
                let dst = ((h - 1 - y) * w + (w - 1 - x)) * bpp;
                out[dst..dst + bpp].copy_from_slice(&self.pixels[src..src + bpp]);
            }
        }

        Bitmap::new(self.format, self.width, self.height, out)
    }

    /// Convert a 4-byte-per-pixel bitmap to [`PixelFormat::Rgb8`], dropping
    /// the alpha channel.
    ///
    /// The conversion copies row by row and honors the source byte order
    /// (RGBA and BGRA both produce RGB output). A bitmap that is already
    /// 3 bytes per pixel is returned unchanged.
    pub fn strip_alpha(self) -> Bitmap {
        let (r_off, b_off) = match self.format {
            PixelFormat::Rgb8 => return self,
            PixelFormat::Rgba8 => (0usize, 2usize),
            PixelFormat::Bgra8 => (2usize, 0usize),
        };

        let w = self.width as usize;
        let h = self.height as usize;
        let src_stride = w * 4;
        let mut out = Vec::with_capacity(w * h * 3);

        for y in 0..h {
            let row = &self.pixels[y * src_stride..(y + 1) * src_stride];
            for px in row.chunks_exact(4) {
                out.push(px[r_off]);
                out.push(px[1]);
                out.push(px[b_off]);
            }
        }

        Bitmap::new(PixelFormat::Rgb8, self.width, self.height, out)
    }

    /// Read one pixel as `(r, g, b)`, regardless of storage format.
    ///
    /// Test and diagnostics helper; display code reads the buffer directly.
    pub fn pixel_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.pixels[idx..idx + bpp];
        match self.format {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => (px[0], px[1], px[2]),
            PixelFormat::Bgra8 => (px[2], px[1], px[0]),
        }
    }
}
