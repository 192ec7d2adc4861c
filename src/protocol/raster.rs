//! # Monochrome Rasterization
//!
//! Converts RGBA pixel buffers into the packed 1-bit bitmaps that TSPL and
//! CPCL graphics commands carry.
//!
//! ## Binarization
//!
//! Each pixel is reduced to luminance with the Rec. 601 weights and compared
//! against a fixed cutoff:
//!
//! ```text
//! Y = 0.299 R + 0.587 G + 0.114 B
//! Y > 128  =>  blank (paper stays white)
//! Y <= 128 =>  printed (dot is burned)
//! ```
//!
//! Alpha is never sampled. There is no dithering; label content is line art,
//! QR codes and text, where a hard threshold is the right tool.
//!
//! ## Packing and Polarity
//!
//! Bits are packed 8 per byte, MSB first, row-major, each row padded to a
//! whole byte. The packed bit sense is TSPL's: `1` = blank, `0` = printed.
//! CPCL expects the opposite polarity, so for [`Dialect::Cpcl`] every packed
//! byte is bitwise complemented afterwards. The complement runs over whole
//! bytes, so a short row's padding bits flip to `1` as well; that is the
//! wire format the printers consume, not an artifact to correct.
//!
//! ```text
//! width = 12, all printed, TSPL:  00000000 0000[0000]   -> 0x00 0x00
//! width = 12, all printed, CPCL:  11111111 1111[1111]   -> 0xFF 0xFF
//! width = 12, all blank,   TSPL:  11111111 1111[0000]   -> 0xFF 0xF0
//! width = 12, all blank,   CPCL:  00000000 0000[1111]   -> 0x00 0x0F
//! ```
//!
//! ## Two Strategies, One Output
//!
//! [`rasterize`] accumulates bits directly into the output buffer;
//! [`rasterize_rowwise`] collects each row as a bit list and packs it with
//! [`pack_row`]. They must produce identical bytes for every input; the test
//! suite holds them in lockstep.

use thiserror::Error;

/// Which wire dialect the output is destined for.
///
/// The dialect decides command grammar and units in the builders, and raster
/// bit polarity here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// TSC-style label language. Set bit = blank, no complement.
    Tspl,
    /// Comtec/Zebra mobile language. Packed bytes are complemented.
    Cpcl,
}

impl Dialect {
    /// Whether packed raster bytes are bitwise complemented for this
    /// dialect.
    #[inline]
    pub fn inverts_raster(self) -> bool {
        matches!(self, Dialect::Cpcl)
    }
}

/// Luminance cutoff separating printed from blank dots.
pub const LUMINANCE_THRESHOLD: f32 = 128.0;

/// A pixel buffer's data length does not match its declared dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pixel data length {actual} does not match {width}x{height} RGBA")]
pub struct PixelBufferError {
    pub width: usize,
    pub height: usize,
    pub actual: usize,
}

/// A read-only view of caller-supplied RGBA pixels.
///
/// Four bytes per pixel (R, G, B, A interleaved), row-major, top-to-bottom.
/// The rasterizer never mutates the data.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::raster::PixelBuffer;
///
/// let pixels = vec![0u8; 16 * 8 * 4];
/// let image = PixelBuffer::new(16, 8, &pixels).unwrap();
/// assert_eq!(image.width_bytes(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: usize,
    height: usize,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Wrap raw RGBA bytes, checking that `data` holds exactly
    /// `width * height * 4` bytes.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, PixelBufferError> {
        if data.len() != width * height * 4 {
            return Err(PixelBufferError {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Packed row width in bytes, `ceil(width / 8)`.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8)
    }

    /// RGB channels of the pixel at (x, y); alpha is not sampled.
    #[inline]
    fn rgb(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let i = (y * self.width + x) * 4;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }
}

impl<'a> From<&'a image::RgbaImage> for PixelBuffer<'a> {
    fn from(img: &'a image::RgbaImage) -> Self {
        // ImageBuffer guarantees the length invariant
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw(),
        }
    }
}

/// A packed 1-bit bitmap produced by rasterization.
///
/// `bytes.len() == width_bytes * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonochromeBitmap {
    /// Row stride in bytes, `ceil(pixel width / 8)`.
    pub width_bytes: usize,
    /// Number of rows.
    pub height: usize,
    /// Packed rows, MSB first.
    pub bytes: Vec<u8>,
}

/// Perceptual luminance of an RGB pixel, 0.0 (black) to 255.0 (white).
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Whether a pixel stays blank (no dot burned).
#[inline]
pub fn is_blank(r: u8, g: u8, b: u8) -> bool {
    luminance(r, g, b) > LUMINANCE_THRESHOLD
}

/// Pack a row of bits into bytes, MSB first.
///
/// `true` sets the bit. Rows whose length is not a multiple of 8 are
/// zero-padded in the low bits of the final byte.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::raster::pack_row;
///
/// let row = [true, true, false, false, true, false, true, false];
/// assert_eq!(pack_row(&row), vec![0b1100_1010]);
///
/// // 12 bits pack into 2 bytes, low nibble padded
/// assert_eq!(pack_row(&[true; 12]), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (7 - i % 8);
        }
    }
    bytes
}

/// Convert an RGBA pixel buffer into a packed monochrome bitmap.
///
/// Accumulates bits directly into the output buffer. This is the strategy
/// the dialect builders call.
pub fn rasterize(image: &PixelBuffer<'_>, dialect: Dialect) -> MonochromeBitmap {
    let width_bytes = image.width_bytes();
    let mut bytes = vec![0u8; width_bytes * image.height()];

    for y in 0..image.height() {
        for x in 0..image.width() {
            let (r, g, b) = image.rgb(x, y);
            if is_blank(r, g, b) {
                bytes[y * width_bytes + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    if dialect.inverts_raster() {
        for byte in &mut bytes {
            *byte = !*byte;
        }
    }

    MonochromeBitmap {
        width_bytes,
        height: image.height(),
        bytes,
    }
}

/// Row-list rasterizer: collect each row's bits, then pack with
/// [`pack_row`].
///
/// Slower than [`rasterize`] but easier to follow; the two must produce
/// identical bytes for every input.
pub fn rasterize_rowwise(image: &PixelBuffer<'_>, dialect: Dialect) -> MonochromeBitmap {
    let width_bytes = image.width_bytes();
    let mut bytes = Vec::with_capacity(width_bytes * image.height());

    for y in 0..image.height() {
        let mut row = Vec::with_capacity(image.width());
        for x in 0..image.width() {
            let (r, g, b) = image.rgb(x, y);
            row.push(is_blank(r, g, b));
        }
        bytes.extend(pack_row(&row));
    }

    if dialect.inverts_raster() {
        for byte in &mut bytes {
            *byte = !*byte;
        }
    }

    MonochromeBitmap {
        width_bytes,
        height: image.height(),
        bytes,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// RGBA buffer filled with one color.
    fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            data.extend([rgb[0], rgb[1], rgb[2], 0xFF]);
        }
        data
    }

    /// Deterministic mixed-content buffer for strategy comparisons.
    fn patterned(width: usize, height: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 37 + y * 11) % 256) as u8;
                data.extend([v, v.wrapping_mul(3), 255 - v, 0xFF]);
            }
        }
        data
    }

    #[test]
    fn test_all_black_16x8_tspl() {
        let data = solid(16, 8, [0, 0, 0]);
        let image = PixelBuffer::new(16, 8, &data).unwrap();
        let bitmap = rasterize(&image, Dialect::Tspl);
        assert_eq!(bitmap.bytes.len(), 16);
        assert!(bitmap.bytes.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_all_black_16x8_cpcl() {
        let data = solid(16, 8, [0, 0, 0]);
        let image = PixelBuffer::new(16, 8, &data).unwrap();
        let bitmap = rasterize(&image, Dialect::Cpcl);
        assert_eq!(bitmap.bytes.len(), 16);
        assert!(bitmap.bytes.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_all_white_polarity() {
        let data = solid(16, 4, [255, 255, 255]);
        let image = PixelBuffer::new(16, 4, &data).unwrap();
        let tspl = rasterize(&image, Dialect::Tspl);
        let cpcl = rasterize(&image, Dialect::Cpcl);
        assert!(tspl.bytes.iter().all(|&b| b == 0xFF));
        assert!(cpcl.bytes.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_dialects_are_complements() {
        let data = patterned(24, 10);
        let image = PixelBuffer::new(24, 10, &data).unwrap();
        let tspl = rasterize(&image, Dialect::Tspl);
        let cpcl = rasterize(&image, Dialect::Cpcl);
        let complemented: Vec<u8> = cpcl.bytes.iter().map(|b| !b).collect();
        assert_eq!(tspl.bytes, complemented);
    }

    #[test]
    fn test_byte_count_invariant() {
        for (w, h) in [(1, 1), (7, 3), (8, 3), (9, 3), (13, 5), (64, 2)] {
            let data = solid(w, h, [10, 10, 10]);
            let image = PixelBuffer::new(w, h, &data).unwrap();
            let bitmap = rasterize(&image, Dialect::Tspl);
            assert_eq!(bitmap.bytes.len(), w.div_ceil(8) * h, "{}x{}", w, h);
            assert_eq!(bitmap.width_bytes, w.div_ceil(8));
            assert_eq!(bitmap.height, h);
        }
    }

    #[test]
    fn test_row_padding_tspl() {
        // 12 blank pixels per row: 0xFF then 0xF0 (pad bits stay zero)
        let data = solid(12, 2, [255, 255, 255]);
        let image = PixelBuffer::new(12, 2, &data).unwrap();
        let bitmap = rasterize(&image, Dialect::Tspl);
        assert_eq!(bitmap.bytes, vec![0xFF, 0xF0, 0xFF, 0xF0]);
    }

    #[test]
    fn test_row_padding_flips_under_cpcl() {
        // Complement runs over whole bytes, padding included
        let data = solid(12, 1, [255, 255, 255]);
        let image = PixelBuffer::new(12, 1, &data).unwrap();
        let bitmap = rasterize(&image, Dialect::Cpcl);
        assert_eq!(bitmap.bytes, vec![0x00, 0x0F]);
    }

    #[test]
    fn test_strategies_match() {
        for (w, h) in [(16, 8), (13, 7), (1, 1), (9, 2), (40, 3)] {
            let data = patterned(w, h);
            let image = PixelBuffer::new(w, h, &data).unwrap();
            for dialect in [Dialect::Tspl, Dialect::Cpcl] {
                assert_eq!(
                    rasterize(&image, dialect),
                    rasterize_rowwise(&image, dialect),
                    "{}x{} {:?}",
                    w,
                    h,
                    dialect
                );
            }
        }
    }

    #[test]
    fn test_threshold_boundary() {
        // Y == 128 exactly is printed; one step brighter is blank
        let at = solid(8, 1, [128, 128, 128]);
        let image = PixelBuffer::new(8, 1, &at).unwrap();
        assert_eq!(rasterize(&image, Dialect::Tspl).bytes, vec![0x00]);

        let above = solid(8, 1, [129, 129, 129]);
        let image = PixelBuffer::new(8, 1, &above).unwrap();
        assert_eq!(rasterize(&image, Dialect::Tspl).bytes, vec![0xFF]);
    }

    #[test]
    fn test_luminance_weights() {
        // Pure red is dark enough to print, pure green is not
        assert!(!is_blank(255, 0, 0)); // Y = 76.245
        assert!(is_blank(0, 255, 0)); // Y = 149.685
        assert!(!is_blank(0, 0, 255)); // Y = 29.07
    }

    #[test]
    fn test_mixed_row() {
        // Left half black, right half white, width 16
        let mut data = Vec::new();
        for x in 0..16 {
            let v = if x < 8 { 0 } else { 255 };
            data.extend([v, v, v, 0xFF]);
        }
        let image = PixelBuffer::new(16, 1, &data).unwrap();
        assert_eq!(rasterize(&image, Dialect::Tspl).bytes, vec![0x00, 0xFF]);
        assert_eq!(rasterize(&image, Dialect::Cpcl).bytes, vec![0xFF, 0x00]);
    }

    #[test]
    fn test_pack_row_cases() {
        assert_eq!(pack_row(&[true; 8]), vec![0xFF]);
        assert_eq!(pack_row(&[false; 8]), vec![0x00]);
        assert_eq!(
            pack_row(&[true, false, true, false, true, false, true, false]),
            vec![0xAA]
        );
        assert_eq!(pack_row(&[true; 9]), vec![0xFF, 0x80]);
        assert_eq!(pack_row(&[]), Vec::<u8>::new());
    }

    #[test]
    fn test_pixel_buffer_length_mismatch() {
        let data = vec![0u8; 10];
        let err = PixelBuffer::new(2, 2, &data).unwrap_err();
        assert_eq!(err.width, 2);
        assert_eq!(err.height, 2);
        assert_eq!(err.actual, 10);
    }

    #[test]
    fn test_from_rgba_image() {
        let img = image::RgbaImage::from_pixel(10, 3, image::Rgba([0, 0, 0, 255]));
        let buffer = PixelBuffer::from(&img);
        assert_eq!(buffer.width(), 10);
        assert_eq!(buffer.height(), 3);
        let bitmap = rasterize(&buffer, Dialect::Tspl);
        assert_eq!(bitmap.bytes.len(), 2 * 3);
        assert!(bitmap.bytes.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_empty_image() {
        let image = PixelBuffer::new(0, 0, &[]).unwrap();
        let bitmap = rasterize(&image, Dialect::Tspl);
        assert!(bitmap.bytes.is_empty());
        assert_eq!(bitmap.width_bytes, 0);
    }
}
