//! # TSPL Command Builder
//!
//! Fluent builder for the TSPL label language spoken by TSC-compatible
//! printers (Gprinter, Xprinter, HPRT and friends).
//!
//! A label job is a setup preamble (`SIZE`, `GAP`, `DENSITY`, `CLS`),
//! a body of drawing and content commands, and a final `PRINT`. Every
//! command is one `\r\n`-terminated line; text payloads are GB18030 on
//! the wire so CJK and Latin content mix freely on one label.
//!
//! ## Example
//!
//! ```
//! use etiqueta::protocol::tspl::Tspl;
//!
//! let mut label = Tspl::new();
//! label.size(40, 30).gap(2).density(8).cls();
//! label.text(10, 10, "TSS24.BF2", 1, 1, "HELLO")?.print();
//!
//! assert!(label.data().starts_with(b"SIZE 40 mm,30 mm\r\n"));
//! # Ok::<(), etiqueta::protocol::EncodingError>(())
//! ```
//!
//! Methods with purely numeric parameters are infallible; methods that
//! carry caller text return `Err` when a character has no GB18030
//! encoding, leaving the buffer exactly as it was before the call.
//!
//! Numeric parameters are emitted as decimal text without range checks.
//! An out-of-range value reaches the printer verbatim and is rejected
//! there; the builder never rewrites it into a different valid command.

use crate::protocol::buffer::CommandBuffer;
use crate::protocol::gb18030::EncodingError;
use crate::protocol::raster::{rasterize, Dialect, PixelBuffer};

/// TSPL label job builder.
///
/// Owns a [`CommandBuffer`] that accumulates wire bytes and a parallel
/// text transcript. One instance builds one job at a time; [`init`]
/// (or [`Tspl::new`]) starts a fresh job.
///
/// [`init`]: Tspl::init
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tspl {
    buffer: CommandBuffer,
}

impl Tspl {
    /// An empty builder, ready for a new job.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the buffer and start a new job.
    pub fn init(&mut self) -> &mut Self {
        self.buffer.reset();
        self
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Label width and height in millimeters, excluding the liner.
    ///
    /// Emits `SIZE {width} mm,{height} mm`.
    pub fn size(&mut self, width: u32, height: u32) -> &mut Self {
        self.buffer.push_line(&format!("SIZE {width} mm,{height} mm"));
        self
    }

    /// Label width and height in inches. Emits `SIZE {width},{height}`.
    pub fn size_inch(&mut self, width: u32, height: u32) -> &mut Self {
        self.buffer.push_line(&format!("SIZE {width},{height}"));
        self
    }

    /// Gap between labels in millimeters. Emits `GAP {length} mm,0 mm`.
    pub fn gap(&mut self, length: u32) -> &mut Self {
        self.buffer.push_line(&format!("GAP {length} mm,0 mm"));
        self
    }

    /// Gap between labels in inches. Emits `GAP {length},0`.
    pub fn gap_inch(&mut self, length: u32) -> &mut Self {
        self.buffer.push_line(&format!("GAP {length},0"));
        self
    }

    /// Print speed level. Emits `SPEED {level}`.
    pub fn speed(&mut self, level: u8) -> &mut Self {
        self.buffer.push_line(&format!("SPEED {level}"));
        self
    }

    /// Heat density, usually 0 to 15. Emits `DENSITY {level}`.
    pub fn density(&mut self, level: u8) -> &mut Self {
        self.buffer.push_line(&format!("DENSITY {level}"));
        self
    }

    /// Print orientation and mirroring, both 0 or 1.
    ///
    /// Emits `DIRECTION {direction},{mirror}`.
    pub fn direction(&mut self, direction: u8, mirror: u8) -> &mut Self {
        self.buffer.push_line(&format!("DIRECTION {direction},{mirror}"));
        self
    }

    /// Reference origin for all coordinates, in dots.
    ///
    /// Emits `REFERENCE {x},{y}`.
    pub fn reference(&mut self, x: u32, y: u32) -> &mut Self {
        self.buffer.push_line(&format!("REFERENCE {x},{y}"));
        self
    }

    /// Keyboard/country code, e.g. `"001"` for the US layout.
    ///
    /// Emits `COUNTRY {code}`.
    pub fn country(&mut self, code: &str) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!("COUNTRY {code}"))?;
        Ok(self)
    }

    /// Character codepage, numeric (`"437"`) or named (`"UTF-8"`).
    ///
    /// Emits `CODEPAGE {codepage}`.
    pub fn codepage(&mut self, codepage: &str) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!("CODEPAGE {codepage}"))?;
        Ok(self)
    }

    /// Maximum gap-hunting distance in millimeters.
    ///
    /// Emits `LIMITFEED {limit} mm`.
    pub fn limit_feed(&mut self, limit: u32) -> &mut Self {
        self.buffer.push_line(&format!("LIMITFEED {limit} mm"));
        self
    }

    /// Maximum gap-hunting distance in inches. Emits `LIMITFEED {limit}`.
    pub fn limit_feed_inch(&mut self, limit: u32) -> &mut Self {
        self.buffer.push_line(&format!("LIMITFEED {limit}"));
        self
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    /// Clear the image buffer. Emits `CLS`.
    pub fn cls(&mut self) -> &mut Self {
        self.buffer.push_line("CLS");
        self
    }

    /// Feed paper forward by `length` dots. Emits `FEED {length}`.
    pub fn feed(&mut self, length: u32) -> &mut Self {
        self.buffer.push_line(&format!("FEED {length}"));
        self
    }

    /// Pull paper back by `length` dots. Emits `BACKFEED {length}`.
    pub fn back_feed(&mut self, length: u32) -> &mut Self {
        self.buffer.push_line(&format!("BACKFEED {length}"));
        self
    }

    /// Feed to the start of the next label. Emits `FORMFEED`.
    pub fn form_feed(&mut self) -> &mut Self {
        self.buffer.push_line("FORMFEED");
        self
    }

    /// Recalibrate to the next label origin. Emits `HOME`.
    pub fn home(&mut self) -> &mut Self {
        self.buffer.push_line("HOME");
        self
    }

    /// Beep the buzzer. Emits `SOUND {level},{interval}`.
    pub fn sound(&mut self, level: u8, interval: u32) -> &mut Self {
        self.buffer.push_line(&format!("SOUND {level},{interval}"));
        self
    }

    /// Print one copy of the label. Emits `PRINT 1,1`.
    pub fn print(&mut self) -> &mut Self {
        self.buffer.push_line("PRINT 1,1");
        self
    }

    /// Print `sets` sets of `copies` labels each.
    ///
    /// Emits `PRINT {sets},{copies}`.
    pub fn print_copies(&mut self, sets: u32, copies: u32) -> &mut Self {
        self.buffer.push_line(&format!("PRINT {sets},{copies}"));
        self
    }

    // ========================================================================
    // DRAWING
    // ========================================================================

    /// Filled black rectangle. Emits `BAR {x},{y},{width},{height}`.
    pub fn bar(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.buffer.push_line(&format!("BAR {x},{y},{width},{height}"));
        self
    }

    /// Rectangle outline between two corners, `thickness` dots thick.
    ///
    /// Emits `BOX {x1},{y1},{x2},{y2},{thickness}`.
    pub fn draw_box(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        thickness: u32,
    ) -> &mut Self {
        self.buffer.push_line(&format!("BOX {x1},{y1},{x2},{y2},{thickness}"));
        self
    }

    /// Clear a region of the image buffer.
    ///
    /// Emits `ERASE {x},{y},{width},{height}`.
    pub fn erase(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.buffer.push_line(&format!("ERASE {x},{y},{width},{height}"));
        self
    }

    /// Invert a region of the image buffer.
    ///
    /// Emits `REVERSE {x},{y},{width},{height}`.
    pub fn reverse(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.buffer.push_line(&format!("REVERSE {x},{y},{width},{height}"));
        self
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    /// Text at (x, y) with no rotation.
    ///
    /// `font` names a built-in or downloaded font, e.g. `"TSS24.BF2"` for
    /// the simplified-Chinese 24-dot face or `"2"` for the 8x12 ASCII
    /// face. Zoom factors scale 1 to 10 per axis.
    ///
    /// Emits `TEXT {x},{y},"{font}",0,{zoom_x},{zoom_y},"{data}"`.
    pub fn text(
        &mut self,
        x: u32,
        y: u32,
        font: &str,
        zoom_x: u8,
        zoom_y: u8,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "TEXT {x},{y},\"{font}\",0,{zoom_x},{zoom_y},\"{data}\""
        ))?;
        Ok(self)
    }

    /// Text rotated clockwise by `rotation` degrees (0, 90, 180, 270).
    ///
    /// Emits `TEXT {x},{y},"{font}",{rotation},{zoom_x},{zoom_y},"{data}"`.
    pub fn text_rotated(
        &mut self,
        x: u32,
        y: u32,
        font: &str,
        rotation: u16,
        zoom_x: u8,
        zoom_y: u8,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "TEXT {x},{y},\"{font}\",{rotation},{zoom_x},{zoom_y},\"{data}\""
        ))?;
        Ok(self)
    }

    /// QR code at (x, y) with no rotation.
    ///
    /// `level` is the error-correction level (`"L"`, `"M"`, `"Q"`,
    /// `"H"`), `cell_width` the module size 1 to 10, `mode` `"A"` for
    /// automatic or `"M"` for manual encoding.
    ///
    /// Emits `QRCODE {x},{y},{level},{cell_width},{mode},0,"{data}"`.
    pub fn qrcode(
        &mut self,
        x: u32,
        y: u32,
        level: &str,
        cell_width: u8,
        mode: &str,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "QRCODE {x},{y},{level},{cell_width},{mode},0,\"{data}\""
        ))?;
        Ok(self)
    }

    /// QR code rotated clockwise by `rotation` degrees.
    ///
    /// Emits `QRCODE {x},{y},{level},{cell_width},{mode},{rotation},"{data}"`.
    #[allow(clippy::too_many_arguments)]
    pub fn qrcode_rotated(
        &mut self,
        x: u32,
        y: u32,
        level: &str,
        cell_width: u8,
        mode: &str,
        rotation: u16,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "QRCODE {x},{y},{level},{cell_width},{mode},{rotation},\"{data}\""
        ))?;
        Ok(self)
    }

    /// Barcode at (x, y) with no rotation.
    ///
    /// `kind` selects the symbology, e.g. `"128"`, `"EAN13"`, `"39"`.
    /// `readable` prints the human-readable line (0 none, 1 left,
    /// 2 center, 3 right on newer firmware). `narrow` and `wide` are
    /// module widths in dots.
    ///
    /// Emits `BARCODE {x},{y},"{kind}",{height},{readable},0,{narrow},{wide},"{data}"`.
    #[allow(clippy::too_many_arguments)]
    pub fn barcode(
        &mut self,
        x: u32,
        y: u32,
        kind: &str,
        height: u32,
        readable: u8,
        narrow: u8,
        wide: u8,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "BARCODE {x},{y},\"{kind}\",{height},{readable},0,{narrow},{wide},\"{data}\""
        ))?;
        Ok(self)
    }

    /// Barcode rotated clockwise by `rotation` degrees.
    ///
    /// Unlike [`barcode`], the kind is emitted without quotes. Printers
    /// accept both spellings; keeping them distinct makes the output
    /// byte-stable for callers migrating existing jobs.
    ///
    /// Emits `BARCODE {x},{y},{kind},{height},{readable},{rotation},{narrow},{wide},"{data}"`.
    ///
    /// [`barcode`]: Tspl::barcode
    #[allow(clippy::too_many_arguments)]
    pub fn barcode_rotated(
        &mut self,
        x: u32,
        y: u32,
        kind: &str,
        height: u32,
        readable: u8,
        rotation: u16,
        narrow: u8,
        wide: u8,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "BARCODE {x},{y},{kind},{height},{readable},{rotation},{narrow},{wide},\"{data}\""
        ))?;
        Ok(self)
    }

    /// Rasterize an RGBA image and draw it at (x, y).
    ///
    /// `mode` is 0 for overwrite, 1 for OR, 2 for XOR. The header line
    /// carries the packed row width in bytes and the height in dots; the
    /// packed raster bytes follow the trailing comma directly, with no
    /// line terminator, and do not appear in the transcript.
    ///
    /// Emits `BITMAP {x},{y},{width_bytes},{height},{mode},` + raster.
    pub fn bitmap(&mut self, x: u32, y: u32, mode: u8, image: &PixelBuffer<'_>) -> &mut Self {
        let raster = rasterize(image, Dialect::Tspl);
        self.buffer.push_fragment(&format!(
            "BITMAP {x},{y},{},{},{mode},",
            raster.width_bytes, raster.height
        ));
        self.buffer.push_raw(&raster.bytes);
        self
    }

    /// Bitmap with caller-preformatted data, emitted as one full line.
    ///
    /// Emits `BITMAP {x},{y},{width_bytes},{height},{mode},{data}`.
    pub fn bitmap_raw(
        &mut self,
        x: u32,
        y: u32,
        width_bytes: u32,
        height: u32,
        mode: u8,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "BITMAP {x},{y},{width_bytes},{height},{mode},{data}"
        ))?;
        Ok(self)
    }

    /// Append an arbitrary command line verbatim.
    ///
    /// Escape hatch for commands the builder does not model.
    pub fn command(&mut self, content: &str) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(content)?;
        Ok(self)
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    /// Finished wire bytes for the transport.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    /// Human-readable transcript, one entry per command.
    #[inline]
    pub fn transcript(&self) -> &[String] {
        self.buffer.transcript()
    }

    /// Wire byte count so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no commands have been appended since the last reset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
