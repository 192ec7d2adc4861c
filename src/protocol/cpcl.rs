//! # CPCL Command Builder
//!
//! Fluent builder for CPCL, the mobile-printer language used by Zebra and
//! Comtec-derived units (HM-A300 and relatives).
//!
//! A CPCL session opens with the `!` control line carrying offset, DPI and
//! page height, fills in content, and closes with `PRINT`. Commands are
//! space-separated fields on `\r\n`-terminated lines; label text rides as
//! GB18030 bytes.
//!
//! ## Example
//!
//! ```
//! use etiqueta::protocol::cpcl::Cpcl;
//!
//! let mut label = Cpcl::new();
//! label.init(0, 200, 200, 400, 1).page_width(576).center();
//! label.text("4", 0, 0, 40, "HELLO")?;
//! label.print();
//!
//! assert!(label.data().starts_with(b"! 0 200 200 400 1\r\n"));
//! # Ok::<(), etiqueta::protocol::EncodingError>(())
//! ```
//!
//! The same infallible/fallible split as the TSPL builder applies: numeric
//! commands cannot fail, text-carrying commands report an
//! [`EncodingError`] and leave the buffer untouched. The three-line QR
//! block commits atomically; a failed data line never leaves a dangling
//! `B QR` header behind.

use crate::protocol::buffer::CommandBuffer;
use crate::protocol::gb18030::{self, EncodingError};
use crate::protocol::raster::{rasterize, Dialect, PixelBuffer};

/// CPCL label job builder.
///
/// [`init`] opens a session and must come first; the printer ignores
/// content outside a `!` block.
///
/// [`init`]: Cpcl::init
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cpcl {
    buffer: CommandBuffer,
}

impl Cpcl {
    /// An empty builder. Call [`Cpcl::init`] to open a session.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // PAGE SETUP
    // ========================================================================

    /// Reset the buffer and open a print session.
    ///
    /// `offset` shifts the whole label horizontally in dots,
    /// `horizontal_dpi`/`vertical_dpi` name the head resolution (200 for
    /// 203 dpi heads), `height` is the page length in dots and `qty` the
    /// number of copies.
    ///
    /// Emits `! {offset} {horizontal_dpi} {vertical_dpi} {height} {qty}`.
    pub fn init(
        &mut self,
        offset: u32,
        horizontal_dpi: u32,
        vertical_dpi: u32,
        height: u32,
        qty: u32,
    ) -> &mut Self {
        self.buffer.reset();
        self.buffer.push_line(&format!(
            "! {offset} {horizontal_dpi} {vertical_dpi} {height} {qty}"
        ));
        self
    }

    /// Page width in dots. Emits `PW {width}`.
    pub fn page_width(&mut self, width: u32) -> &mut Self {
        self.buffer.push_line(&format!("PW {width}"));
        self
    }

    /// Left-justify following fields. Emits `LEFT`.
    pub fn left(&mut self) -> &mut Self {
        self.buffer.push_line("LEFT");
        self
    }

    /// Right-justify following fields. Emits `RIGHT`.
    pub fn right(&mut self) -> &mut Self {
        self.buffer.push_line("RIGHT");
        self
    }

    /// Center following fields. Emits `CENTER`.
    pub fn center(&mut self) -> &mut Self {
        self.buffer.push_line("CENTER");
        self
    }

    /// Motor speed level, 0 to 5. Emits `SPEED {level}`.
    pub fn speed(&mut self, level: u8) -> &mut Self {
        self.buffer.push_line(&format!("SPEED {level}"));
        self
    }

    /// Beep for `length` eighths of a second. Emits `BEEP {length}`.
    pub fn beep(&mut self, length: u32) -> &mut Self {
        self.buffer.push_line(&format!("BEEP {length}"));
        self
    }

    // ========================================================================
    // TEXT
    // ========================================================================

    /// Horizontal text at (x, y).
    ///
    /// `font` is a font number or name; `size` is carried for
    /// compatibility and ignored by the firmware.
    ///
    /// Emits `T {font} {size} {x} {y} {data}`.
    pub fn text(
        &mut self,
        font: &str,
        size: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer
            .push_line_encoded(&format!("T {font} {size} {x} {y} {data}"))?;
        Ok(self)
    }

    /// Vertical text, rotated 90 degrees counter-clockwise.
    ///
    /// Emits `VT {font} {size} {x} {y} {data}`.
    pub fn vtext(
        &mut self,
        font: &str,
        size: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer
            .push_line_encoded(&format!("VT {font} {size} {x} {y} {data}"))?;
        Ok(self)
    }

    /// Magnification for following text, 1 to 16 per axis; `0 0` cancels.
    /// Sticky across labels. Emits `SETMAG {width} {height}`.
    pub fn set_mag(&mut self, width: u8, height: u8) -> &mut Self {
        self.buffer.push_line(&format!("SETMAG {width} {height}"));
        self
    }

    /// Bold for following text, 1 on, 0 off. Sticky across labels.
    /// Emits `SETBOLD {value}`.
    pub fn set_bold(&mut self, value: u8) -> &mut Self {
        self.buffer.push_line(&format!("SETBOLD {value}"));
        self
    }

    // ========================================================================
    // DRAWING
    // ========================================================================

    /// Rectangle outline between two corners.
    ///
    /// Emits `BOX {x1} {y1} {x2} {y2} {width}`.
    pub fn draw_box(&mut self, x1: u32, y1: u32, x2: u32, y2: u32, width: u32) -> &mut Self {
        self.buffer.push_line(&format!("BOX {x1} {y1} {x2} {y2} {width}"));
        self
    }

    /// Line between two points, `width` dots thick.
    ///
    /// Emits `L {x1} {y1} {x2} {y2} {width}`.
    pub fn line(&mut self, x1: u32, y1: u32, x2: u32, y2: u32, width: u32) -> &mut Self {
        self.buffer.push_line(&format!("L {x1} {y1} {x2} {y2} {width}"));
        self
    }

    // ========================================================================
    // BARCODES
    // ========================================================================

    /// Annotate following barcodes with their data.
    ///
    /// `font_number` picks the annotation font, `font_size` is ignored by
    /// the firmware, `offset` is the gap between bars and text in dots.
    ///
    /// Emits `BT {font_number} {font_size} {offset}`.
    pub fn barcode_text(&mut self, font_number: u8, font_size: u8, offset: u32) -> &mut Self {
        self.buffer
            .push_line(&format!("BT {font_number} {font_size} {offset}"));
        self
    }

    /// Stop annotating barcodes. Emits `BT OFF`.
    pub fn barcode_text_off(&mut self) -> &mut Self {
        self.buffer.push_line("BT OFF");
        self
    }

    /// Horizontal barcode at (x, y).
    ///
    /// `kind` selects the symbology (`"39"`, `"93"`, `"128"`, …),
    /// `width` is the narrow-bar unit width, `ratio` the wide/narrow
    /// ratio code.
    ///
    /// Emits `B {kind} {width} {ratio} {height} {x} {y} {data}`.
    #[allow(clippy::too_many_arguments)]
    pub fn barcode(
        &mut self,
        kind: &str,
        width: u8,
        ratio: u8,
        height: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "B {kind} {width} {ratio} {height} {x} {y} {data}"
        ))?;
        Ok(self)
    }

    /// Vertical barcode, printed ladder-style.
    ///
    /// Emits `VB {kind} {width} {ratio} {height} {x} {y} {data}`.
    #[allow(clippy::too_many_arguments)]
    pub fn vbarcode(
        &mut self,
        kind: &str,
        width: u8,
        ratio: u8,
        height: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(&format!(
            "VB {kind} {width} {ratio} {height} {x} {y} {data}"
        ))?;
        Ok(self)
    }

    /// Horizontal QR code at (x, y).
    ///
    /// `model` is the QR model number (2 unless a legacy scanner demands
    /// 1), `unit_width` the module size 1 to 32, `level` the
    /// error-correction letter (`"H"`, `"Q"`, `"M"`, `"L"`).
    ///
    /// Emits the three-line block
    ///
    /// ```text
    /// B QR {x} {y} M {model} N {unit_width}
    /// {level}A,{data}
    /// ENDQR
    /// ```
    ///
    /// as a unit: if `data` fails to encode, none of the lines land.
    pub fn qrcode(
        &mut self,
        x: u32,
        y: u32,
        model: u8,
        unit_width: u8,
        level: &str,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        let payload = format!("{level}A,{data}");
        let encoded = gb18030::encode(&payload)?;
        self.buffer
            .push_line(&format!("B QR {x} {y} M {model} N {unit_width}"));
        self.buffer.push_preencoded_line(&payload, encoded);
        self.buffer.push_line("ENDQR");
        Ok(self)
    }

    /// Vertical QR code; same atomic three-line block with a `VB QR`
    /// header.
    pub fn vqrcode(
        &mut self,
        x: u32,
        y: u32,
        model: u8,
        unit_width: u8,
        level: &str,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        let payload = format!("{level}A,{data}");
        let encoded = gb18030::encode(&payload)?;
        self.buffer
            .push_line(&format!("VB QR {x} {y} M {model} N {unit_width}"));
        self.buffer.push_preencoded_line(&payload, encoded);
        self.buffer.push_line("ENDQR");
        Ok(self)
    }

    // ========================================================================
    // GRAPHICS
    // ========================================================================

    /// Compressed graphics with caller-preformatted hex data, one line.
    ///
    /// Emits `CG {width_bytes} {height} {x} {y} {data}`.
    pub fn cg(
        &mut self,
        width_bytes: u32,
        height: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer
            .push_line_encoded(&format!("CG {width_bytes} {height} {x} {y} {data}"))?;
        Ok(self)
    }

    /// Expanded (ASCII hex) graphics with caller-preformatted data.
    ///
    /// Emits `EG {width_bytes} {height} {x} {y} {data}`.
    pub fn eg(
        &mut self,
        width_bytes: u32,
        height: u32,
        x: u32,
        y: u32,
        data: &str,
    ) -> Result<&mut Self, EncodingError> {
        self.buffer
            .push_line_encoded(&format!("EG {width_bytes} {height} {x} {y} {data}"))?;
        Ok(self)
    }

    /// Rasterize an RGBA image and draw it at (x, y).
    ///
    /// The packed bytes are complemented for CPCL's inverted polarity and
    /// follow the header directly, with neither separator nor terminator,
    /// exactly as the firmware consumes them. Only the header appears in
    /// the transcript.
    ///
    /// Emits `CG {width_bytes} {height} {x} {y}` + complemented raster.
    pub fn bitmap(&mut self, x: u32, y: u32, image: &PixelBuffer<'_>) -> &mut Self {
        let raster = rasterize(image, Dialect::Cpcl);
        self.buffer.push_fragment(&format!(
            "CG {} {} {x} {y}",
            raster.width_bytes, raster.height
        ));
        self.buffer.push_raw(&raster.bytes);
        self
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    /// Close the session and print. Emits `PRINT`.
    pub fn print(&mut self) -> &mut Self {
        self.buffer.push_line("PRINT");
        self
    }

    /// Append an arbitrary command line verbatim.
    pub fn command(&mut self, content: &str) -> Result<&mut Self, EncodingError> {
        self.buffer.push_line_encoded(content)?;
        Ok(self)
    }

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
