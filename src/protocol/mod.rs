//! # Printer Command Dialects
//!
//! Low-level command builders for the two ASCII label languages this
//! crate speaks, plus the encoding and rasterization machinery shared
//! between them.
//!
//! ## Module Structure
//!
//! - [`tspl`]: TSPL builder for TSC-compatible label printers
//! - [`cpcl`]: CPCL builder for Comtec/Zebra-style mobile printers
//! - [`raster`]: RGBA to packed 1-bit bitmap conversion
//! - [`gb18030`]: legacy multi-byte text encoding for CJK labels
//! - [`buffer`]: the byte/transcript accumulator behind both builders
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol::tspl::Tspl;
//!
//! let mut label = Tspl::new();
//! label.size(40, 30).gap(2).density(8).cls();
//! label.text(10, 10, "TSS24.BF2", 1, 1, "SN-0042")?;
//! label.qrcode(160, 60, "M", 4, "A", "https://example.com/sn/0042")?;
//! label.print();
//!
//! // label.data() is ready for the transport,
//! // label.transcript() for the job log
//! assert_eq!(label.transcript().last().map(String::as_str), Some("PRINT 1,1"));
//! # Ok::<(), etiqueta::protocol::EncodingError>(())
//! ```
//!
//! ## Dialect References
//!
//! Command formats follow the "TSPL/TSPL2 Programming Manual" (TSC Auto
//! ID Technology) and the "CPCL Programming Manual" (Zebra Technologies).

pub mod buffer;
pub mod cpcl;
pub mod gb18030;
pub mod raster;
pub mod tspl;

pub use buffer::CommandBuffer;
pub use cpcl::Cpcl;
pub use gb18030::EncodingError;
pub use raster::{Dialect, MonochromeBitmap, PixelBuffer, PixelBufferError};
pub use tspl::Tspl;
