//! # Etiqueta - Thermal Label Printer Library
//!
//! Etiqueta is a Rust library for driving TSPL and CPCL label printers
//! over Bluetooth LE. It provides:
//!
//! - **Command builders**: fluent TSPL and CPCL label job construction
//! - **Rasterization**: RGBA images to dialect-correct 1-bit bitmaps
//! - **Text encoding**: GB18030, so CJK and Latin text share one label
//! - **Transport**: BLE discovery, connection, and paced chunked writes
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::{BleTransport, BtleplugBridge, PrinterProfile, Tspl};
//!
//! # async fn print_label() -> Result<(), Box<dyn std::error::Error>> {
//! // Build the label
//! let mut label = Tspl::new();
//! label.size(40, 30).gap(2).density(8).cls();
//! label.text(10, 10, "TSS24.BF2", 1, 1, "电池 Battery 4711")?;
//! label.qrcode(160, 80, "M", 4, "A", "https://example.com/4711")?;
//! label.print();
//!
//! // Find the printer and connect
//! let profile = PrinterProfile::HM_A300;
//! let mut transport = BleTransport::new(BtleplugBridge::new().await?);
//! transport.open(&[profile.advertised_service]).await?;
//! let device = transport.next_device().await.ok_or("scan ended early")?;
//! transport
//!     .connect(&device.id, profile.write_service, profile.write_characteristic)
//!     .await?;
//!
//! // Stream the job and hang up
//! transport.write(label.data()).await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | TSPL and CPCL command builders, rasterizer, encoding |
//! | [`transport`] | BLE connection state machine and chunked writes |
//! | [`profile`] | Per-model identifiers and head geometry |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Currently tested with:
//! - HPRT HM-A300 (72mm, 203 DPI, CPCL and TSPL firmware)
//!
//! Other label printers speaking TSPL or CPCL over a GATT write
//! characteristic should work with their own [`PrinterProfile`].

pub mod error;
pub mod profile;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use error::EtiquetaError;
pub use profile::PrinterProfile;
pub use protocol::{Cpcl, Dialect, PixelBuffer, Tspl};
#[cfg(feature = "btleplug")]
pub use transport::BtleplugBridge;
pub use transport::{BleTransport, DeviceId};
