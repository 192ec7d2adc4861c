//! # Printer Profiles
//!
//! Per-model configuration: which BLE identifiers to scan for and write
//! to, and the head geometry that turns millimeters into dots. These are
//! settings, not protocol constants; add a profile per printer model
//! rather than scattering UUIDs through call sites.

use uuid::Uuid;

/// Identity and geometry of one printer model.
///
/// | Field                  | Used by                               |
/// |------------------------|---------------------------------------|
/// | `advertised_service`   | discovery filter in `open`            |
/// | `write_service`        | GATT resolution and writes            |
/// | `write_characteristic` | chunked writes                        |
/// | `dpi`, `print_width_mm`| layout math before building commands  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterProfile {
    /// Advertised device name, for picking a device out of scan results.
    pub device_name: &'static str,
    /// Service UUID present in the advertisement packet.
    pub advertised_service: Uuid,
    /// Service that owns the write characteristic.
    pub write_service: Uuid,
    /// Characteristic that accepts command bytes.
    pub write_characteristic: Uuid,
    /// Print head resolution in dots per inch.
    pub dpi: u32,
    /// Printable width in millimeters.
    pub print_width_mm: u32,
}

impl PrinterProfile {
    /// HPRT HM-A300 mobile label printer, 203 dpi over a 72 mm head.
    pub const HM_A300: PrinterProfile = PrinterProfile {
        device_name: "HM-A300",
        advertised_service: Uuid::from_u128(0x0000FEE7_0000_1000_8000_00805F9B34FB),
        write_service: Uuid::from_u128(0x0000FF00_0000_1000_8000_00805F9B34FB),
        write_characteristic: Uuid::from_u128(0x0000FF02_0000_1000_8000_00805F9B34FB),
        dpi: 203,
        print_width_mm: 72,
    };

    /// Dots per millimeter for this head.
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Convert a millimeter measure to dots, rounded to nearest.
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u32 {
        (mm * self.dots_per_mm()).round() as u32
    }

    /// Full printable width in dots.
    #[inline]
    pub fn print_width_dots(&self) -> u32 {
        self.mm_to_dots(self.print_width_mm as f32)
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::HM_A300
    }
}
