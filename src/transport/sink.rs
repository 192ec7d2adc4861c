//! # Byte Sink Strategies
//!
//! Host BLE stacks disagree about what a byte is. Some take raw unsigned
//! octets; JVM-backed bridges marshal through `byte`, whose range is
//! -128 to 127. A [`ByteSink`] names the representation a bridge needs,
//! chosen once when the bridge is constructed instead of branching at
//! every write call site.
//!
//! The wire payload is unaffected either way: a signed `-1` and an
//! unsigned `255` are the same octet. [`ByteSink::normalize`] only decides
//! which numeric value the FFI layer sees.

/// Numeric representation a bridge expects for outgoing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteSink {
    /// Raw octets, 0 to 255. The common case.
    #[default]
    Unsigned,
    /// Two's-complement signed bytes, -128 to 127, for bridges that
    /// marshal through a signed byte type.
    Signed,
}

impl ByteSink {
    /// The numeric value a bridge should pass for one payload octet.
    ///
    /// Widened to `i16` so both representations fit one return type; the
    /// low 8 bits always equal the input.
    #[inline]
    pub fn normalize(self, value: u8) -> i16 {
        match self {
            ByteSink::Unsigned => value as i16,
            ByteSink::Signed => {
                if value >= 128 {
                    value as i16 - 256
                } else {
                    value as i16
                }
            }
        }
    }

    /// Normalize a whole payload.
    pub fn normalize_all(self, data: &[u8]) -> Vec<i16> {
        data.iter().map(|&b| self.normalize(b)).collect()
    }
}
