//! # Error Types
//!
//! This module defines error types used throughout the etiqueta library.
//!
//! Transport failures carry the originating [`BridgeError`] as their source,
//! so callers can log the bridge's own message alongside the taxonomy
//! variant. Nothing here retries: a failed operation is reported once and
//! the caller decides what happens next.

use thiserror::Error;

use crate::protocol::gb18030::EncodingError;
use crate::protocol::raster::PixelBufferError;
use crate::transport::ble::TransportState;
use crate::transport::bridge::{BridgeError, DeviceId};

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// The adapter is off or missing and one initialization attempt did not
    /// bring it up. Requires user action (enable Bluetooth/location).
    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(#[source] BridgeError),

    /// Starting or stopping device discovery failed.
    #[error("Device discovery failed: {0}")]
    DiscoveryFailed(#[source] BridgeError),

    /// The bridge could not establish a connection to the peripheral.
    #[error("Connect to {device} failed: {source}")]
    ConnectFailed {
        device: DeviceId,
        #[source]
        source: BridgeError,
    },

    /// GATT service or characteristic discovery failed after connecting.
    /// Only raised on platforms whose bridge requires explicit resolution.
    #[error("Service resolution on {device} failed: {source}")]
    ServiceResolutionFailed {
        device: DeviceId,
        #[source]
        source: BridgeError,
    },

    /// A chunk write was rejected; the remaining chunks were not attempted.
    #[error("Chunk {index} of {total} failed: {source}")]
    ChunkWriteFailed {
        /// Zero-based index of the failed chunk.
        index: usize,
        /// Total chunks the buffer was split into.
        total: usize,
        #[source]
        source: BridgeError,
    },

    /// The bridge reported a failure while releasing the connection.
    /// Local transport state is reset to Idle regardless.
    #[error("Disconnect from {device} failed: {source}")]
    DisconnectFailed {
        device: DeviceId,
        #[source]
        source: BridgeError,
    },

    /// An operation was issued in a state that does not allow it,
    /// e.g. `open` while a connection is Ready.
    #[error("Cannot {op} while transport is {state:?}")]
    InvalidState {
        op: &'static str,
        state: TransportState,
    },

    /// Label text contains a character with no GB18030 mapping.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A pixel buffer's data length does not match its dimensions.
    #[error(transparent)]
    PixelBuffer(#[from] PixelBufferError),

    /// Image loading/processing error
    #[error("Image error: {0}")]
    Image(String),
}
