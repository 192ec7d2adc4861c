//! # BLE Printer Transport Layer
//!
//! Delivery of finished command buffers to a printer over Bluetooth LE.
//!
//! ## Module Structure
//!
//! - [`ble`]: connection state machine and the chunked-write protocol
//! - [`bridge`]: the host BLE capability interface the transport drives
//! - [`sink`]: byte representation strategies for bridge FFI layers
//! - [`btleplug`]: production bridge over the btleplug stack
//!
//! [`BleTransport`] is generic over [`BleBridge`], so its state machine
//! and write pacing are tested against a mock while production runs on
//! [`BtleplugBridge`].

pub mod ble;
pub mod bridge;
#[cfg(feature = "btleplug")]
pub mod btleplug;
pub mod sink;

pub use ble::{BleTransport, TransportState, INTER_CHUNK_DELAY, WRITE_CHUNK_SIZE};
pub use bridge::{
    AdapterState, BleBridge, BridgeCapabilities, BridgeError, ConnectionChange, DeviceId,
    DiscoveredDevice,
};
#[cfg(feature = "btleplug")]
pub use btleplug::BtleplugBridge;
pub use sink::ByteSink;
