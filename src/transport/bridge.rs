//! # BLE Bridge Abstraction
//!
//! [`BleBridge`] is the capability surface the transport drives: adapter
//! lifecycle, discovery, connection, GATT lookup and characteristic
//! writes. The real implementation sits in [`btleplug`]; tests substitute
//! a mock. Every operation completes exactly once; the two listener
//! registrations are long-lived subscriptions that may fire at any time.
//!
//! Bridges differ in two ways the transport must know about, carried in
//! [`BridgeCapabilities`]: whether GATT services need an explicit
//! resolution pass after connecting, and which [`ByteSink`]
//! representation the write path expects.
//!
//! [`btleplug`]: crate::transport::btleplug

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::transport::sink::ByteSink;

/// Opaque device identifier assigned by the host BLE stack.
///
/// A MAC address on some platforms, a rotating UUID on others. Only ever
/// compared and passed back to the bridge that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A device seen during discovery.
///
/// Fires once per advertisement report, so the same device may appear
/// repeatedly with a fresher RSSI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// A connection established or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionChange {
    pub device: DeviceId,
    pub connected: bool,
}

/// Snapshot of the host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterState {
    /// Radio powered on and usable.
    pub available: bool,
}

/// Failure reported by the host BLE stack.
///
/// Bridges translate their native error types into a message here; the
/// transport wraps it with which operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BridgeError(String);

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Callback invoked for every discovery report.
pub type DeviceFoundListener = Box<dyn Fn(DiscoveredDevice) + Send + Sync>;

/// Callback invoked when a connection is established or dropped.
pub type ConnectionListener = Box<dyn Fn(ConnectionChange) + Send + Sync>;

/// What the transport must know about a bridge, decided once at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct BridgeCapabilities {
    /// Whether `connect` must be followed by explicit service and
    /// characteristic resolution before writes can be issued. Bridges
    /// that pre-resolve GATT on connect clear this.
    pub needs_service_resolution: bool,
    /// Byte representation the bridge's write path marshals through.
    pub byte_sink: ByteSink,
}

/// Host BLE stack operations the transport consumes.
///
/// All methods are cancel-safe in the sense the transport needs: each
/// maps to one underlying request and is never issued concurrently with
/// another against the same device.
#[async_trait]
pub trait BleBridge: Send + Sync {
    /// Static capability flags for this bridge.
    fn capabilities(&self) -> BridgeCapabilities;

    /// One attempt to bring the adapter up. Called only after
    /// [`adapter_state`] reported the radio unavailable.
    ///
    /// [`adapter_state`]: BleBridge::adapter_state
    async fn init_adapter(&self) -> Result<(), BridgeError>;

    /// Current adapter availability.
    async fn adapter_state(&self) -> Result<AdapterState, BridgeError>;

    /// Begin advertising-report scanning, filtered to devices that
    /// advertise any of `service_ids` (all devices when empty).
    async fn start_discovery(&self, service_ids: &[Uuid]) -> Result<(), BridgeError>;

    /// Stop scanning.
    async fn stop_discovery(&self) -> Result<(), BridgeError>;

    /// Subscribe to discovery reports. Listeners stay registered for the
    /// bridge's lifetime.
    fn on_device_found(&self, listener: DeviceFoundListener);

    /// Subscribe to connection establishment and loss events.
    fn on_connection_state_change(&self, listener: ConnectionListener);

    /// Connect to a previously discovered device.
    async fn connect(&self, device: &DeviceId) -> Result<(), BridgeError>;

    /// Drop the connection to a device.
    async fn disconnect(&self, device: &DeviceId) -> Result<(), BridgeError>;

    /// Resolve and list the device's GATT services.
    async fn services(&self, device: &DeviceId) -> Result<Vec<Uuid>, BridgeError>;

    /// List the characteristics of one service. Requires a prior
    /// [`services`] call on bridges that resolve lazily.
    ///
    /// [`services`]: BleBridge::services
    async fn characteristics(
        &self,
        device: &DeviceId,
        service: Uuid,
    ) -> Result<Vec<Uuid>, BridgeError>;

    /// Write one chunk to a characteristic and wait for the stack's
    /// completion acknowledgment.
    async fn write_characteristic(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        bytes: &[u8],
    ) -> Result<(), BridgeError>;
}
