//! # BLE Transport
//!
//! Owns the adapter lifecycle, discovery and connection state, and the
//! chunked-write protocol that delivers a finished command buffer to the
//! printer's write characteristic.
//!
//! ## State machine
//!
//! ```text
//! Idle/Closed/Failed --open--> AdapterInitializing --> Scanning
//! Scanning --connect--> Connecting [--> ResolvingServices] --> Ready
//! Ready --close--> Idle          (any failure --> Failed)
//! connection lost --> Closed
//! ```
//!
//! `open` checks the adapter and makes at most one initialization attempt;
//! if the radio still is not up, callers get [`EtiquetaError::AdapterUnavailable`]
//! and nothing is retried. From `Failed` the whole open sequence may be
//! issued again. One transport holds at most one connection; `open` while
//! a connection is up is rejected rather than silently replacing it.
//!
//! ## Chunked writes
//!
//! Label printers sit behind constrained BLE modules: a write larger than
//! ~20 bytes or a second write issued before the first is digested gets a
//! characteristic-busy rejection. [`BleTransport::write`] therefore slices
//! the buffer into [`WRITE_CHUNK_SIZE`] pieces, writes them strictly in
//! order, and sleeps [`INTER_CHUNK_DELAY`] after every chunk, the last one
//! included. The first rejected chunk aborts the rest of the buffer.
//!
//! ## Events
//!
//! Discovery reports and connection changes arrive from the bridge at any
//! time. They buffer in unbounded channels until the caller polls
//! [`next_device`] / [`next_connection_change`], so an in-flight write is
//! never blocked by event delivery.
//!
//! [`next_device`]: BleTransport::next_device
//! [`next_connection_change`]: BleTransport::next_connection_change

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::EtiquetaError;
use crate::transport::bridge::{
    BleBridge, BridgeError, ConnectionChange, DeviceId, DiscoveredDevice,
};

/// Maximum bytes per characteristic write.
pub const WRITE_CHUNK_SIZE: usize = 20;

/// Pause after every completed chunk write.
pub const INTER_CHUNK_DELAY: Duration = Duration::from_millis(100);

/// Where the transport is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No adapter activity.
    Idle,
    /// Adapter was down; one bring-up attempt is running.
    AdapterInitializing,
    /// Discovery is active.
    Scanning,
    /// Connect request issued, completion pending.
    Connecting,
    /// Connected; resolving GATT services and characteristics.
    ResolvingServices,
    /// Connected and writable.
    Ready,
    /// Disconnect request issued, completion pending.
    Closing,
    /// The connection dropped out from under us.
    Closed,
    /// An open/connect step failed; a fresh `open` may be issued.
    Failed,
}

/// Service and characteristic a ready connection writes to.
#[derive(Debug, Clone, Copy)]
struct WriteTarget {
    service: Uuid,
    characteristic: Uuid,
}

/// Single-connection BLE printer transport over a [`BleBridge`].
///
/// All operations take `&mut self`: one operation runs at a time, which
/// is what keeps the chunked-write loop strictly sequential.
pub struct BleTransport<B: BleBridge> {
    bridge: B,
    state: TransportState,
    current: Option<DeviceId>,
    write_target: Option<WriteTarget>,
    devices: mpsc::UnboundedReceiver<DiscoveredDevice>,
    connection_events: mpsc::UnboundedReceiver<ConnectionChange>,
}

impl<B: BleBridge> BleTransport<B> {
    /// Wrap a bridge and subscribe to its event streams.
    ///
    /// The two bridge listeners are registered exactly once here and feed
    /// the channels behind [`next_device`] and [`next_connection_change`].
    ///
    /// [`next_device`]: BleTransport::next_device
    /// [`next_connection_change`]: BleTransport::next_connection_change
    pub fn new(bridge: B) -> Self {
        let (device_tx, devices) = mpsc::unbounded_channel();
        let (conn_tx, connection_events) = mpsc::unbounded_channel();
        bridge.on_device_found(Box::new(move |device| {
            let _ = device_tx.send(device);
        }));
        bridge.on_connection_state_change(Box::new(move |change| {
            let _ = conn_tx.send(change);
        }));
        Self {
            bridge,
            state: TransportState::Idle,
            current: None,
            write_target: None,
            devices,
            connection_events,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// The connected (or connecting) device, if any.
    #[inline]
    pub fn current_device(&self) -> Option<&DeviceId> {
        self.current.as_ref()
    }

    /// Bring the adapter up if needed and start discovery.
    ///
    /// Devices advertising any UUID in `service_filter` are reported
    /// through [`next_device`]; an empty filter reports everything.
    /// Permitted from `Idle`, `Closed` and `Failed` only. If the adapter
    /// is down, exactly one initialization attempt is made; a second
    /// failure is fatal and requires user action before retrying.
    ///
    /// [`next_device`]: BleTransport::next_device
    pub async fn open(&mut self, service_filter: &[Uuid]) -> Result<(), EtiquetaError> {
        match self.state {
            TransportState::Idle | TransportState::Closed | TransportState::Failed => {}
            state => return Err(EtiquetaError::InvalidState { op: "open", state }),
        }

        self.state = TransportState::AdapterInitializing;
        let available = self
            .bridge
            .adapter_state()
            .await
            .map(|s| s.available)
            .unwrap_or(false);
        if !available {
            info!("Adapter down, attempting initialization");
            if let Err(source) = self.bridge.init_adapter().await {
                self.state = TransportState::Failed;
                return Err(EtiquetaError::AdapterUnavailable(source));
            }
        }

        if let Err(source) = self.bridge.start_discovery(service_filter).await {
            self.state = TransportState::Failed;
            return Err(EtiquetaError::DiscoveryFailed(source));
        }
        self.state = TransportState::Scanning;
        info!("Discovery started");
        Ok(())
    }

    /// Stop discovery without connecting.
    pub async fn stop_discovery(&mut self) -> Result<(), EtiquetaError> {
        self.bridge
            .stop_discovery()
            .await
            .map_err(EtiquetaError::DiscoveryFailed)?;
        if self.state == TransportState::Scanning {
            self.state = TransportState::Idle;
        }
        Ok(())
    }

    /// Connect to a discovered device and prepare `service` /
    /// `characteristic` as the write target.
    ///
    /// Discovery stops once the connection is up. On bridges that flag
    /// `needs_service_resolution`, the GATT table is resolved and the
    /// target verified before the transport reports `Ready`; other
    /// bridges pre-resolve on connect and skip that step.
    pub async fn connect(
        &mut self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(), EtiquetaError> {
        if self.state != TransportState::Scanning {
            return Err(EtiquetaError::InvalidState {
                op: "connect",
                state: self.state,
            });
        }

        self.state = TransportState::Connecting;
        self.current = Some(device.clone());
        info!("Connecting to {device}");
        if let Err(source) = self.bridge.connect(device).await {
            self.state = TransportState::Failed;
            self.current = None;
            return Err(EtiquetaError::ConnectFailed {
                device: device.clone(),
                source,
            });
        }

        // The connection is up; a still-running scan only burns radio time
        if let Err(e) = self.bridge.stop_discovery().await {
            warn!("Could not stop discovery after connect: {e}");
        }

        if self.bridge.capabilities().needs_service_resolution {
            self.state = TransportState::ResolvingServices;
            debug!("Resolving GATT table on {device}");
            if let Err(e) = self.resolve_write_target(device, service, characteristic).await {
                self.state = TransportState::Failed;
                return Err(e);
            }
        }

        self.write_target = Some(WriteTarget {
            service,
            characteristic,
        });
        self.state = TransportState::Ready;
        info!("Transport ready on {device}");
        Ok(())
    }

    async fn resolve_write_target(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(), EtiquetaError> {
        let resolution_failed = |source: BridgeError| EtiquetaError::ServiceResolutionFailed {
            device: device.clone(),
            source,
        };

        let services = self
            .bridge
            .services(device)
            .await
            .map_err(resolution_failed)?;
        if !services.contains(&service) {
            return Err(resolution_failed(BridgeError::new(format!(
                "Service {service} not present on device"
            ))));
        }

        let characteristics = self
            .bridge
            .characteristics(device, service)
            .await
            .map_err(resolution_failed)?;
        if !characteristics.contains(&characteristic) {
            return Err(resolution_failed(BridgeError::new(format!(
                "Characteristic {characteristic} not present in service {service}"
            ))));
        }
        Ok(())
    }

    /// Stream a command buffer to the connected printer.
    ///
    /// The buffer is split into chunks of at most [`WRITE_CHUNK_SIZE`]
    /// bytes, written strictly in order. The printer's BLE module rejects
    /// back-to-back GATT writes, so the loop sleeps [`INTER_CHUNK_DELAY`]
    /// after every chunk, the last one included.
    ///
    /// The first failed chunk aborts the remainder and reports which
    /// chunk died; no partial resume is attempted. The connection itself
    /// stays `Ready`, so the caller chooses between retrying the whole
    /// buffer and closing.
    pub async fn write(&mut self, buffer: &[u8]) -> Result<(), EtiquetaError> {
        if self.state != TransportState::Ready {
            return Err(EtiquetaError::InvalidState {
                op: "write",
                state: self.state,
            });
        }
        let (device, target) = match (self.current.clone(), self.write_target) {
            (Some(device), Some(target)) => (device, target),
            _ => {
                return Err(EtiquetaError::InvalidState {
                    op: "write",
                    state: self.state,
                })
            }
        };

        let total = buffer.len().div_ceil(WRITE_CHUNK_SIZE);
        debug!("Writing {} bytes to {device} in {total} chunks", buffer.len());
        for (index, chunk) in buffer.chunks(WRITE_CHUNK_SIZE).enumerate() {
            self.bridge
                .write_characteristic(&device, target.service, target.characteristic, chunk)
                .await
                .map_err(|source| EtiquetaError::ChunkWriteFailed {
                    index,
                    total,
                    source,
                })?;
            tokio::time::sleep(INTER_CHUNK_DELAY).await;
        }
        debug!("Write of {} bytes complete", buffer.len());
        Ok(())
    }

    /// Release the current connection and return to `Idle`.
    ///
    /// Safe in any state and a no-op without a connection. A bridge
    /// failure during disconnect is reported, but local state is reset
    /// to `Idle` regardless, so a fresh `open` always works afterwards.
    pub async fn close(&mut self) -> Result<(), EtiquetaError> {
        let Some(device) = self.current.take() else {
            self.state = TransportState::Idle;
            return Ok(());
        };

        self.state = TransportState::Closing;
        info!("Disconnecting from {device}");
        let result = self.bridge.disconnect(&device).await;
        self.write_target = None;
        self.state = TransportState::Idle;
        result.map_err(|source| EtiquetaError::DisconnectFailed { device, source })
    }

    /// Next discovery report, in arrival order.
    ///
    /// Reports buffer while discovery runs, so polling late loses
    /// nothing. The same device reappears whenever it advertises again.
    pub async fn next_device(&mut self) -> Option<DiscoveredDevice> {
        self.devices.recv().await
    }

    /// Next connection establishment or loss event.
    ///
    /// Losing the current device's connection folds transport state to
    /// `Closed`; events for other devices are passed through untouched.
    pub async fn next_connection_change(&mut self) -> Option<ConnectionChange> {
        let change = self.connection_events.recv().await?;
        if !change.connected && self.current.as_ref() == Some(&change.device) {
            warn!("Connection to {} lost", change.device);
            self.current = None;
            self.write_target = None;
            self.state = TransportState::Closed;
        }
        Some(change)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::transport::bridge::{
        AdapterState, BridgeCapabilities, ConnectionListener, DeviceFoundListener,
    };
    use crate::transport::sink::ByteSink;

    const SERVICE: Uuid = Uuid::from_u128(0x0000FF00_0000_1000_8000_00805F9B34FB);
    const CHARACTERISTIC: Uuid = Uuid::from_u128(0x0000FF02_0000_1000_8000_00805F9B34FB);

    fn device() -> DeviceId {
        DeviceId::new("AA:BB:CC:DD:EE:FF")
    }

    #[derive(Default)]
    struct MockState {
        adapter_available: bool,
        init_succeeds: bool,
        init_calls: usize,
        scans_started: Vec<Vec<Uuid>>,
        scans_stopped: usize,
        connected: Vec<DeviceId>,
        connect_fails: bool,
        disconnected: Vec<DeviceId>,
        services: Vec<Uuid>,
        service_lookups: usize,
        characteristics: Vec<Uuid>,
        characteristic_lookups: usize,
        writes: Vec<Vec<u8>>,
        fail_write_at: Option<usize>,
        device_listeners: Vec<DeviceFoundListener>,
        connection_listeners: Vec<ConnectionListener>,
    }

    #[derive(Clone)]
    struct MockBridge {
        needs_resolution: bool,
        state: Arc<Mutex<MockState>>,
    }

    impl MockBridge {
        fn new(adapter_available: bool) -> Self {
            let state = MockState {
                adapter_available,
                init_succeeds: true,
                services: vec![SERVICE],
                characteristics: vec![CHARACTERISTIC],
                ..Default::default()
            };
            Self {
                needs_resolution: false,
                state: Arc::new(Mutex::new(state)),
            }
        }

        fn with_resolution(mut self) -> Self {
            self.needs_resolution = true;
            self
        }

        fn fire_device(&self, report: DiscoveredDevice) {
            for listener in &self.state.lock().unwrap().device_listeners {
                listener(report.clone());
            }
        }

        fn fire_connection(&self, change: ConnectionChange) {
            for listener in &self.state.lock().unwrap().connection_listeners {
                listener(change.clone());
            }
        }
    }

    #[async_trait]
    impl BleBridge for MockBridge {
        fn capabilities(&self) -> BridgeCapabilities {
            BridgeCapabilities {
                needs_service_resolution: self.needs_resolution,
                byte_sink: ByteSink::Unsigned,
            }
        }

        async fn init_adapter(&self) -> Result<(), BridgeError> {
            let mut s = self.state.lock().unwrap();
            s.init_calls += 1;
            if s.init_succeeds {
                s.adapter_available = true;
                Ok(())
            } else {
                Err(BridgeError::new("Adapter will not power on"))
            }
        }

        async fn adapter_state(&self) -> Result<AdapterState, BridgeError> {
            Ok(AdapterState {
                available: self.state.lock().unwrap().adapter_available,
            })
        }

        async fn start_discovery(&self, service_ids: &[Uuid]) -> Result<(), BridgeError> {
            self.state
                .lock()
                .unwrap()
                .scans_started
                .push(service_ids.to_vec());
            Ok(())
        }

        async fn stop_discovery(&self) -> Result<(), BridgeError> {
            self.state.lock().unwrap().scans_stopped += 1;
            Ok(())
        }

        fn on_device_found(&self, listener: DeviceFoundListener) {
            self.state.lock().unwrap().device_listeners.push(listener);
        }

        fn on_connection_state_change(&self, listener: ConnectionListener) {
            self.state.lock().unwrap().connection_listeners.push(listener);
        }

        async fn connect(&self, device: &DeviceId) -> Result<(), BridgeError> {
            let mut s = self.state.lock().unwrap();
            if s.connect_fails {
                return Err(BridgeError::new("Connection refused"));
            }
            s.connected.push(device.clone());
            Ok(())
        }

        async fn disconnect(&self, device: &DeviceId) -> Result<(), BridgeError> {
            self.state.lock().unwrap().disconnected.push(device.clone());
            Ok(())
        }

        async fn services(&self, _device: &DeviceId) -> Result<Vec<Uuid>, BridgeError> {
            let mut s = self.state.lock().unwrap();
            s.service_lookups += 1;
            Ok(s.services.clone())
        }

        async fn characteristics(
            &self,
            _device: &DeviceId,
            _service: Uuid,
        ) -> Result<Vec<Uuid>, BridgeError> {
            let mut s = self.state.lock().unwrap();
            s.characteristic_lookups += 1;
            Ok(s.characteristics.clone())
        }

        async fn write_characteristic(
            &self,
            _device: &DeviceId,
            _service: Uuid,
            _characteristic: Uuid,
            bytes: &[u8],
        ) -> Result<(), BridgeError> {
            let mut s = self.state.lock().unwrap();
            let index = s.writes.len();
            s.writes.push(bytes.to_vec());
            if s.fail_write_at == Some(index) {
                return Err(BridgeError::new("GATT write rejected"));
            }
            Ok(())
        }
    }

    async fn ready_transport(bridge: MockBridge) -> BleTransport<MockBridge> {
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();
        transport
            .connect(&device(), SERVICE, CHARACTERISTIC)
            .await
            .unwrap();
        transport
    }

    #[tokio::test]
    async fn test_open_starts_filtered_discovery() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);

        transport.open(&[SERVICE]).await.unwrap();

        assert_eq!(transport.state(), TransportState::Scanning);
        let s = probe.state.lock().unwrap();
        assert_eq!(s.scans_started, vec![vec![SERVICE]]);
        assert_eq!(s.init_calls, 0);
    }

    #[tokio::test]
    async fn test_open_initializes_adapter_when_down() {
        let bridge = MockBridge::new(false);
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);

        transport.open(&[]).await.unwrap();

        assert_eq!(transport.state(), TransportState::Scanning);
        assert_eq!(probe.state.lock().unwrap().init_calls, 1);
    }

    #[tokio::test]
    async fn test_open_fatal_when_adapter_stays_down() {
        let bridge = MockBridge::new(false);
        bridge.state.lock().unwrap().init_succeeds = false;
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);

        let err = transport.open(&[SERVICE]).await.unwrap_err();

        assert!(matches!(err, EtiquetaError::AdapterUnavailable(_)));
        assert_eq!(transport.state(), TransportState::Failed);
        assert!(probe.state.lock().unwrap().scans_started.is_empty());
    }

    #[tokio::test]
    async fn test_open_may_be_reissued_after_failure() {
        let bridge = MockBridge::new(false);
        bridge.state.lock().unwrap().init_succeeds = false;
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);

        transport.open(&[SERVICE]).await.unwrap_err();
        probe.state.lock().unwrap().init_succeeds = true;
        transport.open(&[SERVICE]).await.unwrap();

        assert_eq!(transport.state(), TransportState::Scanning);
        assert_eq!(probe.state.lock().unwrap().init_calls, 2);
    }

    #[tokio::test]
    async fn test_open_rejected_while_connected() {
        let bridge = MockBridge::new(true);
        let mut transport = ready_transport(bridge).await;

        let err = transport.open(&[SERVICE]).await.unwrap_err();

        assert!(matches!(
            err,
            EtiquetaError::InvalidState { op: "open", .. }
        ));
        assert_eq!(transport.state(), TransportState::Ready);
    }

    #[tokio::test]
    async fn test_connect_marks_ready_and_stops_discovery() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let transport = ready_transport(bridge).await;

        assert_eq!(transport.state(), TransportState::Ready);
        assert_eq!(transport.current_device(), Some(&device()));
        let s = probe.state.lock().unwrap();
        assert_eq!(s.connected, vec![device()]);
        assert_eq!(s.scans_stopped, 1);
    }

    #[tokio::test]
    async fn test_connect_requires_active_discovery() {
        let bridge = MockBridge::new(true);
        let mut transport = BleTransport::new(bridge);

        let err = transport
            .connect(&device(), SERVICE, CHARACTERISTIC)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EtiquetaError::InvalidState { op: "connect", .. }
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_reports_device() {
        let bridge = MockBridge::new(true);
        bridge.state.lock().unwrap().connect_fails = true;
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();

        let err = transport
            .connect(&device(), SERVICE, CHARACTERISTIC)
            .await
            .unwrap_err();

        assert!(matches!(err, EtiquetaError::ConnectFailed { .. }));
        assert_eq!(transport.state(), TransportState::Failed);
        assert_eq!(transport.current_device(), None);
    }

    #[tokio::test]
    async fn test_resolution_skipped_without_capability() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let transport = ready_transport(bridge).await;

        assert_eq!(transport.state(), TransportState::Ready);
        let s = probe.state.lock().unwrap();
        assert_eq!(s.service_lookups, 0);
        assert_eq!(s.characteristic_lookups, 0);
    }

    #[tokio::test]
    async fn test_resolution_runs_when_required() {
        let bridge = MockBridge::new(true).with_resolution();
        let probe = bridge.clone();
        let transport = ready_transport(bridge).await;

        assert_eq!(transport.state(), TransportState::Ready);
        let s = probe.state.lock().unwrap();
        assert_eq!(s.service_lookups, 1);
        assert_eq!(s.characteristic_lookups, 1);
    }

    #[tokio::test]
    async fn test_resolution_fails_on_missing_service() {
        let bridge = MockBridge::new(true).with_resolution();
        bridge.state.lock().unwrap().services = vec![Uuid::from_u128(0xDEAD)];
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();

        let err = transport
            .connect(&device(), SERVICE, CHARACTERISTIC)
            .await
            .unwrap_err();

        assert!(matches!(err, EtiquetaError::ServiceResolutionFailed { .. }));
        assert_eq!(transport.state(), TransportState::Failed);
    }

    #[tokio::test]
    async fn test_resolution_fails_on_missing_characteristic() {
        let bridge = MockBridge::new(true).with_resolution();
        bridge.state.lock().unwrap().characteristics = vec![];
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();

        let err = transport
            .connect(&device(), SERVICE, CHARACTERISTIC)
            .await
            .unwrap_err();

        assert!(matches!(err, EtiquetaError::ServiceResolutionFailed { .. }));
        assert_eq!(transport.state(), TransportState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_chunks_preserve_order_and_size() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        let buffer: Vec<u8> = (0..45u8).collect();
        transport.write(&buffer).await.unwrap();

        let s = probe.state.lock().unwrap();
        assert_eq!(s.writes.len(), 3); // ceil(45 / 20)
        assert!(s.writes.iter().all(|c| c.len() <= WRITE_CHUNK_SIZE));
        assert_eq!(s.writes[0].len(), 20);
        assert_eq!(s.writes[1].len(), 20);
        assert_eq!(s.writes[2].len(), 5);
        assert_eq!(s.writes.concat(), buffer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_paces_every_chunk() {
        let bridge = MockBridge::new(true);
        let mut transport = ready_transport(bridge).await;

        let started = tokio::time::Instant::now();
        transport.write(&[0u8; 45]).await.unwrap();
        // Three chunks, one delay each, the final chunk included
        assert_eq!(started.elapsed(), Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        transport.write(&[0u8; 5]).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_fails_fast_on_rejected_chunk() {
        let bridge = MockBridge::new(true);
        bridge.state.lock().unwrap().fail_write_at = Some(1);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        let err = transport.write(&[0u8; 50]).await.unwrap_err();

        match err {
            EtiquetaError::ChunkWriteFailed { index, total, .. } => {
                assert_eq!(index, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Chunk 2 was never attempted
        assert_eq!(probe.state.lock().unwrap().writes.len(), 2);
        // The connection itself is still up
        assert_eq!(transport.state(), TransportState::Ready);
    }

    #[tokio::test]
    async fn test_write_requires_ready() {
        let bridge = MockBridge::new(true);
        let mut transport = BleTransport::new(bridge);

        let err = transport.write(b"CLS\r\n").await.unwrap_err();

        assert!(matches!(
            err,
            EtiquetaError::InvalidState { op: "write", .. }
        ));
    }

    #[tokio::test]
    async fn test_write_empty_buffer_is_a_noop() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        transport.write(&[]).await.unwrap();

        assert!(probe.state.lock().unwrap().writes.is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_connection() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        transport.close().await.unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert_eq!(transport.current_device(), None);
        assert_eq!(probe.state.lock().unwrap().disconnected, vec![device()]);
    }

    #[tokio::test]
    async fn test_close_without_connection_is_a_noop() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);

        transport.close().await.unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(probe.state.lock().unwrap().disconnected.is_empty());
    }

    #[tokio::test]
    async fn test_stop_discovery_returns_to_idle() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();

        transport.stop_discovery().await.unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert_eq!(probe.state.lock().unwrap().scans_stopped, 1);
    }

    #[tokio::test]
    async fn test_discovery_reports_buffer_until_polled() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = BleTransport::new(bridge);
        transport.open(&[SERVICE]).await.unwrap();

        probe.fire_device(DiscoveredDevice {
            id: DeviceId::new("11:11"),
            name: Some("HM-A300".to_string()),
            rssi: Some(-41),
        });
        probe.fire_device(DiscoveredDevice {
            id: DeviceId::new("22:22"),
            name: None,
            rssi: None,
        });

        let first = transport.next_device().await.unwrap();
        let second = transport.next_device().await.unwrap();
        assert_eq!(first.id, DeviceId::new("11:11"));
        assert_eq!(first.name.as_deref(), Some("HM-A300"));
        assert_eq!(second.id, DeviceId::new("22:22"));
    }

    #[tokio::test]
    async fn test_losing_current_connection_closes_transport() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        probe.fire_connection(ConnectionChange {
            device: device(),
            connected: false,
        });

        let change = transport.next_connection_change().await.unwrap();
        assert!(!change.connected);
        assert_eq!(transport.state(), TransportState::Closed);
        assert_eq!(transport.current_device(), None);
    }

    #[tokio::test]
    async fn test_disconnect_of_other_device_is_passed_through() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        probe.fire_connection(ConnectionChange {
            device: DeviceId::new("99:99"),
            connected: false,
        });

        let change = transport.next_connection_change().await.unwrap();
        assert_eq!(change.device, DeviceId::new("99:99"));
        assert_eq!(transport.state(), TransportState::Ready);
        assert_eq!(transport.current_device(), Some(&device()));
    }

    #[tokio::test]
    async fn test_reopen_after_connection_loss() {
        let bridge = MockBridge::new(true);
        let probe = bridge.clone();
        let mut transport = ready_transport(bridge).await;

        probe.fire_connection(ConnectionChange {
            device: device(),
            connected: false,
        });
        transport.next_connection_change().await.unwrap();
        assert_eq!(transport.state(), TransportState::Closed);

        transport.open(&[SERVICE]).await.unwrap();
        assert_eq!(transport.state(), TransportState::Scanning);
    }
}
