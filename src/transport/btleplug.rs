//! # btleplug Bridge
//!
//! [`BleBridge`] implementation over the cross-platform btleplug stack,
//! driving the first adapter the platform reports.
//!
//! A background task pumps the adapter's event stream: discovery reports
//! land in the peripheral map (so a [`DeviceId`] can be turned back into a
//! btleplug handle later) and fan out to registered listeners, as do
//! connection and disconnection events.
//!
//! btleplug resolves GATT lazily, so the capability flags request an
//! explicit service-resolution pass after connect. Writes go out
//! with-response, which is what gives the transport its per-chunk
//! completion acknowledgment.
//!
//! Everything here talks to a real radio; the transport's behavior against
//! this interface is tested with a mock bridge instead.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::{Stream, StreamExt};
use log::debug;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::transport::bridge::{
    AdapterState, BleBridge, BridgeCapabilities, BridgeError, ConnectionChange,
    ConnectionListener, DeviceFoundListener, DeviceId, DiscoveredDevice,
};
use crate::transport::sink::ByteSink;

type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

#[derive(Default)]
struct Listeners {
    device_found: Vec<DeviceFoundListener>,
    connection: Vec<ConnectionListener>,
}

/// Bridge over the platform's first Bluetooth adapter.
pub struct BtleplugBridge {
    adapter: Adapter,
    peripherals: Arc<Mutex<HashMap<DeviceId, PeripheralId>>>,
    listeners: Arc<Mutex<Listeners>>,
    pump: JoinHandle<()>,
}

impl BtleplugBridge {
    /// Grab the first adapter and start pumping its event stream.
    pub async fn new() -> Result<Self, BridgeError> {
        let manager = Manager::new().await.map_err(bridge_err)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(bridge_err)?
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::new("No Bluetooth adapter present"))?;

        let peripherals = Arc::new(Mutex::new(HashMap::new()));
        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let events = adapter.events().await.map_err(bridge_err)?;
        let pump = tokio::spawn(pump_events(
            adapter.clone(),
            events,
            Arc::clone(&peripherals),
            Arc::clone(&listeners),
        ));

        Ok(Self {
            adapter,
            peripherals,
            listeners,
            pump,
        })
    }

    /// Resolve a [`DeviceId`] back to the btleplug peripheral handle.
    ///
    /// Only devices that appeared in a discovery report are known.
    async fn peripheral(&self, device: &DeviceId) -> Result<Peripheral, BridgeError> {
        let id = self
            .peripherals
            .lock()
            .unwrap()
            .get(device)
            .cloned()
            .ok_or_else(|| BridgeError::new(format!("Device {device} was never discovered")))?;
        self.adapter.peripheral(&id).await.map_err(bridge_err)
    }
}

impl Drop for BtleplugBridge {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump_events(
    adapter: Adapter,
    mut events: EventStream,
    peripherals: Arc<Mutex<HashMap<DeviceId, PeripheralId>>>,
    listeners: Arc<Mutex<Listeners>>,
) {
    while let Some(event) = events.next().await {
        match event {
            // DeviceUpdated re-fires on every advertisement, which keeps
            // RSSI current for callers that sort by signal strength
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                let device = DeviceId::new(id.to_string());
                peripherals
                    .lock()
                    .unwrap()
                    .insert(device.clone(), id.clone());

                let (name, rssi) = match adapter.peripheral(&id).await {
                    Ok(peripheral) => match peripheral.properties().await {
                        Ok(Some(props)) => (props.local_name, props.rssi),
                        _ => (None, None),
                    },
                    Err(_) => (None, None),
                };
                let report = DiscoveredDevice {
                    id: device,
                    name,
                    rssi,
                };
                for listener in &listeners.lock().unwrap().device_found {
                    listener(report.clone());
                }
            }
            CentralEvent::DeviceConnected(id) => notify_connection(&listeners, &id, true),
            CentralEvent::DeviceDisconnected(id) => notify_connection(&listeners, &id, false),
            _ => {}
        }
    }
    debug!("Adapter event stream ended");
}

fn notify_connection(listeners: &Mutex<Listeners>, id: &PeripheralId, connected: bool) {
    let change = ConnectionChange {
        device: DeviceId::new(id.to_string()),
        connected,
    };
    for listener in &listeners.lock().unwrap().connection {
        listener(change.clone());
    }
}

fn bridge_err(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::new(e.to_string())
}

#[async_trait]
impl BleBridge for BtleplugBridge {
    fn capabilities(&self) -> BridgeCapabilities {
        BridgeCapabilities {
            needs_service_resolution: true,
            byte_sink: ByteSink::Unsigned,
        }
    }

    async fn init_adapter(&self) -> Result<(), BridgeError> {
        // btleplug cannot power the radio on, so one more state check is
        // the whole initialization attempt
        let state = self.adapter.adapter_state().await.map_err(bridge_err)?;
        if matches!(state, CentralState::PoweredOn) {
            Ok(())
        } else {
            Err(BridgeError::new("Bluetooth adapter is powered off"))
        }
    }

    async fn adapter_state(&self) -> Result<AdapterState, BridgeError> {
        let state = self.adapter.adapter_state().await.map_err(bridge_err)?;
        Ok(AdapterState {
            available: matches!(state, CentralState::PoweredOn),
        })
    }

    async fn start_discovery(&self, service_ids: &[Uuid]) -> Result<(), BridgeError> {
        let filter = ScanFilter {
            services: service_ids.to_vec(),
        };
        self.adapter.start_scan(filter).await.map_err(bridge_err)
    }

    async fn stop_discovery(&self) -> Result<(), BridgeError> {
        self.adapter.stop_scan().await.map_err(bridge_err)
    }

    fn on_device_found(&self, listener: DeviceFoundListener) {
        self.listeners.lock().unwrap().device_found.push(listener);
    }

    fn on_connection_state_change(&self, listener: ConnectionListener) {
        self.listeners.lock().unwrap().connection.push(listener);
    }

    async fn connect(&self, device: &DeviceId) -> Result<(), BridgeError> {
        self.peripheral(device)
            .await?
            .connect()
            .await
            .map_err(bridge_err)
    }

    async fn disconnect(&self, device: &DeviceId) -> Result<(), BridgeError> {
        self.peripheral(device)
            .await?
            .disconnect()
            .await
            .map_err(bridge_err)
    }

    async fn services(&self, device: &DeviceId) -> Result<Vec<Uuid>, BridgeError> {
        let peripheral = self.peripheral(device).await?;
        peripheral.discover_services().await.map_err(bridge_err)?;
        Ok(peripheral.services().iter().map(|s| s.uuid).collect())
    }

    async fn characteristics(
        &self,
        device: &DeviceId,
        service: Uuid,
    ) -> Result<Vec<Uuid>, BridgeError> {
        let peripheral = self.peripheral(device).await?;
        Ok(peripheral
            .characteristics()
            .into_iter()
            .filter(|c| c.service_uuid == service)
            .map(|c| c.uuid)
            .collect())
    }

    async fn write_characteristic(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        bytes: &[u8],
    ) -> Result<(), BridgeError> {
        let peripheral = self.peripheral(device).await?;
        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or_else(|| {
                BridgeError::new(format!("Characteristic {characteristic} is not resolved"))
            })?;
        peripheral
            .write(&target, bytes, WriteType::WithResponse)
            .await
            .map_err(bridge_err)
    }
}
