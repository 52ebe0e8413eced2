//! [`BleAdapter`] backed by the platform stack through `btleplug`.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, Characteristic as BtleCharacteristic, Manager as _, Peripheral as _, ScanFilter,
    Service as BtleService,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;

use crate::adapter::{
    BleAdapter, CharacteristicDescriptor, DeviceDescriptor, NotificationStream, ServiceDescriptor,
};
use crate::error::{AdapterError, Error};

const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Index of the Bluetooth adapter to use. The first found adapter is used by default.
    adapter_index: usize,
    /// How long a single discovery query listens for advertisements.
    scan_window: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }
}

impl AdapterConfig {
    /// Index of bluetooth adapter to use
    pub fn adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Listen given duration for advertisements on each discovery query
    pub fn scan_window(mut self, window: Duration) -> Self {
        self.scan_window = window;
        self
    }
}

pub struct BtleplugAdapter {
    _manager: Manager,
    adapter: Adapter,
    scan_window: Duration,
}

impl BtleplugAdapter {
    pub async fn new(config: AdapterConfig) -> Result<Self, Error> {
        let manager = Manager::new().await?;
        let mut adapters = manager.adapters().await?;

        if config.adapter_index >= adapters.len() {
            return Err(Error::Bluetooth(btleplug::Error::DeviceNotFound));
        }

        let adapter = adapters.swap_remove(config.adapter_index);

        log::trace!("Using adapter: {:?}", adapter);

        Ok(Self {
            _manager: manager,
            adapter,
            scan_window: config.scan_window,
        })
    }

    async fn describe(peripheral: &Peripheral) -> DeviceDescriptor<PeripheralId> {
        let name = peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|props| props.local_name);

        DeviceDescriptor {
            id: peripheral.id(),
            name,
            is_connected: peripheral.is_connected().await.unwrap_or(false),
        }
    }
}

#[async_trait]
impl BleAdapter for BtleplugAdapter {
    type DeviceId = PeripheralId;
    type Device = Peripheral;
    type Service = BtleService;
    type Characteristic = BtleCharacteristic;

    async fn scan_devices(&self) -> Result<Vec<DeviceDescriptor<PeripheralId>>, AdapterError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_window).await;
        if let Err(e) = self.adapter.stop_scan().await {
            log::debug!("Failed to stop scan: {}", e);
        }

        let mut devices = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            log::trace!("Device discovered: {:?}", peripheral);
            devices.push(Self::describe(&peripheral).await);
        }

        Ok(devices)
    }

    async fn connect(&self, id: &PeripheralId) -> Result<Option<Peripheral>, AdapterError> {
        let peripheral = match self.adapter.peripheral(id).await {
            Ok(peripheral) => peripheral,
            Err(btleplug::Error::DeviceNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !peripheral.is_connected().await? {
            log::debug!("Connecting to device {}", peripheral.address());
            peripheral.connect().await?;
        }

        Ok(Some(peripheral))
    }

    async fn list_services(
        &self,
        device: &Peripheral,
    ) -> Result<Vec<ServiceDescriptor<BtleService>>, AdapterError> {
        let mut services = device.services();
        if services.is_empty() {
            log::debug!("Discovering services for {}", device.address());
            device.discover_services().await?;
            services = device.services();
        }

        Ok(services
            .into_iter()
            .map(|service| ServiceDescriptor {
                uuid: service.uuid,
                handle: service,
            })
            .collect())
    }

    async fn list_characteristics(
        &self,
        _device: &Peripheral,
        service: &ServiceDescriptor<BtleService>,
    ) -> Result<Vec<CharacteristicDescriptor<BtleCharacteristic>>, AdapterError> {
        Ok(service
            .handle
            .characteristics
            .iter()
            .map(|characteristic| CharacteristicDescriptor {
                uuid: characteristic.uuid,
                handle: characteristic.clone(),
            })
            .collect())
    }

    async fn enable_notify(
        &self,
        device: &Peripheral,
        characteristic: &CharacteristicDescriptor<BtleCharacteristic>,
    ) -> Result<(), AdapterError> {
        device.subscribe(&characteristic.handle).await?;
        Ok(())
    }

    async fn notifications(
        &self,
        device: &Peripheral,
        characteristic: &CharacteristicDescriptor<BtleCharacteristic>,
    ) -> Result<NotificationStream, AdapterError> {
        let stream = device.notifications().await?;
        let uuid = characteristic.uuid;

        Ok(Box::pin(stream.filter_map(move |n| async move {
            if n.uuid == uuid {
                Some(n.value)
            } else {
                None
            }
        })))
    }

    async fn disable_notify(
        &self,
        device: &Peripheral,
        characteristic: &CharacteristicDescriptor<BtleCharacteristic>,
    ) -> Result<(), AdapterError> {
        device.unsubscribe(&characteristic.handle).await?;
        Ok(())
    }

    async fn disconnect(&self, device: &Peripheral) -> Result<(), AdapterError> {
        device.disconnect().await?;
        Ok(())
    }
}
