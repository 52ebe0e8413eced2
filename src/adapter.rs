use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::error::AdapterError;

/// Raw notification payloads of a subscribed characteristic.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// A device seen during a discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor<I> {
    pub id: I,
    /// Advertised local name, if any.
    pub name: Option<String>,
    pub is_connected: bool,
}

impl<I: Debug> DeviceDescriptor<I> {
    /// Name if advertised, otherwise the platform id.
    pub fn label(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("{:?}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor<S> {
    pub uuid: Uuid,
    pub handle: S,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDescriptor<C> {
    pub uuid: Uuid,
    pub handle: C,
}

/// The BLE capabilities the connection flow needs from a platform stack.
///
/// Handles returned by one call are only meaningful to the same adapter, and
/// service/characteristic handles are only valid while their device stays
/// connected.
#[async_trait]
pub trait BleAdapter: Send + Sync + 'static {
    type DeviceId: Debug + Clone + Send + Sync + 'static;
    type Device: Debug + Clone + Send + Sync + 'static;
    type Service: Clone + Send + Sync + 'static;
    type Characteristic: Clone + Send + Sync + 'static;

    /// Query all visible peripherals, without any protocol pre-filter.
    async fn scan_devices(&self) -> Result<Vec<DeviceDescriptor<Self::DeviceId>>, AdapterError>;

    /// Acquire a connected handle. `None` means the platform gave no handle.
    async fn connect(&self, id: &Self::DeviceId) -> Result<Option<Self::Device>, AdapterError>;

    async fn list_services(
        &self,
        device: &Self::Device,
    ) -> Result<Vec<ServiceDescriptor<Self::Service>>, AdapterError>;

    async fn list_characteristics(
        &self,
        device: &Self::Device,
        service: &ServiceDescriptor<Self::Service>,
    ) -> Result<Vec<CharacteristicDescriptor<Self::Characteristic>>, AdapterError>;

    /// Write the client characteristic configuration descriptor in notify mode.
    async fn enable_notify(
        &self,
        device: &Self::Device,
        characteristic: &CharacteristicDescriptor<Self::Characteristic>,
    ) -> Result<(), AdapterError>;

    /// Payloads delivered for `characteristic` once notify is enabled.
    async fn notifications(
        &self,
        device: &Self::Device,
        characteristic: &CharacteristicDescriptor<Self::Characteristic>,
    ) -> Result<NotificationStream, AdapterError>;

    async fn disable_notify(
        &self,
        device: &Self::Device,
        characteristic: &CharacteristicDescriptor<Self::Characteristic>,
    ) -> Result<(), AdapterError>;

    /// Release a handle obtained from [`connect`](BleAdapter::connect).
    async fn disconnect(&self, device: &Self::Device) -> Result<(), AdapterError>;
}
