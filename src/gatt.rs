//! Lookup of services and characteristics on a connected device.

use uuid::Uuid;

use crate::adapter::{BleAdapter, CharacteristicDescriptor, ServiceDescriptor};
use crate::error::ResolveError;

pub struct GattResolver;

impl GattResolver {
    /// Find the service with `uuid` on `device`.
    pub async fn resolve_service<A: BleAdapter>(
        adapter: &A,
        device: &A::Device,
        uuid: Uuid,
    ) -> Result<ServiceDescriptor<A::Service>, ResolveError> {
        let services = adapter
            .list_services(device)
            .await
            .map_err(ResolveError::Enumeration)?;

        log::trace!("Device {:?} exposes {} service(s)", device, services.len());

        services
            .into_iter()
            .find(|service| service.uuid == uuid)
            .ok_or(ResolveError::Missing(uuid))
    }

    /// Find the characteristic with `uuid` within `service`.
    pub async fn resolve_characteristic<A: BleAdapter>(
        adapter: &A,
        device: &A::Device,
        service: &ServiceDescriptor<A::Service>,
        uuid: Uuid,
    ) -> Result<CharacteristicDescriptor<A::Characteristic>, ResolveError> {
        let characteristics = adapter
            .list_characteristics(device, service)
            .await
            .map_err(ResolveError::Enumeration)?;

        log::trace!(
            "Service {} exposes {} characteristic(s)",
            service.uuid,
            characteristics.len()
        );

        characteristics
            .into_iter()
            .find(|characteristic| characteristic.uuid == uuid)
            .ok_or(ResolveError::Missing(uuid))
    }
}
