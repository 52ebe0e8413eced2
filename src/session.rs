//! The connection flow: scan, connect, resolve, subscribe, stream, close.
//!
//! An [`Orchestrator`] owns at most one [`ConnectionSession`] at a time. A
//! session is only stored once notifications are flowing; every step that
//! fails before that releases what was already acquired, newest first.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use stream_cancel::{Trigger, Valved};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::adapter::{BleAdapter, CharacteristicDescriptor, NotificationStream, ServiceDescriptor};
use crate::common::{characteristics, services};
use crate::error::{AdapterError, DecodeError, Error, ErrorKind};
use crate::gatt::GattResolver;
use crate::measurement::{self, PowerReading};
use crate::scanner::{ScanConfig, Scanner};

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Decoded readings of a streaming session, in notification order.
pub type PowerReadings = ReceiverStream<Result<PowerReading, DecodeError>>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How the device is discovered.
    scan: ScanConfig,
    /// Service holding the measurement characteristic.
    service: Uuid,
    /// Characteristic streaming the power measurements.
    measurement: Uuid,
    /// Readings buffered before new ones are dropped.
    queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            service: services::CYCLING_POWER,
            measurement: characteristics::CYCLING_POWER_MEASUREMENT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    pub fn service(mut self, uuid: Uuid) -> Self {
        self.service = uuid;
        self
    }

    pub fn measurement_characteristic(mut self, uuid: Uuid) -> Self {
        self.measurement = uuid;
        self
    }

    /// Number of undelivered readings kept for a slow consumer
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Scanning,
    Connecting,
    ServicesResolving,
    CharacteristicResolving,
    Subscribing,
    Streaming,
    Closed,
    Failed(ErrorKind),
}

/// Everything acquired on a device, released newest first.
///
/// Dropping an armed `Acquired` hands the teardown to the current tokio
/// runtime, so an abandoned `start()` or a dropped orchestrator does not
/// leave the device connected.
struct Acquired<A: BleAdapter> {
    adapter: Arc<A>,
    device: A::Device,
    /// False when the link existed before this session; it is then left up.
    established: bool,
    notifying: Option<CharacteristicDescriptor<A::Characteristic>>,
    handler: Option<(Trigger, JoinHandle<()>)>,
    armed: bool,
}

impl<A: BleAdapter> Acquired<A> {
    fn new(adapter: Arc<A>, device: A::Device, established: bool) -> Self {
        Self {
            adapter,
            device,
            established,
            notifying: None,
            handler: None,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;
        teardown(
            &*self.adapter,
            &self.device,
            self.established,
            self.notifying.take(),
            self.handler.take(),
        )
        .await;
    }
}

impl<A: BleAdapter> Drop for Acquired<A> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let adapter = self.adapter.clone();
        let device = self.device.clone();
        let established = self.established;
        let notifying = self.notifying.take();
        let handler = self.handler.take();

        match Handle::try_current() {
            Ok(runtime) => {
                log::debug!("Releasing abandoned connection to {:?}", device);
                runtime.spawn(async move {
                    teardown(&*adapter, &device, established, notifying, handler).await;
                });
            }
            Err(_) => log::warn!("No runtime to release {:?}, left connected", device),
        }
    }
}

async fn teardown<A: BleAdapter>(
    adapter: &A,
    device: &A::Device,
    established: bool,
    notifying: Option<CharacteristicDescriptor<A::Characteristic>>,
    handler: Option<(Trigger, JoinHandle<()>)>,
) {
    // The handler must be gone before the device handle is released.
    if let Some((stopper, pump)) = handler {
        drop(stopper);
        if let Err(e) = pump.await {
            log::warn!("Notification handler ended abnormally: {}", e);
        }
    }

    if let Some(characteristic) = notifying {
        if let Err(e) = adapter.disable_notify(device, &characteristic).await {
            log::warn!("Failed to disable notifications: {}", e);
        }
    }

    if !established {
        log::debug!("Leaving pre-existing link to {:?} up", device);
        return;
    }

    log::debug!("Disconnecting from {:?}", device);
    if let Err(e) = adapter.disconnect(device).await {
        log::warn!("Failed to disconnect from {:?}: {}", device, e);
    }
}

/// A connected, subscribed device.
pub struct ConnectionSession<A: BleAdapter> {
    service: ServiceDescriptor<A::Service>,
    characteristic: CharacteristicDescriptor<A::Characteristic>,
    acquired: Acquired<A>,
}

impl<A: BleAdapter> ConnectionSession<A> {
    pub fn device(&self) -> &A::Device {
        &self.acquired.device
    }

    pub fn service(&self) -> &ServiceDescriptor<A::Service> {
        &self.service
    }

    pub fn characteristic(&self) -> &CharacteristicDescriptor<A::Characteristic> {
        &self.characteristic
    }

    async fn close(self) {
        self.acquired.release().await;
    }
}

pub struct Orchestrator<A: BleAdapter> {
    adapter: Arc<A>,
    config: SessionConfig,
    state: ConnectionState,
    session: Option<ConnectionSession<A>>,
}

impl<A: BleAdapter> Orchestrator<A> {
    pub fn new(adapter: A, config: SessionConfig) -> Self {
        Self {
            adapter: Arc::new(adapter),
            config,
            state: ConnectionState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn session(&self) -> Option<&ConnectionSession<A>> {
        self.session.as_ref()
    }

    /// Find, connect and subscribe to a power sensor.
    ///
    /// On success the session is kept until [`stop`](Self::stop) and the
    /// returned stream yields one item per notification. A malformed
    /// notification shows up as a [`DecodeError`] item without ending the
    /// stream.
    ///
    /// Dropping the returned future part way releases whatever was already
    /// acquired in the background.
    pub async fn start(&mut self) -> Result<PowerReadings, Error> {
        if self.session.is_some() {
            return Err(Error::SessionActive);
        }

        match self.open().await {
            Ok((session, readings)) => {
                self.session = Some(session);
                self.transition(ConnectionState::Streaming);
                Ok(readings)
            }
            Err(e) => {
                log::error!("{}", e);
                self.transition(ConnectionState::Failed(e.kind()));
                Err(e)
            }
        }
    }

    /// Deregister the notification handler and release the device.
    pub async fn stop(&mut self) {
        match self.session.take() {
            Some(session) => {
                session.close().await;
                self.transition(ConnectionState::Closed);
            }
            None => log::info!("No active session to stop"),
        }
    }

    /// Stream readings into `on_reading` until `shutdown` resolves or the
    /// device stops sending, then close the session.
    ///
    /// `shutdown` is also honoured while the sensor is still being searched
    /// for or connected.
    pub async fn stream_until<F>(
        &mut self,
        shutdown: F,
        mut on_reading: impl FnMut(PowerReading),
    ) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let started = tokio::select! {
            result = self.start() => Some(result),
            _ = &mut shutdown => None,
        };
        let mut readings = match started {
            Some(result) => result?,
            None => {
                log::info!("Stop requested before streaming started");
                self.transition(ConnectionState::Closed);
                return Ok(());
            }
        };

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stop requested");
                    break;
                }
                item = readings.next() => match item {
                    Some(Ok(reading)) => on_reading(reading),
                    Some(Err(e)) => log::warn!("Skipping notification: {}", e),
                    None => {
                        log::warn!("Notification feed ended");
                        break;
                    }
                },
            }
        }

        self.stop().await;
        Ok(())
    }

    async fn open(&mut self) -> Result<(ConnectionSession<A>, PowerReadings), Error> {
        self.transition(ConnectionState::Scanning);
        let descriptor = Scanner::new(self.config.scan.clone())
            .scan(&*self.adapter)
            .await?;

        self.transition(ConnectionState::Connecting);
        let label = descriptor.label();
        let device = match self.adapter.connect(&descriptor.id).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                return Err(Error::Connection {
                    device: label,
                    source: AdapterError::NoHandle,
                })
            }
            Err(source) => {
                return Err(Error::Connection {
                    device: label,
                    source,
                })
            }
        };

        log::info!(
            "Connected to {} (id: {:?}, already connected: {})",
            label,
            descriptor.id,
            descriptor.is_connected
        );

        let mut acquired = Acquired::new(self.adapter.clone(), device, !descriptor.is_connected);

        match self.subscribe(&mut acquired).await {
            Ok((service, characteristic, readings)) => {
                let session = ConnectionSession {
                    service,
                    characteristic,
                    acquired,
                };
                Ok((session, readings))
            }
            Err(e) => {
                acquired.release().await;
                Err(e)
            }
        }
    }

    async fn subscribe(
        &mut self,
        acquired: &mut Acquired<A>,
    ) -> Result<
        (
            ServiceDescriptor<A::Service>,
            CharacteristicDescriptor<A::Characteristic>,
            PowerReadings,
        ),
        Error,
    > {
        let adapter = &*self.adapter;
        let device = &acquired.device;

        self.state = log_transition(self.state, ConnectionState::ServicesResolving);
        let service = GattResolver::resolve_service(adapter, device, self.config.service)
            .await
            .map_err(Error::ServiceDiscovery)?;

        self.state = log_transition(self.state, ConnectionState::CharacteristicResolving);
        let characteristic =
            GattResolver::resolve_characteristic(adapter, device, &service, self.config.measurement)
                .await
                .map_err(Error::CharacteristicNotFound)?;

        self.state = log_transition(self.state, ConnectionState::Subscribing);
        adapter
            .enable_notify(device, &characteristic)
            .await
            .map_err(Error::Subscription)?;
        acquired.notifying = Some(characteristic.clone());

        let notifications = adapter
            .notifications(device, &characteristic)
            .await
            .map_err(Error::Subscription)?;

        let (handler_stopper, readings, pump) =
            spawn_notification_pump(notifications, self.config.queue_capacity);
        acquired.handler = Some((handler_stopper, pump));

        log::info!("Subscribed to power measurements");

        Ok((service, characteristic, readings))
    }

    fn transition(&mut self, next: ConnectionState) {
        self.state = log_transition(self.state, next);
    }
}

fn log_transition(current: ConnectionState, next: ConnectionState) -> ConnectionState {
    log::debug!("Connection state: {:?} -> {:?}", current, next);
    next
}

/// Decode notifications on their own task so delivery never waits on the
/// consumer. Readings that do not fit in the queue are dropped.
fn spawn_notification_pump(
    notifications: NotificationStream,
    capacity: usize,
) -> (Trigger, PowerReadings, JoinHandle<()>) {
    let (stopper, mut notifications) = Valved::new(notifications);
    let (sender, receiver) = mpsc::channel(capacity.max(1));

    let pump = tokio::spawn(async move {
        while let Some(payload) = notifications.next().await {
            let reading = measurement::decode(&payload);
            if reading.is_err() {
                log::trace!("Malformed power notification: {:02x?}", payload);
            }

            match sender.try_send(reading) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Reading queue full, dropping notification")
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("Reading consumer went away");
                    break;
                }
            }
        }

        log::debug!("Notification handler stopped");
    });

    (stopper, ReceiverStream::new(receiver), pump)
}
