#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cycling_power::common::{characteristics, services};
use cycling_power::{
    AdapterError, BleAdapter, CharacteristicDescriptor, DeviceDescriptor, NotificationStream,
    ServiceDescriptor,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Yield to spawned tasks until `done` holds, or give up.
pub async fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}

pub fn device(id: u32, name: &str) -> DeviceDescriptor<u32> {
    DeviceDescriptor {
        id,
        name: Some(name.to_owned()),
        is_connected: false,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub scans: usize,
    pub connects: usize,
    pub disconnects: usize,
    pub enable_notifies: usize,
    pub disable_notifies: usize,
}

struct Script {
    /// One entry per scan; the last one repeats.
    scans: VecDeque<Result<Vec<DeviceDescriptor<u32>>, AdapterError>>,
    connect: Result<Option<u32>, AdapterError>,
    services: Result<Vec<Uuid>, AdapterError>,
    /// `list_services` never answers.
    hang_services: bool,
    characteristics: Result<Vec<Uuid>, AdapterError>,
    enable_notify: Result<(), AdapterError>,
    notifications: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    calls: Calls,
    /// Whether a connected handle is currently held.
    connected: bool,
}

/// Scripted adapter that records how it was driven.
#[derive(Clone)]
pub struct FakeAdapter {
    script: Arc<Mutex<Script>>,
    notify_sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl FakeAdapter {
    /// A healthy power sensor advertising as `name`.
    pub fn with_device(name: &str) -> Self {
        let (notify_sender, receiver) = mpsc::unbounded_channel();
        let script = Script {
            scans: VecDeque::from([Ok(vec![device(1, name)])]),
            connect: Ok(Some(1)),
            services: Ok(vec![services::CYCLING_POWER]),
            hang_services: false,
            characteristics: Ok(vec![
                characteristics::CYCLING_POWER_CONTROL_POINT,
                characteristics::CYCLING_POWER_MEASUREMENT,
            ]),
            enable_notify: Ok(()),
            notifications: Some(receiver),
            calls: Calls::default(),
            connected: false,
        };

        Self {
            script: Arc::new(Mutex::new(script)),
            notify_sender,
        }
    }

    pub fn scans(self, scans: Vec<Result<Vec<DeviceDescriptor<u32>>, AdapterError>>) -> Self {
        self.script.lock().unwrap().scans = scans.into();
        self
    }

    pub fn connect_result(self, result: Result<Option<u32>, AdapterError>) -> Self {
        self.script.lock().unwrap().connect = result;
        self
    }

    pub fn services(self, result: Result<Vec<Uuid>, AdapterError>) -> Self {
        self.script.lock().unwrap().services = result;
        self
    }

    pub fn hanging_services(self) -> Self {
        self.script.lock().unwrap().hang_services = true;
        self
    }

    pub fn characteristics(self, result: Result<Vec<Uuid>, AdapterError>) -> Self {
        self.script.lock().unwrap().characteristics = result;
        self
    }

    pub fn enable_notify_result(self, result: Result<(), AdapterError>) -> Self {
        self.script.lock().unwrap().enable_notify = result;
        self
    }

    pub fn without_notifications(self) -> Self {
        self.script.lock().unwrap().notifications = None;
        self
    }

    pub fn notify(&self, payload: &[u8]) {
        self.notify_sender.send(payload.to_vec()).unwrap();
    }

    pub fn calls(&self) -> Calls {
        self.script.lock().unwrap().calls
    }

    pub fn is_connected(&self) -> bool {
        self.script.lock().unwrap().connected
    }
}

#[async_trait]
impl BleAdapter for FakeAdapter {
    type DeviceId = u32;
    type Device = u32;
    type Service = ();
    type Characteristic = ();

    async fn scan_devices(&self) -> Result<Vec<DeviceDescriptor<u32>>, AdapterError> {
        let mut script = self.script.lock().unwrap();
        script.calls.scans += 1;
        if script.scans.len() > 1 {
            script.scans.pop_front().unwrap()
        } else {
            script.scans.front().cloned().unwrap_or(Ok(Vec::new()))
        }
    }

    async fn connect(&self, _id: &u32) -> Result<Option<u32>, AdapterError> {
        let mut script = self.script.lock().unwrap();
        script.calls.connects += 1;
        let result = script.connect.clone();
        if let Ok(Some(_)) = result {
            script.connected = true;
        }
        result
    }

    async fn list_services(
        &self,
        _device: &u32,
    ) -> Result<Vec<ServiceDescriptor<()>>, AdapterError> {
        let services = {
            let script = self.script.lock().unwrap();
            if script.hang_services {
                None
            } else {
                Some(script.services.clone())
            }
        };

        match services {
            Some(services) => services.map(|uuids| {
                uuids
                    .into_iter()
                    .map(|uuid| ServiceDescriptor { uuid, handle: () })
                    .collect()
            }),
            None => std::future::pending().await,
        }
    }

    async fn list_characteristics(
        &self,
        _device: &u32,
        _service: &ServiceDescriptor<()>,
    ) -> Result<Vec<CharacteristicDescriptor<()>>, AdapterError> {
        let script = self.script.lock().unwrap();
        script.characteristics.clone().map(|uuids| {
            uuids
                .into_iter()
                .map(|uuid| CharacteristicDescriptor { uuid, handle: () })
                .collect()
        })
    }

    async fn enable_notify(
        &self,
        _device: &u32,
        _characteristic: &CharacteristicDescriptor<()>,
    ) -> Result<(), AdapterError> {
        let mut script = self.script.lock().unwrap();
        script.calls.enable_notifies += 1;
        script.enable_notify.clone()
    }

    async fn notifications(
        &self,
        _device: &u32,
        _characteristic: &CharacteristicDescriptor<()>,
    ) -> Result<NotificationStream, AdapterError> {
        let mut script = self.script.lock().unwrap();
        match script.notifications.take() {
            Some(receiver) => Ok(Box::pin(UnboundedReceiverStream::new(receiver))),
            None => Err(AdapterError::Platform("notifications unavailable".into())),
        }
    }

    async fn disable_notify(
        &self,
        _device: &u32,
        _characteristic: &CharacteristicDescriptor<()>,
    ) -> Result<(), AdapterError> {
        self.script.lock().unwrap().calls.disable_notifies += 1;
        Ok(())
    }

    async fn disconnect(&self, _device: &u32) -> Result<(), AdapterError> {
        let mut script = self.script.lock().unwrap();
        script.calls.disconnects += 1;
        script.connected = false;
        Ok(())
    }
}
