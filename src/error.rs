use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no power sensor found after {attempts} scan attempt(s); is it on and advertising?")]
    NotFound { attempts: u32 },

    #[error("failed to connect to {device}: {source}")]
    Connection {
        device: String,
        #[source]
        source: AdapterError,
    },

    #[error("cycling power service unavailable: {0}")]
    ServiceDiscovery(#[source] ResolveError),

    #[error("power measurement characteristic unavailable: {0}")]
    CharacteristicNotFound(#[source] ResolveError),

    #[error("failed to subscribe to power measurements: {0}")]
    Subscription(#[source] AdapterError),

    /// Never returned by the connection flow, which hands decode failures
    /// out as [`PowerReadings`](crate::PowerReadings) items. Lets callers `?`
    /// such an item inside a function returning [`Error`].
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("a connection session is already streaming")]
    SessionActive,

    #[error(transparent)]
    Bluetooth(#[from] btleplug::Error),
}

/// Copyable discriminant of [`Error`], kept by the orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Connection,
    ServiceDiscovery,
    CharacteristicNotFound,
    Subscription,
    Decode,
    SessionActive,
    Bluetooth,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::ServiceDiscovery(_) => ErrorKind::ServiceDiscovery,
            Error::CharacteristicNotFound(_) => ErrorKind::CharacteristicNotFound,
            Error::Subscription(_) => ErrorKind::Subscription,
            Error::Decode(_) => ErrorKind::Decode,
            Error::SessionActive => ErrorKind::SessionActive,
            Error::Bluetooth(_) => ErrorKind::Bluetooth,
        }
    }
}

/// Non-success outcome of a call into a [`BleAdapter`](crate::BleAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("device unreachable")]
    Unreachable,
    #[error("access denied")]
    AccessDenied,
    #[error("adapter returned no device handle")]
    NoHandle,
    #[error("{0}")]
    Platform(String),
}

impl From<btleplug::Error> for AdapterError {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::DeviceNotFound | btleplug::Error::NotConnected => {
                AdapterError::Unreachable
            }
            btleplug::Error::PermissionDenied => AdapterError::AccessDenied,
            other => AdapterError::Platform(other.to_string()),
        }
    }
}

/// Why a GATT lookup failed: the adapter call itself, or a device that
/// simply does not expose the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("enumeration failed: {0}")]
    Enumeration(#[source] AdapterError),
    #[error("{0} not present on device")]
    Missing(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("power measurement payload too short: {len} byte(s), need at least 4")]
    TooShort { len: usize },
}
