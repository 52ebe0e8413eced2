//! Stream instantaneous power from BLE cycling power sensors.
//!
//! The crate scans for a trainer or power meter by name, connects to it,
//! locates the Cycling Power Service and subscribes to its measurement
//! characteristic. Every notification is decoded into a [`PowerReading`].
//!
//! ## Usage
//!
//! Here is an example on how to print the power of the first Elite trainer
//! found until Ctrl-C is pressed:
//!
//! ```rust,no_run
//! use cycling_power::{AdapterConfig, BtleplugAdapter, Error, Orchestrator, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     pretty_env_logger::init();
//!
//!     let adapter = BtleplugAdapter::new(AdapterConfig::default()).await?;
//!     let mut orchestrator = Orchestrator::new(adapter, SessionConfig::default());
//!
//!     let shutdown = async {
//!         tokio::signal::ctrl_c().await.ok();
//!     };
//!     orchestrator
//!         .stream_until(shutdown, |reading| println!("Current power: {}", reading))
//!         .await
//! }
//!```

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use adapter::{
    BleAdapter, CharacteristicDescriptor, DeviceDescriptor, NotificationStream, ServiceDescriptor,
};
pub use btle::{AdapterConfig, BtleplugAdapter};
pub use error::{AdapterError, DecodeError, Error, ErrorKind, ResolveError, Result};
pub use filter::DeviceFilter;
pub use gatt::GattResolver;
pub use measurement::{decode, decode_at, PowerReading};
pub use scanner::{ScanConfig, Scanner};
pub use session::{ConnectionSession, ConnectionState, Orchestrator, PowerReadings, SessionConfig};

mod adapter;
mod btle;
mod error;
mod filter;
mod gatt;
mod measurement;
mod scanner;
mod session;

pub mod common;
