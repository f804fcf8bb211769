//! A USB CDC-ACM device as a duplex byte stream.
//!
//! `webusb-serial` drives a USB serial board (Arduino Leonardo and Micro,
//! Adafruit Circuit Playground, or anything else exposing the same
//! interface layout) through a platform USB transport, and exposes it as a
//! [`SerialPort`] with `write` / `close` / `flush` / `drain` operations and
//! `open` / `data` / `error` [`Event`]s.
//!
//! ## Usage overview
//!
//! Create a port with [`SerialPort::new`], passing a [`UsbBackend`] and
//! [`SerialPortOptions`]. This returns the port together with a
//! [`Connection`] future. Spawn the connection: it selects a device matching
//! the options' [`DeviceFilter`]s (or uses the device given with
//! [`SerialPortOptions::with_device`]), opens it, selects configuration 1,
//! claims interface 2 and activates the line with a `SET_CONTROL_LINE_STATE`
//! request. Subscribers then receive [`Event::Open`], followed by
//! [`Event::Data`] for every bulk IN transfer on endpoint 5, until a transfer
//! fails ([`Event::Error`]) or the port is closed.
//!
//! [`SerialPort::write`] sends bytes with a bulk OUT transfer on endpoint 4
//! and returns the result directly. [`SerialPort::close`] stops the read
//! loop, deactivates the line and closes the device.
//!
//! On wasm targets, [`platform::WebUsb`] implements the transport with the
//! browser's WebUSB API, and `SerialPort::spawn_local` creates a port and
//! spawns its connection in one step.
//!
//! ### Logging
//!
//! `webusb-serial` uses the [`log`](https://docs.rs/log) crate to log
//! lifecycle steps and failures, and `tracing` inside the WebUSB backend.

pub mod platform;

mod backend;
pub use backend::{UsbBackend, UsbDevice};

mod cancel;

pub mod control;
pub use control::{ControlOut, ControlType, Recipient};

mod error;
pub use error::{Error, ErrorKind, TransferError};

mod event;
pub use event::{Event, EventStream, SubscriptionId};

mod filter;
pub use filter::{DeviceFilter, DEFAULT_FILTERS};

mod port;
pub use port::{Connection, PortState, SerialPort, SerialPortOptions};

#[cfg(test)]
mod test_util;
