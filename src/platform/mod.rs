//! Transport implementations.
//!
//! On wasm targets this provides [`WebUsb`] and [`WebusbDevice`], built on
//! the browser's WebUSB API. Other targets have no built-in transport;
//! implement [`UsbBackend`][crate::UsbBackend] and
//! [`UsbDevice`][crate::UsbDevice] instead.

#[cfg(target_family = "wasm")]
mod webusb;

#[cfg(target_family = "wasm")]
pub use webusb::*;
