//! Platform USB transport consumed by [`SerialPort`][crate::SerialPort].
//!
//! [`platform::webusb`][crate::platform] implements these traits on top of
//! the browser's WebUSB API. Other transports can be plugged in by
//! implementing them for their own device type.

use std::future::Future;

use crate::{ControlOut, DeviceFilter, Error, TransferError};

/// Source of device handles through interactive, filtered selection.
pub trait UsbBackend {
    /// Device handle produced by this backend.
    type Device: UsbDevice;

    /// Ask the platform to let the user pick a device matching one of `filters`.
    ///
    /// Fails with [`ErrorKind::NotFound`][crate::ErrorKind::NotFound] if no device was chosen.
    fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> impl Future<Output = Result<Self::Device, Error>>;
}

/// Handle to a USB device.
///
/// Clones refer to the same underlying device.
pub trait UsbDevice: Clone + 'static {
    /// Open the device for transfers.
    fn open(&self) -> impl Future<Output = Result<(), Error>>;

    /// `bConfigurationValue` of the active configuration, or `None` if the
    /// device is unconfigured.
    fn configuration_value(&self) -> Option<u8>;

    /// Select a configuration.
    fn select_configuration(&self, configuration: u8) -> impl Future<Output = Result<(), Error>>;

    /// Claim an interface for exclusive use.
    fn claim_interface(&self, interface: u8) -> impl Future<Output = Result<(), Error>>;

    /// Submit a control OUT transfer.
    fn control_out(&self, control: ControlOut<'_>)
        -> impl Future<Output = Result<(), TransferError>>;

    /// Submit a bulk OUT transfer on `endpoint`, returning the number of bytes written.
    fn transfer_out(
        &self,
        endpoint: u8,
        data: &[u8],
    ) -> impl Future<Output = Result<usize, TransferError>>;

    /// Submit a bulk IN transfer on `endpoint` for up to `length` bytes.
    fn transfer_in(
        &self,
        endpoint: u8,
        length: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>>;

    /// Close the device.
    fn close(&self) -> impl Future<Output = Result<(), Error>>;
}
