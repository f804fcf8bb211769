use std::future::Future;

use wasm_bindgen_futures::JsFuture;
use web_sys::{
    js_sys::Uint8Array, wasm_bindgen::JsCast, UsbControlTransferParameters, UsbDevice,
    UsbInTransferResult, UsbOutTransferResult,
};

use crate::{ControlOut, ControlType, Error, Recipient, TransferError, UsbDevice as Device};

use super::{js_value_to_error, js_value_to_transfer_error, webusb_status_to_transfer_error};

/// A device obtained from `navigator.usb`.
///
/// Wrap a `USBDevice` the page already holds with `WebusbDevice::from` and
/// pass it to [`SerialPortOptions::with_device`][crate::SerialPortOptions::with_device]
/// to skip the chooser.
#[derive(Debug, Clone)]
pub struct WebusbDevice {
    device: UsbDevice,
}

impl From<UsbDevice> for WebusbDevice {
    fn from(device: UsbDevice) -> Self {
        WebusbDevice { device }
    }
}

impl WebusbDevice {
    /// The underlying `USBDevice`.
    pub fn inner(&self) -> &UsbDevice {
        &self.device
    }
}

impl From<ControlType> for web_sys::UsbRequestType {
    fn from(value: ControlType) -> Self {
        match value {
            ControlType::Standard => web_sys::UsbRequestType::Standard,
            ControlType::Class => web_sys::UsbRequestType::Class,
            ControlType::Vendor => web_sys::UsbRequestType::Vendor,
        }
    }
}

impl From<Recipient> for web_sys::UsbRecipient {
    fn from(value: Recipient) -> Self {
        match value {
            Recipient::Device => web_sys::UsbRecipient::Device,
            Recipient::Interface => web_sys::UsbRecipient::Interface,
            Recipient::Endpoint => web_sys::UsbRecipient::Endpoint,
            Recipient::Other => web_sys::UsbRecipient::Other,
        }
    }
}

impl Device for WebusbDevice {
    fn open(&self) -> impl Future<Output = Result<(), Error>> {
        let promise = self.device.open();
        async move {
            JsFuture::from(promise).await.map_err(js_value_to_error)?;
            Ok(())
        }
    }

    fn configuration_value(&self) -> Option<u8> {
        self.device
            .configuration()
            .map(|c| c.configuration_value())
    }

    fn select_configuration(&self, configuration: u8) -> impl Future<Output = Result<(), Error>> {
        let promise = self.device.select_configuration(configuration);
        async move {
            JsFuture::from(promise).await.map_err(js_value_to_error)?;
            Ok(())
        }
    }

    fn claim_interface(&self, interface: u8) -> impl Future<Output = Result<(), Error>> {
        let promise = self.device.claim_interface(interface);
        async move {
            JsFuture::from(promise).await.map_err(js_value_to_error)?;
            Ok(())
        }
    }

    fn control_out(
        &self,
        control: ControlOut<'_>,
    ) -> impl Future<Output = Result<(), TransferError>> {
        let setup = UsbControlTransferParameters::new(
            control.index,
            control.recipient.into(),
            control.request,
            control.control_type.into(),
            control.value,
        );
        let mut data = control.data.to_vec();
        let promise = self
            .device
            .control_transfer_out_with_u8_slice(&setup, &mut data)
            .map_err(js_value_to_transfer_error);

        async move {
            let res = JsFuture::from(promise?)
                .await
                .map_err(js_value_to_transfer_error)?;
            let res: UsbOutTransferResult = JsCast::unchecked_from_js(res);
            webusb_status_to_transfer_error(res.status())
        }
    }

    fn transfer_out(
        &self,
        endpoint: u8,
        data: &[u8],
    ) -> impl Future<Output = Result<usize, TransferError>> {
        let mut data = data.to_vec();
        let promise = self
            .device
            .transfer_out_with_u8_slice(endpoint, &mut data)
            .map_err(js_value_to_transfer_error);

        async move {
            let res = JsFuture::from(promise?)
                .await
                .map_err(js_value_to_transfer_error)?;
            let res: UsbOutTransferResult = JsCast::unchecked_from_js(res);
            webusb_status_to_transfer_error(res.status())?;
            Ok(res.bytes_written() as usize)
        }
    }

    fn transfer_in(
        &self,
        endpoint: u8,
        length: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>> {
        let promise = self.device.transfer_in(endpoint, length as u32);

        async move {
            let res = JsFuture::from(promise)
                .await
                .map_err(js_value_to_transfer_error)?;
            let res: UsbInTransferResult = JsCast::unchecked_from_js(res);
            webusb_status_to_transfer_error(res.status())?;

            let Some(view) = res.data() else {
                return Ok(Vec::new());
            };
            let array = Uint8Array::new_with_byte_offset_and_length(
                &view.buffer(),
                view.byte_offset() as u32,
                view.byte_length() as u32,
            );
            Ok(array.to_vec())
        }
    }

    fn close(&self) -> impl Future<Output = Result<(), Error>> {
        let promise = self.device.close();
        async move {
            JsFuture::from(promise).await.map_err(js_value_to_error)?;
            Ok(())
        }
    }
}
