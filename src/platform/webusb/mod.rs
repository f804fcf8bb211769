mod device;

pub use device::WebusbDevice;

use std::future::Future;

use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::js_sys::{self, Array, Object, Reflect};
use web_sys::wasm_bindgen::{JsCast, JsValue};
use web_sys::{Usb, UsbDevice, UsbDeviceRequestOptions, Window, WorkerGlobalScope};

use crate::{
    DeviceFilter, Error, ErrorKind, SerialPort, SerialPortOptions, TransferError, UsbBackend,
};

/// Transport backed by `navigator.usb`.
///
/// Device selection goes through the browser's chooser, which requires a
/// user gesture on the calling page.
#[derive(Debug, Default, Copy, Clone)]
pub struct WebUsb;

impl UsbBackend for WebUsb {
    type Device = WebusbDevice;

    fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> impl Future<Output = Result<WebusbDevice, Error>> {
        let filters = filters_to_js(filters);
        async move {
            let usb = usb()?;
            let options = UsbDeviceRequestOptions::new(&filters?);
            let device = JsFuture::from(usb.request_device(&options))
                .await
                .map_err(js_value_to_error)?;
            let device: UsbDevice = JsCast::unchecked_from_js(device);
            tracing::debug!(
                "selected device {:04x}:{:04x}",
                device.vendor_id(),
                device.product_id()
            );
            Ok(WebusbDevice::from(device))
        }
    }
}

impl SerialPort<WebusbDevice> {
    /// Create a WebUSB serial port and spawn its [`Connection`][crate::Connection]
    /// on the current thread's JS event loop.
    pub fn spawn_local(options: SerialPortOptions<WebusbDevice>) -> Self {
        let (port, connection) = SerialPort::new(WebUsb, options);
        spawn_local(connection);
        port
    }
}

fn filters_to_js(filters: &[DeviceFilter]) -> Result<Array, Error> {
    let array = Array::new();
    for filter in filters {
        let object = Object::new();
        Reflect::set(&object, &"vendorId".into(), &filter.vendor_id.into())
            .and_then(|_| Reflect::set(&object, &"productId".into(), &filter.product_id.into()))
            .map_err(js_value_to_error)?;
        array.push(&object);
    }
    Ok(array)
}

pub(crate) fn usb() -> Result<Usb, Error> {
    let window = js_sys::global().dyn_into::<Window>().ok();

    if let Some(window) = window {
        return Ok(window.navigator().usb());
    }

    let wgs = js_sys::global().dyn_into::<WorkerGlobalScope>().ok();

    if let Some(wgs) = wgs {
        return Ok(wgs.navigator().usb());
    }

    Err(Error::new(
        ErrorKind::Unsupported,
        "WebUSB is not available on this platform",
    ))
}

fn js_error_field(value: &JsValue, field: &str) -> Option<String> {
    Reflect::get(value, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_string())
}

/// Map a rejected WebUSB promise to an [`Error`] by its `DOMException` name.
pub(crate) fn js_value_to_error(value: JsValue) -> Error {
    let kind = match js_error_field(&value, "name").as_deref() {
        Some("NotFoundError") => ErrorKind::NotFound,
        Some("SecurityError") | Some("NotAllowedError") => ErrorKind::PermissionDenied,
        Some("InvalidStateError") => ErrorKind::Busy,
        Some("NetworkError") => ErrorKind::Disconnected,
        Some("NotSupportedError") => ErrorKind::Unsupported,
        _ => ErrorKind::Other,
    };
    let message = js_error_field(&value, "message")
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "No further error clarification available".into());
    Error::new(kind, message)
}

pub(crate) fn js_value_to_transfer_error(value: JsValue) -> TransferError {
    let name = js_error_field(&value, "name");
    tracing::info!("transfer rejected: {:?}", value);
    match name.as_deref() {
        Some("AbortError") => TransferError::Cancelled,
        Some("NotFoundError") => TransferError::Disconnected,
        Some("NetworkError") => TransferError::Fault,
        _ => TransferError::Unknown,
    }
}

pub(crate) fn webusb_status_to_transfer_error(
    status: web_sys::UsbTransferStatus,
) -> Result<(), TransferError> {
    match status {
        web_sys::UsbTransferStatus::Ok => Ok(()),
        web_sys::UsbTransferStatus::Stall => Err(TransferError::Stall),
        web_sys::UsbTransferStatus::Babble => Err(TransferError::Fault),
        _ => Err(TransferError::Unknown),
    }
}
