//! In-memory transport recording every call, for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::{pending, Future};
use std::rc::Rc;

use futures_lite::future::yield_now;

use crate::{ControlOut, DeviceFilter, Error, ErrorKind, TransferError, UsbBackend, UsbDevice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Open,
    SelectConfiguration(u8),
    ClaimInterface(u8),
    ControlOut {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    },
    TransferOut(u8, Vec<u8>),
    TransferIn(u8, usize),
    Close,
}

#[derive(Default)]
struct MockState {
    calls: RefCell<Vec<Call>>,
    configuration: Cell<Option<u8>>,
    reads: RefCell<VecDeque<Result<Vec<u8>, TransferError>>>,
    fail_open: Cell<bool>,
    slow_open: Cell<bool>,
    fail_claim: Cell<bool>,
    fail_write: Cell<Option<TransferError>>,
    fail_close: Cell<bool>,
}

#[derive(Clone, Default)]
pub(crate) struct MockDevice(Rc<MockState>);

impl MockDevice {
    pub(crate) fn configured() -> Self {
        let device = MockDevice::default();
        device.0.configuration.set(Some(1));
        device
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.calls.borrow().clone()
    }

    pub(crate) fn control_values(&self) -> Vec<u16> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::ControlOut { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Queue a bulk IN result. Once the queue is empty, reads never complete.
    pub(crate) fn push_read(&self, result: Result<Vec<u8>, TransferError>) {
        self.0.reads.borrow_mut().push_back(result);
    }

    pub(crate) fn fail_open(&self) {
        self.0.fail_open.set(true);
    }

    /// Make `open` suspend once before completing.
    pub(crate) fn slow_open(&self) {
        self.0.slow_open.set(true);
    }

    pub(crate) fn fail_claim(&self) {
        self.0.fail_claim.set(true);
    }

    pub(crate) fn fail_write(&self, err: TransferError) {
        self.0.fail_write.set(Some(err));
    }

    pub(crate) fn fail_close(&self) {
        self.0.fail_close.set(true);
    }

    fn record(&self, call: Call) {
        self.0.calls.borrow_mut().push(call);
    }
}

impl UsbDevice for MockDevice {
    fn open(&self) -> impl Future<Output = Result<(), Error>> {
        self.record(Call::Open);
        let fail = self.0.fail_open.get();
        let slow = self.0.slow_open.get();
        async move {
            if slow {
                yield_now().await;
            }
            if fail {
                return Err(Error::new(ErrorKind::PermissionDenied, "open refused"));
            }
            Ok(())
        }
    }

    fn configuration_value(&self) -> Option<u8> {
        self.0.configuration.get()
    }

    fn select_configuration(&self, configuration: u8) -> impl Future<Output = Result<(), Error>> {
        self.record(Call::SelectConfiguration(configuration));
        self.0.configuration.set(Some(configuration));
        async { Ok(()) }
    }

    fn claim_interface(&self, interface: u8) -> impl Future<Output = Result<(), Error>> {
        self.record(Call::ClaimInterface(interface));
        let fail = self.0.fail_claim.get();
        async move {
            if fail {
                return Err(Error::new(ErrorKind::Busy, "interface busy"));
            }
            Ok(())
        }
    }

    fn control_out(
        &self,
        control: ControlOut<'_>,
    ) -> impl Future<Output = Result<(), TransferError>> {
        self.record(Call::ControlOut {
            request_type: control.request_type(),
            request: control.request,
            value: control.value,
            index: control.index,
        });
        async { Ok(()) }
    }

    fn transfer_out(
        &self,
        endpoint: u8,
        data: &[u8],
    ) -> impl Future<Output = Result<usize, TransferError>> {
        self.record(Call::TransferOut(endpoint, data.to_vec()));
        let result = match self.0.fail_write.get() {
            Some(err) => Err(err),
            None => Ok(data.len()),
        };
        async move { result }
    }

    fn transfer_in(
        &self,
        endpoint: u8,
        length: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>> {
        self.record(Call::TransferIn(endpoint, length));
        let next = self.0.reads.borrow_mut().pop_front();
        async move {
            match next {
                Some(result) => result,
                None => pending().await,
            }
        }
    }

    fn close(&self) -> impl Future<Output = Result<(), Error>> {
        self.record(Call::Close);
        let fail = self.0.fail_close.get();
        async move {
            if fail {
                return Err(Error::new(ErrorKind::Disconnected, "close failed"));
            }
            Ok(())
        }
    }
}

#[derive(Default)]
pub(crate) struct MockBackend {
    pub(crate) device: Option<MockDevice>,
    pub(crate) requests: Rc<RefCell<Vec<Vec<DeviceFilter>>>>,
    /// Suspend once in `request_device`, as a user picking a device would.
    pub(crate) slow_selection: bool,
}

impl MockBackend {
    pub(crate) fn with_device(device: MockDevice) -> Self {
        MockBackend {
            device: Some(device),
            ..Default::default()
        }
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDevice;

    fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> impl Future<Output = Result<MockDevice, Error>> {
        self.requests.borrow_mut().push(filters.to_vec());
        let device = self.device.clone();
        let slow = self.slow_selection;
        async move {
            if slow {
                yield_now().await;
            }
            device.ok_or_else(|| Error::new(ErrorKind::NotFound, "no device selected"))
        }
    }
}
