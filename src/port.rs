use log::{debug, trace, warn};
use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    future::{poll_fn, Future},
    pin::{pin, Pin},
    rc::Rc,
    task::{Context, Poll},
};

use crate::{
    cancel::CancellationToken,
    control::{
        ENDPOINT_IN, ENDPOINT_OUT, READ_CHUNK_SIZE, SERIAL_CONFIGURATION, SERIAL_INTERFACE,
    },
    event::{EventStream, Subscribers},
    ControlOut, DeviceFilter, Error, ErrorKind, Event, SubscriptionId, UsbBackend, UsbDevice,
    DEFAULT_FILTERS,
};

/// Options for [`SerialPort::new`].
///
/// ```
/// use webusb_serial::{DeviceFilter, SerialPortOptions};
/// # struct MyDevice;
/// let options = SerialPortOptions::<MyDevice>::new()
///     .with_filters([DeviceFilter::new(0x2341, 0x8036)]);
/// assert_eq!(options.filters().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SerialPortOptions<D> {
    filters: Vec<DeviceFilter>,
    device: Option<D>,
}

impl<D> Default for SerialPortOptions<D> {
    fn default() -> Self {
        SerialPortOptions {
            filters: DEFAULT_FILTERS.to_vec(),
            device: None,
        }
    }
}

impl<D> SerialPortOptions<D> {
    /// Options using [`DEFAULT_FILTERS`] and interactive selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the filters offered to the device chooser.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = DeviceFilter>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    /// Use an already-resolved device. Interactive selection is skipped.
    pub fn with_device(mut self, device: D) -> Self {
        self.device = Some(device);
        self
    }

    pub fn filters(&self) -> &[DeviceFilter] {
        &self.filters
    }
}

/// Lifecycle state of a [`SerialPort`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortState {
    /// The [`Connection`] has not been polled yet.
    Unopened,

    /// Acquiring and configuring the device.
    Opening,

    /// The line is active and the read loop is running.
    Open,

    /// Acquisition or the read loop failed. The device, if it was opened
    /// successfully, is still held and can be closed.
    Failed,

    /// [`SerialPort::close`] was called.
    Closed,
}

struct Shared<D> {
    state: Cell<PortState>,
    device: RefCell<Option<D>>,
    subscribers: Rc<Subscribers>,
    cancel: CancellationToken,
}

impl<D> Shared<D> {
    fn fail(&self, err: Error) {
        self.state.set(PortState::Failed);
        self.subscribers.emit(Event::Error(err));
    }
}

/// A USB CDC-ACM device exposed as a duplex byte stream.
///
/// Obtain a `SerialPort` together with its [`Connection`] from
/// [`SerialPort::new`]. The connection acquires and configures the device,
/// then reads from it, delivering [`Event`]s to subscribers:
///
/// * [`Event::Open`] once the line is active,
/// * [`Event::Data`] for every chunk received,
/// * [`Event::Error`] if acquisition or a read fails, after which no
///   further reads are made.
///
/// This type is reference-counted internally and clones share the same
/// device. It is not `Send`: all use happens on one thread, as with the
/// platform USB APIs it wraps.
pub struct SerialPort<D> {
    shared: Rc<Shared<D>>,
}

impl<D> Clone for SerialPort<D> {
    fn clone(&self) -> Self {
        SerialPort {
            shared: self.shared.clone(),
        }
    }
}

impl<D> Debug for SerialPort<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("state", &self.shared.state.get())
            .finish_non_exhaustive()
    }
}

impl<D: UsbDevice> SerialPort<D> {
    /// Create a port and the [`Connection`] future that drives it.
    ///
    /// Nothing happens until the connection is polled; spawn it on the
    /// executor that runs the rest of the program. It completes when the
    /// read loop stops.
    pub fn new<B>(backend: B, options: SerialPortOptions<D>) -> (SerialPort<D>, Connection)
    where
        B: UsbBackend<Device = D> + 'static,
    {
        let shared = Rc::new(Shared {
            state: Cell::new(PortState::Unopened),
            device: RefCell::new(None),
            subscribers: Rc::new(Subscribers::default()),
            cancel: CancellationToken::new(),
        });
        let connection = Connection {
            inner: Box::pin(run(backend, options, shared.clone())),
        };
        (SerialPort { shared }, connection)
    }

    /// Emit [`Event::Open`].
    ///
    /// This does not open the device; acquisition happens in the
    /// [`Connection`] regardless of whether this is called.
    pub fn open(&self) {
        self.shared.subscribers.emit(Event::Open);
    }

    /// Send `data` to the device with a bulk OUT transfer.
    ///
    /// Failures are returned here and never emitted as [`Event::Error`].
    /// Concurrent writes are not serialized against each other.
    pub async fn write(&self, data: &[u8]) -> Result<(), Error> {
        let device = self
            .device()
            .ok_or_else(|| Error::new(ErrorKind::NotOpen, "device not open"))?;
        trace!("bulk OUT {ENDPOINT_OUT:#04x}: {} bytes", data.len());
        device
            .transfer_out(ENDPOINT_OUT, data)
            .await
            .map_err(|e| Error::from(e).log_debug())?;
        Ok(())
    }

    /// Deactivate the line and close the device.
    ///
    /// The read loop is stopped first, without emitting an error. Returns
    /// immediately if no device is held; a connection that has not finished
    /// acquisition then stops without selecting or opening a device, or
    /// closes the device it already opened. The port is closed even if the
    /// device rejects the requests; the failure is returned.
    pub async fn close(&self) -> Result<(), Error> {
        self.shared.cancel.cancel();
        self.shared.state.set(PortState::Closed);
        let Some(device) = self.shared.device.borrow_mut().take() else {
            return Ok(());
        };
        debug!("closing serial port");
        shutdown(&device).await
    }

    /// No-op; there is no internal buffer.
    pub fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// No-op; there is no internal buffer.
    pub fn drain(&self) -> Result<(), Error> {
        Ok(())
    }

    pub fn state(&self) -> PortState {
        self.shared.state.get()
    }

    /// The device handle, once the port is open and until it is closed.
    pub fn device(&self) -> Option<D> {
        self.shared.device.borrow().clone()
    }

    /// Call `handler` for every subsequent event.
    pub fn subscribe(&self, handler: impl Fn(&Event) + 'static) -> SubscriptionId {
        self.shared.subscribers.subscribe(handler)
    }

    /// Remove a handler. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }

    /// Stream of subsequent events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.shared.subscribers.clone())
    }
}

/// Future that acquires the device and runs the read loop of a
/// [`SerialPort`].
#[must_use = "the serial port does nothing unless its connection is polled"]
pub struct Connection {
    inner: Pin<Box<dyn Future<Output = ()>>>,
}

impl Future for Connection {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.inner.as_mut().poll(cx)
    }
}

impl Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

async fn run<B: UsbBackend>(
    backend: B,
    options: SerialPortOptions<B::Device>,
    shared: Rc<Shared<B::Device>>,
) {
    if shared.cancel.is_cancelled() {
        debug!("serial port closed before acquisition");
        return shared.state.set(PortState::Closed);
    }
    shared.state.set(PortState::Opening);

    let device = match resolve(&backend, options).await {
        Ok(device) => device,
        Err(e) if shared.cancel.is_cancelled() => {
            debug!("device selection ended after close: {e}");
            return shared.state.set(PortState::Closed);
        }
        Err(e) => return shared.fail(e.log_error()),
    };

    if shared.cancel.is_cancelled() {
        debug!("serial port closed during device selection");
        return shared.state.set(PortState::Closed);
    }

    if let Err(e) = configure(&device).await {
        if shared.cancel.is_cancelled() {
            debug!("acquisition failed after close: {e}");
            return shared.state.set(PortState::Closed);
        }
        return shared.fail(e.log_error());
    }

    if shared.cancel.is_cancelled() {
        debug!("serial port closed during acquisition");
        shared.state.set(PortState::Closed);
        if let Err(e) = shutdown(&device).await {
            warn!("failed to close device: {e}");
        }
        return;
    }

    *shared.device.borrow_mut() = Some(device.clone());
    shared.state.set(PortState::Open);
    debug!("serial port open");
    shared.subscribers.emit(Event::Open);

    read_loop(&device, &shared).await;
}

async fn resolve<B: UsbBackend>(
    backend: &B,
    options: SerialPortOptions<B::Device>,
) -> Result<B::Device, Error> {
    match options.device {
        Some(device) => Ok(device),
        None => {
            debug!("requesting device ({} filters)", options.filters.len());
            backend.request_device(&options.filters).await
        }
    }
}

async fn configure<D: UsbDevice>(device: &D) -> Result<(), Error> {
    device.open().await?;

    let configuration = device.configuration_value();
    if configuration != Some(SERIAL_CONFIGURATION) {
        debug!("selecting configuration {SERIAL_CONFIGURATION} (active: {configuration:?})");
        device.select_configuration(SERIAL_CONFIGURATION).await?;
    }

    device.claim_interface(SERIAL_INTERFACE).await?;

    let control = ControlOut::set_control_line_state(true);
    trace!("control OUT setup {:02x?}", control.setup_packet());
    device.control_out(control).await?;

    Ok(())
}

async fn read_loop<D: UsbDevice>(device: &D, shared: &Shared<D>) {
    loop {
        let read = device.transfer_in(ENDPOINT_IN, READ_CHUNK_SIZE);
        let Some(result) = until_cancelled(&shared.cancel, read).await else {
            debug!("read loop stopped");
            return;
        };

        match result {
            Ok(data) => {
                trace!("bulk IN {ENDPOINT_IN:#04x}: {} bytes", data.len());
                shared.subscribers.emit(Event::Data(data));
            }
            Err(e) => return shared.fail(Error::from(e).log_error()),
        }
    }
}

async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    let mut fut = pin!(fut);
    let mut cancelled = pin!(token.cancelled());
    poll_fn(|cx| {
        if cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        fut.as_mut().poll(cx).map(Some)
    })
    .await
}

async fn shutdown<D: UsbDevice>(device: &D) -> Result<(), Error> {
    device
        .control_out(ControlOut::set_control_line_state(false))
        .await?;
    device.close().await
}
