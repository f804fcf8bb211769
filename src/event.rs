//! Events emitted by a [`SerialPort`][crate::SerialPort].
//!
//! Subscribe with a callback through
//! [`SerialPort::subscribe`][crate::SerialPort::subscribe], or poll an
//! [`EventStream`] from [`SerialPort::events`][crate::SerialPort::events].

use futures_core::Stream;
use slab::Slab;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::Error;

/// Event emitted by a serial port.
#[derive(Debug, Clone)]
pub enum Event {
    /// The port is ready for transfers.
    Open,

    /// Bytes received from the device.
    Data(Vec<u8>),

    /// Acquisition or the read loop failed.
    Error(Error),
}

/// Handle returned by [`SerialPort::subscribe`][crate::SerialPort::subscribe].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Handler = Rc<dyn Fn(&Event)>;

#[derive(Default)]
pub(crate) struct Subscribers {
    handlers: RefCell<Slab<Handler>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, handler: impl Fn(&Event) + 'static) -> SubscriptionId {
        SubscriptionId(self.handlers.borrow_mut().insert(Rc::new(handler)))
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.borrow_mut().try_remove(id.0).is_some()
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Handlers run outside the borrow, so they may subscribe or unsubscribe.
    pub(crate) fn emit(&self, event: Event) {
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }
}

#[derive(Default)]
struct Queue {
    events: VecDeque<Event>,
    waker: Option<Waker>,
}

/// Stream of [`Event`]s from a serial port.
///
/// Events emitted after the stream is created are queued until polled. The
/// stream does not end on its own; drop it to unsubscribe.
pub struct EventStream {
    subscribers: Rc<Subscribers>,
    id: SubscriptionId,
    queue: Rc<RefCell<Queue>>,
}

impl EventStream {
    pub(crate) fn new(subscribers: Rc<Subscribers>) -> Self {
        let queue = Rc::new(RefCell::new(Queue::default()));
        let sink = queue.clone();
        let id = subscribers.subscribe(move |event| {
            let mut q = sink.borrow_mut();
            q.events.push_back(event.clone());
            if let Some(waker) = q.waker.take() {
                waker.wake();
            }
        });
        EventStream {
            subscribers,
            id,
            queue,
        }
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        let mut q = self.queue.borrow_mut();
        match q.events.pop_front() {
            Some(event) => Poll::Ready(Some(event)),
            None => {
                q.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.subscribers.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::StreamExt;
    use std::cell::Cell;

    #[test]
    fn emit_reaches_all_subscribers() {
        let subscribers = Subscribers::default();
        let count = Rc::new(Cell::new(0));

        let c = count.clone();
        let a = subscribers.subscribe(move |_| c.set(c.get() + 1));
        let c = count.clone();
        subscribers.subscribe(move |_| c.set(c.get() + 10));

        subscribers.emit(Event::Open);
        assert_eq!(count.get(), 11);

        assert!(subscribers.unsubscribe(a));
        assert!(!subscribers.unsubscribe(a));
        subscribers.emit(Event::Open);
        assert_eq!(count.get(), 21);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let subscribers = Rc::new(Subscribers::default());
        let id = Rc::new(Cell::new(None));

        let s = subscribers.clone();
        let i = id.clone();
        id.set(Some(subscribers.subscribe(move |_| {
            s.unsubscribe(i.get().unwrap());
        })));

        subscribers.emit(Event::Open);
        assert!(!subscribers.unsubscribe(id.get().unwrap()));
    }

    #[test]
    fn stream_queues_events() {
        let subscribers = Rc::new(Subscribers::default());
        let mut stream = EventStream::new(subscribers.clone());

        subscribers.emit(Event::Data(vec![1, 2, 3]));
        subscribers.emit(Event::Open);

        pollster::block_on(async {
            assert!(matches!(stream.next().await, Some(Event::Data(d)) if d == [1, 2, 3]));
            assert!(matches!(stream.next().await, Some(Event::Open)));
        });
        assert!(futures_lite::future::block_on(futures_lite::future::poll_once(stream.next())).is_none());

        drop(stream);
        assert!(subscribers.handlers.borrow().is_empty());
    }
}
