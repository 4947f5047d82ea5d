//! Bidirectional message channels occupying the four player slots.
//!
//! A session never touches sockets. Each slot holds a [`MessageInterface`]
//! which buffers inbound messages, delivers outbound ones and reports when
//! its remote endpoint comes up or goes down. Endpoint changes are queued as
//! [`EndpointEvent`]s and drained by the tick loop, so network activity never
//! mutates game state directly.

use log::warn;
use shared::protocol::{DecodeError, MessageEvent};
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointEvent {
    Up,
    Down,
}

pub trait MessageInterface: Send {
    /// Connected and delivering outbound messages.
    fn is_up(&self) -> bool;

    /// Queues a message for the remote endpoint. Ignored once the channel is down.
    fn send(&mut self, message: &MessageEvent);

    /// Next inbound message, or a decode failure for a malformed one.
    fn receive(&mut self) -> Option<Result<MessageEvent, DecodeError>>;

    fn poll_event(&mut self) -> Option<EndpointEvent>;

    /// Holds outbound delivery without dropping anything queued.
    fn suspend(&mut self);

    /// Restarts delivery and reports the endpoint as up.
    fn resume(&mut self);

    /// Tears the channel down. Reports `Down` once if it was up.
    fn close(&mut self);
}

/// Placeholder for a slot nobody occupies.
#[derive(Debug, Default)]
pub struct NullInterface;

impl MessageInterface for NullInterface {
    fn is_up(&self) -> bool {
        false
    }

    fn send(&mut self, _message: &MessageEvent) {}

    fn receive(&mut self) -> Option<Result<MessageEvent, DecodeError>> {
        None
    }

    fn poll_event(&mut self) -> Option<EndpointEvent> {
        None
    }

    fn suspend(&mut self) {}

    fn resume(&mut self) {}

    fn close(&mut self) {}
}

/// One end of an in-process channel pair.
///
/// Messages go through the wire encoding so an in-process client sees exactly
/// what a remote one would.
#[derive(Debug)]
pub struct LocalInterface {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    held: Vec<Vec<u8>>,
    suspended: bool,
    events: VecDeque<EndpointEvent>,
}

impl LocalInterface {
    /// Two connected ends. Both start up and delivering.
    pub fn pair() -> (LocalInterface, LocalInterface) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::end(a_tx, a_rx), Self::end(b_tx, b_rx))
    }

    fn end(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        LocalInterface {
            tx: Some(tx),
            rx: Some(rx),
            held: Vec::new(),
            suspended: false,
            events: VecDeque::new(),
        }
    }

    fn connected(&self) -> bool {
        self.tx.is_some()
    }

    fn mark_down(&mut self) {
        if self.connected() {
            self.tx = None;
            self.rx = None;
            self.held.clear();
            self.events.push_back(EndpointEvent::Down);
        }
    }

    fn deliver(&mut self, bytes: Vec<u8>) {
        let failed = match &self.tx {
            Some(tx) => tx.send(bytes).is_err(),
            None => false,
        };
        if failed {
            self.mark_down();
        }
    }
}

impl MessageInterface for LocalInterface {
    fn is_up(&self) -> bool {
        self.connected() && !self.suspended
    }

    fn send(&mut self, message: &MessageEvent) {
        if !self.connected() {
            return;
        }
        let bytes = match message.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Dropping unencodable {:?} message: {}", message.message_type(), e);
                return;
            }
        };
        if self.suspended {
            self.held.push(bytes);
        } else {
            self.deliver(bytes);
        }
    }

    fn receive(&mut self) -> Option<Result<MessageEvent, DecodeError>> {
        let result = self.rx.as_mut()?.try_recv();
        match result {
            Ok(bytes) => Some(MessageEvent::from_bytes(&bytes)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.mark_down();
                None
            }
        }
    }

    fn poll_event(&mut self) -> Option<EndpointEvent> {
        if self.tx.as_ref().map_or(false, |tx| tx.is_closed()) {
            self.mark_down();
        }
        self.events.pop_front()
    }

    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        for bytes in std::mem::take(&mut self.held) {
            self.deliver(bytes);
        }
        if self.connected() {
            self.events.push_back(EndpointEvent::Up);
        }
    }

    fn close(&mut self) {
        self.mark_down();
    }
}
