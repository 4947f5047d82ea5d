//! [`MessageInterface`] over an async byte stream.
//!
//! Each connection runs one reader task and one writer task, so there is at
//! most one outstanding read and one outstanding write at any time. The tick
//! loop only talks to the tasks through channels.

use crate::interface::{EndpointEvent, MessageInterface};
use log::{debug, warn};
use shared::framing::{encode_frame, FrameReader};
use shared::protocol::{DecodeError, MessageEvent};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
enum Inbound {
    Message(Result<MessageEvent, DecodeError>),
    Closed,
}

#[derive(Debug)]
pub struct SocketInterface {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    resume_tx: watch::Sender<bool>,
    reader: JoinHandle<()>,
    up: bool,
    suspended: bool,
    events: VecDeque<EndpointEvent>,
}

impl SocketInterface {
    /// Starts the I/O tasks. Must be called from within a tokio runtime.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = watch::channel(true);

        let reader = tokio::spawn(read_loop(read_half, inbound_tx.clone()));
        tokio::spawn(write_loop(write_half, outbound_rx, resume_rx, inbound_tx));

        SocketInterface {
            outbound: Some(outbound),
            inbound,
            resume_tx,
            reader,
            up: true,
            suspended: false,
            events: VecDeque::new(),
        }
    }

    fn mark_down(&mut self) {
        if self.up {
            self.up = false;
            // The writer drains what is already queued, then shuts the stream down.
            self.outbound = None;
            self.reader.abort();
            self.events.push_back(EndpointEvent::Down);
        }
    }
}

async fn read_loop<R>(mut reader: R, tx: mpsc::UnboundedSender<Inbound>)
where
    R: AsyncRead + Unpin,
{
    let mut frames = FrameReader::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                debug!("Connection closed by peer");
                break;
            }
            Ok(len) => {
                frames.push(&buffer[..len]);
                loop {
                    match frames.next_message() {
                        Ok(Some(message)) => {
                            if tx.send(Inbound::Message(message)).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Dropping connection: {}", e);
                            let _ = tx.send(Inbound::Closed);
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                debug!("Read failed: {}", e);
                break;
            }
        }
    }
    let _ = tx.send(Inbound::Closed);
}

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut resume: watch::Receiver<bool>,
    failed: mpsc::UnboundedSender<Inbound>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        loop {
            let resumed = *resume.borrow();
            if resumed {
                break;
            }
            if resume.changed().await.is_err() {
                return;
            }
        }
        if let Err(e) = writer.write_all(&frame).await {
            debug!("Write failed: {}", e);
            let _ = failed.send(Inbound::Closed);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

impl MessageInterface for SocketInterface {
    fn is_up(&self) -> bool {
        self.up && !self.suspended
    }

    fn send(&mut self, message: &MessageEvent) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        match encode_frame(message) {
            Ok(frame) => {
                // A failed send means the writer stopped; its close notice is already queued.
                let _ = outbound.send(frame);
            }
            Err(e) => warn!("Dropping unencodable {:?} message: {}", message.message_type(), e),
        }
    }

    fn receive(&mut self) -> Option<Result<MessageEvent, DecodeError>> {
        if !self.up {
            return None;
        }
        match self.inbound.try_recv() {
            Ok(Inbound::Message(message)) => Some(message),
            Ok(Inbound::Closed) | Err(TryRecvError::Disconnected) => {
                self.mark_down();
                None
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    fn poll_event(&mut self) -> Option<EndpointEvent> {
        self.events.pop_front()
    }

    fn suspend(&mut self) {
        self.suspended = true;
        let _ = self.resume_tx.send(false);
    }

    fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        let _ = self.resume_tx.send(true);
        if self.up {
            self.events.push_back(EndpointEvent::Up);
        }
    }

    fn close(&mut self) {
        self.mark_down();
    }
}

impl Drop for SocketInterface {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
