//! Threaded TCP client.

use crate::error::ClientError;
use crate::io::{SocketIo, TcpIo};
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use termlink_core::{
    receive_frames, LinkControl, LinkEvent, LinkState, Listeners, LoopExit, TimeoutConfig,
    Worker, WorkerContext,
};
use termlink_frame::{encode_frame, DataMode};

/// Events reported to client listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// A complete frame arrived from the server.
    ServerDataRecv,
    /// The server closed the connection, or the connection failed.
    ServerDisconnected,
}

/// Receives client events.
pub trait ClientListener: Send + Sync {
    fn on_client_event(&self, event: ClientEvent, data: &[u8]);
}

struct Inner<Io: SocketIo> {
    io: Io,
    mode: DataMode,
    link: LinkControl,
    stream: Mutex<Option<Arc<Io::Stream>>>,
    endpoint: Mutex<String>,
    listeners: Listeners<dyn ClientListener>,
    timeouts: TimeoutConfig,
    write_lock: Mutex<()>,
}

impl<Io: SocketIo> Inner<Io> {
    fn notify(&self, event: ClientEvent, data: &[u8]) {
        self.listeners.notify(|l| l.on_client_event(event, data));
    }

    fn run(&self, ctx: &WorkerContext) {
        while ctx.is_running() {
            match self.link.wait_while_idle(self.timeouts.receive()) {
                LinkState::Idle => {}
                LinkState::Closing => break,
                LinkState::Disconnecting => {
                    self.stream.lock().take();
                    let _ = self.link.apply(LinkEvent::LoopExited);
                }
                state @ (LinkState::Connecting | LinkState::Connected) => {
                    let Some(stream) = self.stream.lock().clone() else {
                        let _ = self.link.apply(LinkEvent::LoopExited);
                        continue;
                    };
                    if state == LinkState::Connecting
                        && self.link.apply(LinkEvent::LoopStarted).is_err()
                    {
                        continue;
                    }

                    tracing::debug!("[{}] receiving in {} mode", self.endpoint.lock(), self.mode);
                    let exit = receive_frames(
                        self.mode,
                        |buf| self.io.recv(&stream, buf),
                        || ctx.is_running() && self.link.state() == LinkState::Connected,
                        |frame| self.notify(ClientEvent::ServerDataRecv, frame),
                    );
                    drop(stream);
                    self.finish(exit);
                }
            }
        }
    }

    fn finish(&self, exit: LoopExit) {
        self.stream.lock().take();
        let released = self.link.state() != LinkState::Connected;
        let _ = self.link.apply(LinkEvent::LoopExited);

        let endpoint = self.endpoint.lock().clone();
        match exit {
            LoopExit::Stopped => tracing::debug!("[{}] receive loop stopped", endpoint),
            _ if released => tracing::info!("[{}] disconnected", endpoint),
            LoopExit::PeerClosed => {
                tracing::info!("[{}] connection closed by server", endpoint);
                self.notify(ClientEvent::ServerDisconnected, &[]);
            }
            LoopExit::Failed(e) => {
                tracing::warn!("[{}] connection lost: {}", endpoint, e);
                self.notify(ClientEvent::ServerDisconnected, &[]);
            }
        }
    }
}

/// TCP client delivering framed data to listeners.
///
/// Listeners are called directly on the client's receive thread, unlike
/// the server, which funnels events through a dispatch thread. A listener
/// must therefore not block for long.
pub struct SocketClient<Io: SocketIo = TcpIo> {
    inner: Arc<Inner<Io>>,
    worker: Worker,
    op_lock: Mutex<()>,
}

impl SocketClient<TcpIo> {
    pub fn new(mode: DataMode) -> Self {
        Self::with_io(mode, TcpIo::default(), TimeoutConfig::default())
    }
}

impl<Io: SocketIo> SocketClient<Io> {
    pub fn with_io(mode: DataMode, io: Io, timeouts: TimeoutConfig) -> Self {
        let inner = Arc::new(Inner {
            io,
            mode,
            link: LinkControl::new("client"),
            stream: Mutex::new(None),
            endpoint: Mutex::new(String::new()),
            listeners: Listeners::new(),
            timeouts,
            write_lock: Mutex::new(()),
        });
        let worker_inner = inner.clone();
        let worker = Worker::new("client-rx", move |ctx| worker_inner.run(ctx));

        Self {
            inner,
            worker,
            op_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> DataMode {
        self.inner.mode
    }

    /// Connects to `address:port` and starts receiving.
    ///
    /// Rejected while a connection is active; the active connection is left
    /// untouched.
    pub fn connect(&self, address: &str, port: u16) -> Result<(), ClientError> {
        let _op = self.op_lock.lock();
        tracing::info!("connecting to {}:{}", address, port);

        if self.inner.link.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }
        self.inner.link.wait_until(
            |s| matches!(s, LinkState::Idle | LinkState::Closing),
            self.release_timeout(),
        );

        let ip: Ipv4Addr = address
            .parse()
            .map_err(|_| ClientError::InvalidAddress(address.to_string()))?;
        let addr = SocketAddrV4::new(ip, port);

        self.worker.start(self.inner.timeouts.thread_start())?;

        let stream = self
            .inner
            .io
            .connect(addr, self.inner.timeouts.receive())
            .map_err(|e| {
                tracing::error!("cannot connect to {}: {}", addr, e);
                ClientError::Connect { addr, source: e }
            })?;

        *self.inner.endpoint.lock() = addr.to_string();
        *self.inner.stream.lock() = Some(Arc::new(stream));
        if let Err(e) = self.inner.link.apply(LinkEvent::ConnectRequested) {
            self.inner.stream.lock().take();
            return Err(e.into());
        }

        let timeout = self.inner.timeouts.state_change();
        if !self
            .inner
            .link
            .wait_until(|s| s != LinkState::Connecting, timeout)
        {
            tracing::warn!("[{}] receive thread did not pick up the connection", addr);
            self.release();
            return Err(ClientError::StateTimeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        tracing::info!("[{}] connected", addr);
        Ok(())
    }

    /// Closes the connection. No `ServerDisconnected` event is emitted for a
    /// disconnect requested here. Does nothing when not connected.
    pub fn disconnect(&self) {
        let _op = self.op_lock.lock();
        self.release();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.link.is_connected()
    }

    /// Sends `data` as one frame.
    ///
    /// In header mode the payload is prefixed with its length. The encoded
    /// frame must not exceed `MAX_PAYLOAD_LENGTH` bytes.
    pub fn write(&self, data: &[u8]) -> Result<(), ClientError> {
        let frame = encode_frame(self.inner.mode, data)?;

        let stream = self.inner.stream.lock().clone();
        let stream = match stream {
            Some(stream) if self.inner.link.is_connected() => stream,
            _ => return Err(ClientError::NotConnected),
        };

        let _write = self.inner.write_lock.lock();
        let mut written = 0;
        while written < frame.len() {
            match self.inner.io.send(&stream, &frame[written..]) {
                Ok(0) => {
                    return Err(ClientError::WriteStalled {
                        written,
                        total: frame.len(),
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("[{}] send failed: {}", self.inner.endpoint.lock(), e);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    pub fn add_listener<L: ClientListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Arc<dyn ClientListener> = listener.clone();
        self.inner.listeners.add(&listener);
    }

    pub fn remove_listener<L: ClientListener + 'static>(&self, listener: &Arc<L>) -> bool {
        let listener: Arc<dyn ClientListener> = listener.clone();
        self.inner.listeners.remove(&listener)
    }

    fn release(&self) {
        if self
            .inner
            .link
            .apply(LinkEvent::DisconnectRequested)
            .is_err()
        {
            return;
        }
        tracing::info!("[{}] disconnect", self.inner.endpoint.lock());
        let stream = self.inner.stream.lock().clone();
        if let Some(stream) = stream {
            self.inner.io.shutdown(&stream);
        }
        if !self.inner.link.wait_until(
            |s| matches!(s, LinkState::Idle | LinkState::Closing),
            self.release_timeout(),
        ) {
            tracing::warn!("[{}] disconnect did not complete in time", self.inner.endpoint.lock());
        }
    }

    fn release_timeout(&self) -> Duration {
        self.inner.timeouts.state_change() + self.inner.timeouts.receive()
    }
}

impl<Io: SocketIo> Drop for SocketClient<Io> {
    fn drop(&mut self) {
        self.disconnect();
        let _ = self.inner.link.apply(LinkEvent::Shutdown);
        self.worker.stop();
    }
}
