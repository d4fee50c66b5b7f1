//! Threaded serial port driver.

use crate::error::SerialError;
use crate::io::{SerialIo, TermiosIo};
use crate::settings::SerialSettings;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use termlink_core::{
    is_timeout, LinkControl, LinkEvent, LinkState, Listeners, TimeoutConfig, Worker,
    WorkerContext,
};
use termlink_frame::{DataMode, ReceiveBuffer};

/// Events reported to serial listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent {
    /// A complete newline-terminated frame arrived; the data includes the `\n`.
    DataReceived,
    /// The port was closed on request.
    Disconnected,
    /// Reading failed or the device disappeared; the port has been closed.
    CommunicationError,
}

/// Receives serial events. Called on the driver's receive thread.
pub trait SerialListener: Send + Sync {
    fn on_serial_event(&self, event: SerialEvent, data: &[u8]);
}

enum ReadExit {
    Released,
    Failed(io::Error),
    Stopped,
}

struct Inner<Io: SerialIo> {
    io: Io,
    link: LinkControl,
    port: Mutex<Option<Arc<Io::Port>>>,
    device: Mutex<String>,
    listeners: Listeners<dyn SerialListener>,
    timeouts: TimeoutConfig,
    write_lock: Mutex<()>,
}

impl<Io: SerialIo> Inner<Io> {
    fn notify(&self, event: SerialEvent, data: &[u8]) {
        self.listeners.notify(|l| l.on_serial_event(event, data));
    }

    fn run(&self, ctx: &WorkerContext) {
        while ctx.is_running() {
            match self.link.wait_while_idle(self.timeouts.receive()) {
                LinkState::Idle => {}
                LinkState::Closing => break,
                LinkState::Disconnecting => {
                    // Released before the loop picked the port up.
                    self.port.lock().take();
                    let _ = self.link.apply(LinkEvent::LoopExited);
                }
                state @ (LinkState::Connecting | LinkState::Connected) => {
                    let Some(port) = self.port.lock().clone() else {
                        let _ = self.link.apply(LinkEvent::LoopExited);
                        continue;
                    };
                    if state == LinkState::Connecting
                        && self.link.apply(LinkEvent::LoopStarted).is_err()
                    {
                        continue;
                    }
                    let exit = self.receive(ctx, &port);
                    drop(port);
                    self.finish(exit);
                }
            }
        }
    }

    fn receive(&self, ctx: &WorkerContext, port: &Io::Port) -> ReadExit {
        let mut buffer = ReceiveBuffer::new();
        loop {
            if !ctx.is_running() {
                return ReadExit::Stopped;
            }
            if self.link.state() != LinkState::Connected {
                return ReadExit::Released;
            }
            match self.io.read(port, buffer.spare_mut()) {
                Ok(0) => {
                    // Either VTIME expired or the device is gone.
                    if let Err(e) = self.io.get_attributes(port) {
                        return ReadExit::Failed(e);
                    }
                }
                Ok(n) => {
                    buffer.commit(n);
                    buffer.drain_frames(|frame| self.notify(SerialEvent::DataReceived, frame));
                }
                Err(e) if is_timeout(&e) => {}
                Err(e) => return ReadExit::Failed(e),
            }
        }
    }

    fn finish(&self, exit: ReadExit) {
        self.port.lock().take();
        let device = self.device.lock().clone();

        match exit {
            ReadExit::Released => {
                tracing::info!("[{}] port closed", device);
                self.notify(SerialEvent::Disconnected, &[]);
                let _ = self.link.apply(LinkEvent::LoopExited);
            }
            ReadExit::Failed(e) => {
                tracing::error!("[{}] communication error: {}", device, e);
                let _ = self.link.apply(LinkEvent::LoopExited);
                self.notify(SerialEvent::CommunicationError, &[]);
            }
            ReadExit::Stopped => {
                let _ = self.link.apply(LinkEvent::LoopExited);
            }
        }
    }
}

/// Serial port driver.
///
/// A background thread reads the open port and reports every
/// newline-terminated frame to the registered listeners. Read failures close
/// the port and are reported as `SerialEvent::CommunicationError`.
pub struct SerialDriver<Io: SerialIo = TermiosIo> {
    inner: Arc<Inner<Io>>,
    worker: Worker,
    op_lock: Mutex<()>,
}

impl SerialDriver<TermiosIo> {
    pub fn new() -> Self {
        Self::with_io(TermiosIo, TimeoutConfig::default())
    }
}

impl Default for SerialDriver<TermiosIo> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Io: SerialIo> SerialDriver<Io> {
    pub fn with_io(io: Io, timeouts: TimeoutConfig) -> Self {
        let inner = Arc::new(Inner {
            io,
            link: LinkControl::new("serial"),
            port: Mutex::new(None),
            device: Mutex::new(String::new()),
            listeners: Listeners::new(),
            timeouts,
            write_lock: Mutex::new(()),
        });
        let worker_inner = inner.clone();
        let worker = Worker::new("serial-rx", move |ctx| worker_inner.run(ctx));

        Self {
            inner,
            worker,
            op_lock: Mutex::new(()),
        }
    }

    /// Serial ports always use newline-delimited framing.
    pub fn mode(&self) -> DataMode {
        DataMode::NewLineDelimiter
    }

    /// Opens and configures the port, then hands it to the receive thread.
    ///
    /// On any failure the driver stays closed and `open` may be retried.
    pub fn open(&self, settings: &SerialSettings) -> Result<(), SerialError> {
        let _op = self.op_lock.lock();
        if self.inner.link.state() != LinkState::Idle {
            return Err(SerialError::AlreadyOpened);
        }
        self.worker.start(self.inner.timeouts.thread_start())?;

        let device = &settings.device;
        let port = self.inner.io.open(device).map_err(|e| {
            tracing::error!("[{}] cannot open: {}", device, e);
            SerialError::Open {
                device: device.clone(),
                source: e,
            }
        })?;

        let mut attrs = self.inner.io.get_attributes(&port).map_err(|e| {
            tracing::error!("[{}] cannot read attributes: {}", device, e);
            SerialError::Attributes(e)
        })?;
        attrs.apply_settings(settings);
        self.inner.io.set_attributes(&port, &attrs).map_err(|e| {
            tracing::error!("[{}] cannot apply attributes: {}", device, e);
            SerialError::Attributes(e)
        })?;

        *self.inner.device.lock() = device.clone();
        *self.inner.port.lock() = Some(Arc::new(port));
        if let Err(e) = self.inner.link.apply(LinkEvent::ConnectRequested) {
            self.inner.port.lock().take();
            return Err(e.into());
        }

        let timeout = self.inner.timeouts.state_change();
        if !self
            .inner
            .link
            .wait_until(|s| s != LinkState::Connecting, timeout)
        {
            tracing::warn!("[{}] receive thread did not pick up the port", device);
            if self.inner.link.apply(LinkEvent::DisconnectRequested).is_ok() {
                self.inner.link.wait_until(
                    |s| matches!(s, LinkState::Idle | LinkState::Closing),
                    self.release_timeout(),
                );
            }
            self.inner.port.lock().take();
            return Err(SerialError::StateTimeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        tracing::info!("[{}] opened ({})", device, settings);
        Ok(())
    }

    /// Closes the port. Listeners receive `Disconnected` once the receive
    /// thread has let go of it. Does nothing if the port is not open.
    pub fn close(&self) {
        let _op = self.op_lock.lock();
        if self
            .inner
            .link
            .apply(LinkEvent::DisconnectRequested)
            .is_err()
        {
            return;
        }
        if !self.inner.link.wait_until(
            |s| matches!(s, LinkState::Idle | LinkState::Closing),
            self.release_timeout(),
        ) {
            tracing::warn!("[{}] close did not complete in time", self.inner.device.lock());
        }
    }

    pub fn is_opened(&self) -> bool {
        self.inner.port.lock().is_some() && self.inner.link.is_connected()
    }

    /// Writes all of `data`, looping over partial writes.
    pub fn write(&self, data: &[u8]) -> Result<(), SerialError> {
        let port = self.inner.port.lock().clone();
        let port = match port {
            Some(port) if self.inner.link.is_connected() => port,
            _ => return Err(SerialError::NotOpened),
        };

        let _write = self.inner.write_lock.lock();
        let mut written = 0;
        while written < data.len() {
            match self.inner.io.write(&port, &data[written..]) {
                Ok(0) => {
                    return Err(SerialError::WriteStalled {
                        written,
                        total: data.len(),
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("[{}] write failed: {}", self.inner.device.lock(), e);
                    return Err(SerialError::Write(e));
                }
            }
        }
        Ok(())
    }

    pub fn add_listener<L: SerialListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Arc<dyn SerialListener> = listener.clone();
        self.inner.listeners.add(&listener);
    }

    pub fn remove_listener<L: SerialListener + 'static>(&self, listener: &Arc<L>) -> bool {
        let listener: Arc<dyn SerialListener> = listener.clone();
        self.inner.listeners.remove(&listener)
    }

    /// A blocked read returns within one receive timeout, so releasing the
    /// port may take that long on top of the handshake.
    fn release_timeout(&self) -> std::time::Duration {
        self.inner.timeouts.state_change() + self.inner.timeouts.receive()
    }
}

impl<Io: SerialIo> Drop for SerialDriver<Io> {
    fn drop(&mut self) {
        self.close();
        let _ = self.inner.link.apply(LinkEvent::Shutdown);
        self.worker.stop();
    }
}
