//! Per-client receive threads.

use crate::dispatch::{EventQueue, EventRecord};
use crate::error::ServerError;
use crate::io::ServerIo;
use crate::server::ServerEvent;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termlink_core::{receive_frames, LoopExit, Worker};
use termlink_frame::DataMode;

/// Identifies one accepted connection for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

struct Connection<Io: ServerIo> {
    id: ClientId,
    io: Arc<Io>,
    stream: Io::Stream,
    queue: Arc<EventQueue>,
    stopping: AtomicBool,
    write_lock: Mutex<()>,
}

impl<Io: ServerIo> Connection<Io> {
    fn post(&self, event: ServerEvent, data: &[u8]) {
        self.queue.push(EventRecord::new(self.id, event, data));
    }

    fn finish(&self, exit: LoopExit) {
        // A stop requested by the server is reported by the server itself.
        if self.stopping.load(Ordering::SeqCst) {
            tracing::debug!("[{}] receive loop stopped", self.id);
            return;
        }
        match exit {
            LoopExit::Stopped => tracing::debug!("[{}] receive loop stopped", self.id),
            LoopExit::PeerClosed => {
                tracing::info!("[{}] connection closed by peer", self.id);
                self.post(ServerEvent::ClientDisconnected, &[]);
            }
            LoopExit::Failed(e) => {
                tracing::warn!("[{}] connection lost: {}", self.id, e);
                self.post(ServerEvent::ClientDisconnected, &[]);
            }
        }
    }
}

/// Receive thread and write access for one accepted client.
///
/// Events are never delivered directly; they are posted to the shared
/// `EventQueue` in the order they happen.
pub struct ClientHandler<Io: ServerIo> {
    peer: SocketAddr,
    conn: Arc<Connection<Io>>,
    worker: Worker,
}

impl<Io: ServerIo> ClientHandler<Io> {
    pub fn new(
        id: ClientId,
        peer: SocketAddr,
        stream: Io::Stream,
        mode: DataMode,
        io: Arc<Io>,
        queue: Arc<EventQueue>,
    ) -> Self {
        let conn = Arc::new(Connection {
            id,
            io,
            stream,
            queue,
            stopping: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        });
        let worker_conn = conn.clone();
        let worker = Worker::new(format!("{}-rx", id), move |ctx| {
            let conn = &worker_conn;
            let exit = receive_frames(
                mode,
                |buf| conn.io.recv(&conn.stream, buf),
                || ctx.is_running(),
                |frame| conn.post(ServerEvent::ClientDataRecv, frame),
            );
            conn.finish(exit);
        });

        Self { peer, conn, worker }
    }

    pub fn id(&self) -> ClientId {
        self.conn.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Starts the receive thread.
    pub fn start(&self, timeout: Duration) -> Result<(), ServerError> {
        self.worker.start(timeout)?;
        Ok(())
    }

    /// Sends an already encoded frame.
    pub fn send_frame(&self, frame: &[u8]) -> Result<(), ServerError> {
        let _write = self.conn.write_lock.lock();
        let mut written = 0;
        while written < frame.len() {
            match self.conn.io.send(&self.conn.stream, &frame[written..]) {
                Ok(0) => {
                    return Err(ServerError::WriteStalled {
                        written,
                        total: frame.len(),
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Closes the connection and joins the receive thread. No event is
    /// posted for a stop requested here.
    pub fn stop(&self) {
        if self.conn.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("[{}] stopping handler for {}", self.conn.id, self.peer);
        self.conn.io.shutdown(&self.conn.stream);
        self.worker.stop();
    }
}

impl<Io: ServerIo> Drop for ClientHandler<Io> {
    fn drop(&mut self) {
        self.stop();
    }
}
