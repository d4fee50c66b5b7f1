//! Threaded TCP server.

use crate::dispatch::{EventQueue, EventRecord};
use crate::error::ServerError;
use crate::handler::{ClientHandler, ClientId};
use crate::io::{ServerIo, TcpServerIo};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use termlink_core::{is_timeout, Listeners, TimeoutConfig, Worker, WorkerContext};
use termlink_frame::{encode_frame, DataMode};

/// Events reported to server listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    ClientConnected,
    /// A complete frame arrived from a client.
    ClientDataRecv,
    ClientDisconnected,
}

/// Receives server events.
pub trait ServerListener: Send + Sync {
    fn on_server_event(&self, client: ClientId, event: ServerEvent, data: &[u8]);
}

struct Inner<Io: ServerIo> {
    io: Arc<Io>,
    mode: DataMode,
    timeouts: TimeoutConfig,
    socket: Mutex<Option<Arc<Io::Listener>>>,
    port: AtomicU16,
    max_clients: AtomicU8,
    next_id: AtomicU64,
    handlers: Mutex<Vec<ClientHandler<Io>>>,
    queue: Arc<EventQueue>,
    /// Set by `stop` before waking the queue; dispatch exits after its
    /// current batch.
    stopping: AtomicBool,
    listeners: Listeners<dyn ServerListener>,
}

impl<Io: ServerIo> Inner<Io> {
    fn notify(&self, client: ClientId, event: ServerEvent, data: &[u8]) {
        self.listeners
            .notify(|l| l.on_server_event(client, event, data));
    }

    fn listen(&self, ctx: &WorkerContext) {
        let Some(socket) = self.socket.lock().clone() else {
            return;
        };
        let port = self.port.load(Ordering::SeqCst);
        tracing::debug!("accepting connections on port {}", port);

        while ctx.is_running() {
            match self.io.accept(&socket, self.timeouts.receive()) {
                Ok(Some((stream, peer))) => self.admit(stream, peer),
                Ok(None) => {
                    ctx.sleep(self.timeouts.accept_poll());
                }
                Err(e) if is_timeout(&e) => {}
                Err(e) => {
                    tracing::error!("accept on port {} failed: {}", port, e);
                    ctx.sleep(self.timeouts.accept_poll());
                }
            }
        }
        tracing::debug!("stopped accepting on port {}", port);
    }

    fn admit(&self, stream: Io::Stream, peer: SocketAddr) {
        let mut handlers = self.handlers.lock();
        let max_clients = self.max_clients.load(Ordering::SeqCst) as usize;
        if handlers.len() >= max_clients {
            tracing::warn!(
                "rejecting {}: {} of {} clients connected",
                peer,
                handlers.len(),
                max_clients
            );
            self.io.shutdown(&stream);
            return;
        }

        let id = ClientId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::info!("[{}] accepted {}", id, peer);
        self.queue
            .push(EventRecord::new(id, ServerEvent::ClientConnected, &[]));

        let handler = ClientHandler::new(
            id,
            peer,
            stream,
            self.mode,
            self.io.clone(),
            self.queue.clone(),
        );
        match handler.start(self.timeouts.thread_start()) {
            Ok(()) => handlers.push(handler),
            Err(e) => {
                tracing::error!("[{}] cannot start handler: {}", id, e);
                self.queue
                    .push(EventRecord::new(id, ServerEvent::ClientDisconnected, &[]));
            }
        }
    }

    fn dispatch(&self, ctx: &WorkerContext) {
        while ctx.is_running() && !self.stopping.load(Ordering::SeqCst) {
            for record in self.queue.wait_pop_all(self.timeouts.receive()) {
                if record.event == ServerEvent::ClientDisconnected {
                    self.remove_handler(record.client_id);
                }
                self.notify(record.client_id, record.event, &record.data);
            }
        }
    }

    fn remove_handler(&self, id: ClientId) {
        let handler = {
            let mut handlers = self.handlers.lock();
            handlers
                .iter()
                .position(|h| h.id() == id)
                .map(|index| handlers.remove(index))
        };
        if let Some(handler) = handler {
            handler.stop();
            tracing::info!("[{}] removed, {} clients left", id, self.handlers.lock().len());
        }
    }
}

/// TCP server accepting several clients, each with its own receive thread.
///
/// All listener callbacks run on one dispatch thread, in the order the
/// events were posted, except for the events delivered by `stop`, which
/// run on the caller's thread.
pub struct SocketServer<Io: ServerIo = TcpServerIo> {
    inner: Arc<Inner<Io>>,
    listen_worker: Worker,
    dispatch_worker: Worker,
    op_lock: Mutex<()>,
}

impl SocketServer<TcpServerIo> {
    pub fn new(mode: DataMode) -> Self {
        Self::with_io(mode, TcpServerIo, TimeoutConfig::default())
    }
}

impl<Io: ServerIo> SocketServer<Io> {
    pub fn with_io(mode: DataMode, io: Io, timeouts: TimeoutConfig) -> Self {
        let inner = Arc::new(Inner {
            io: Arc::new(io),
            mode,
            timeouts,
            socket: Mutex::new(None),
            port: AtomicU16::new(0),
            max_clients: AtomicU8::new(1),
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
            queue: Arc::new(EventQueue::new()),
            stopping: AtomicBool::new(false),
            listeners: Listeners::new(),
        });

        let listen_inner = inner.clone();
        let listen_worker = Worker::new("server-listen", move |ctx| listen_inner.listen(ctx));
        let dispatch_inner = inner.clone();
        let dispatch_worker =
            Worker::new("server-dispatch", move |ctx| dispatch_inner.dispatch(ctx));

        Self {
            inner,
            listen_worker,
            dispatch_worker,
            op_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> DataMode {
        self.inner.mode
    }

    /// Listens on `port` on all IPv4 interfaces and accepts up to
    /// `max_clients` simultaneous clients.
    pub fn start(&self, port: u16, max_clients: u8) -> Result<(), ServerError> {
        let _op = self.op_lock.lock();
        if port == 0 {
            return Err(ServerError::InvalidPort(port));
        }
        if max_clients == 0 {
            return Err(ServerError::InvalidMaxClients);
        }
        if self.is_listening() {
            return Err(ServerError::AlreadyListening);
        }

        self.inner.stopping.store(false, Ordering::SeqCst);
        self.dispatch_worker
            .start(self.inner.timeouts.thread_start())?;

        let socket = self.inner.io.bind(port).map_err(|e| {
            tracing::error!("cannot listen on port {}: {}", port, e);
            ServerError::Bind { port, source: e }
        })?;
        *self.inner.socket.lock() = Some(Arc::new(socket));
        self.inner.port.store(port, Ordering::SeqCst);
        self.inner.max_clients.store(max_clients, Ordering::SeqCst);

        if let Err(e) = self
            .listen_worker
            .start(self.inner.timeouts.thread_start())
        {
            self.inner.socket.lock().take();
            return Err(e.into());
        }

        tracing::info!(
            "listening on port {} for up to {} clients in {} mode",
            port,
            max_clients,
            self.inner.mode
        );
        Ok(())
    }

    /// Stops listening and disconnects every client.
    ///
    /// Queued data is discarded, but a queued `ClientConnected` is still
    /// delivered so every client a listener saw connect is also seen to
    /// disconnect. A `ClientDisconnected` event is delivered for each live
    /// client before this returns. Stopping a stopped server does nothing.
    /// The server can be started again.
    pub fn stop(&self) {
        let _op = self.op_lock.lock();

        self.listen_worker.stop();
        self.inner.stopping.store(true, Ordering::SeqCst);
        self.inner.queue.wake();
        self.dispatch_worker.stop();

        if self.inner.socket.lock().take().is_some() {
            tracing::info!("stopped listening on port {}", self.inner.port.load(Ordering::SeqCst));
        }

        let handlers: Vec<_> = self.inner.handlers.lock().drain(..).collect();
        for handler in &handlers {
            handler.stop();
        }
        // Live handlers get their disconnect below; a queued one for a
        // handler no longer in the list came from a failed start.
        let mut dropped = 0;
        for record in self.inner.queue.drain() {
            let deliver = match record.event {
                ServerEvent::ClientConnected => true,
                ServerEvent::ClientDataRecv => false,
                ServerEvent::ClientDisconnected => {
                    !handlers.iter().any(|h| h.id() == record.client_id)
                }
            };
            if deliver {
                self.inner
                    .notify(record.client_id, record.event, &record.data);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!("discarded {} pending client events", dropped);
        }

        for handler in handlers {
            tracing::info!("[{}] disconnected", handler.id());
            self.inner
                .notify(handler.id(), ServerEvent::ClientDisconnected, &[]);
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listen_worker.is_running() && self.inner.socket.lock().is_some()
    }

    pub fn clients_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }

    /// Sends `data` as one frame to every connected client.
    ///
    /// Returns how many clients accepted the frame; failing for one client
    /// does not stop delivery to the others.
    pub fn write(&self, data: &[u8]) -> Result<usize, ServerError> {
        let frame = encode_frame(self.inner.mode, data)?;

        let handlers = self.inner.handlers.lock();
        let mut accepted = 0;
        for handler in handlers.iter() {
            match handler.send_frame(&frame) {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!("[{}] send failed: {}", handler.id(), e),
            }
        }

        if accepted == 0 {
            return Err(ServerError::NoClientAccepted);
        }
        Ok(accepted)
    }

    pub fn add_listener<L: ServerListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Arc<dyn ServerListener> = listener.clone();
        self.inner.listeners.add(&listener);
    }

    pub fn remove_listener<L: ServerListener + 'static>(&self, listener: &Arc<L>) -> bool {
        let listener: Arc<dyn ServerListener> = listener.clone();
        self.inner.listeners.remove(&listener)
    }
}

impl<Io: ServerIo> Drop for SocketServer<Io> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Condvar;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::net::{Ipv4Addr, TcpListener, TcpStream};
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::{Duration, Instant};
    use termlink_client::{ClientEvent, ClientListener, SocketClient};
    use termlink_frame::{FrameError, MAX_PAYLOAD_LENGTH};

    type Event = (ClientId, ServerEvent, Vec<u8>);

    #[derive(Default)]
    struct Collector {
        events: Mutex<Vec<Event>>,
        changed: Condvar,
    }

    impl ServerListener for Collector {
        fn on_server_event(&self, client: ClientId, event: ServerEvent, data: &[u8]) {
            self.events.lock().push((client, event, data.to_vec()));
            self.changed.notify_all();
        }
    }

    impl Collector {
        fn wait_for(&self, count: usize) -> Vec<Event> {
            let mut events = self.events.lock();
            self.changed
                .wait_while_for(&mut events, |e| e.len() < count, Duration::from_secs(5));
            events.clone()
        }

        fn count(&self, event: ServerEvent) -> usize {
            self.events.lock().iter().filter(|e| e.1 == event).count()
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            if Instant::now() > deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    #[derive(Default)]
    struct FakeStream {
        reads: Mutex<VecDeque<Vec<u8>>>,
        sent: Mutex<Vec<u8>>,
        fail_send: AtomicBool,
        shut: AtomicBool,
    }

    #[derive(Default)]
    struct FakeNet {
        pending: Mutex<VecDeque<Arc<FakeStream>>>,
        refuse_bind: AtomicBool,
    }

    struct FakeIo(Arc<FakeNet>);

    impl ServerIo for FakeIo {
        type Listener = ();
        type Stream = Arc<FakeStream>;

        fn bind(&self, _port: u16) -> io::Result<()> {
            if self.0.refuse_bind.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::AddrInUse, "in use"));
            }
            Ok(())
        }

        fn accept(
            &self,
            _listener: &(),
            _recv_timeout: Duration,
        ) -> io::Result<Option<(Self::Stream, SocketAddr)>> {
            Ok(self
                .0
                .pending
                .lock()
                .pop_front()
                .map(|s| (s, "10.0.0.9:40000".parse().unwrap())))
        }

        fn recv(&self, stream: &Self::Stream, buf: &mut [u8]) -> io::Result<usize> {
            if stream.shut.load(Ordering::SeqCst) {
                return Ok(0);
            }
            match stream.reads.lock().pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => {
                    thread::sleep(Duration::from_millis(5));
                    Err(io::Error::new(io::ErrorKind::WouldBlock, "timeout"))
                }
            }
        }

        fn send(&self, stream: &Self::Stream, data: &[u8]) -> io::Result<usize> {
            if stream.fail_send.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"));
            }
            stream.sent.lock().extend_from_slice(data);
            Ok(data.len())
        }

        fn shutdown(&self, stream: &Self::Stream) {
            stream.shut.store(true, Ordering::SeqCst);
        }
    }

    fn setup(mode: DataMode) -> (SocketServer<FakeIo>, Arc<FakeNet>, Arc<Collector>) {
        let net = Arc::new(FakeNet::default());
        let server = SocketServer::with_io(mode, FakeIo(net.clone()), TimeoutConfig::default());
        let collector = Arc::new(Collector::default());
        server.add_listener(&collector);
        (server, net, collector)
    }

    fn connect_fake(server: &SocketServer<FakeIo>, net: &FakeNet) -> Arc<FakeStream> {
        let stream = Arc::new(FakeStream::default());
        let expected = server.clients_count() + 1;
        net.pending.lock().push_back(stream.clone());
        assert!(wait_until(|| server.clients_count() == expected));
        stream
    }

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_start_rejects_bad_arguments() {
        let (server, _net, _collector) = setup(DataMode::NewLineDelimiter);
        assert!(matches!(server.start(0, 1), Err(ServerError::InvalidPort(0))));
        assert!(matches!(server.start(1234, 0), Err(ServerError::InvalidMaxClients)));
        assert!(!server.is_listening());
    }

    #[test]
    fn test_bind_failure() {
        let (server, net, _collector) = setup(DataMode::NewLineDelimiter);
        net.refuse_bind.store(true, Ordering::SeqCst);
        let result = server.start(1234, 1);
        assert!(matches!(result, Err(ServerError::Bind { port: 1234, .. })));
        assert!(!server.is_listening());

        net.refuse_bind.store(false, Ordering::SeqCst);
        server.start(1234, 1).unwrap();
        assert!(server.is_listening());
    }

    #[test]
    fn test_second_start_rejected() {
        let (server, _net, _collector) = setup(DataMode::NewLineDelimiter);
        server.start(1234, 1).unwrap();
        assert!(matches!(server.start(1234, 1), Err(ServerError::AlreadyListening)));
        assert!(server.is_listening());
    }

    #[test]
    fn test_events_are_ordered_per_client() {
        let (server, net, collector) = setup(DataMode::NewLineDelimiter);
        server.start(1234, 1).unwrap();

        let stream = Arc::new(FakeStream::default());
        stream.reads.lock().push_back(b"ping\npo".to_vec());
        stream.reads.lock().push_back(b"ng\n".to_vec());
        stream.reads.lock().push_back(Vec::new());
        net.pending.lock().push_back(stream);

        let events = collector.wait_for(4);
        let id = events[0].0;
        assert_eq!(
            events,
            vec![
                (id, ServerEvent::ClientConnected, Vec::new()),
                (id, ServerEvent::ClientDataRecv, b"ping\n".to_vec()),
                (id, ServerEvent::ClientDataRecv, b"pong\n".to_vec()),
                (id, ServerEvent::ClientDisconnected, Vec::new()),
            ]
        );
        assert!(wait_until(|| server.clients_count() == 0));
    }

    #[test]
    fn test_max_clients_enforced() {
        let (server, net, collector) = setup(DataMode::NewLineDelimiter);
        server.start(1234, 1).unwrap();
        connect_fake(&server, &net);

        let extra = Arc::new(FakeStream::default());
        net.pending.lock().push_back(extra.clone());
        assert!(wait_until(|| extra.shut.load(Ordering::SeqCst)));
        assert_eq!(server.clients_count(), 1);

        collector.wait_for(1);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(collector.count(ServerEvent::ClientConnected), 1);
    }

    #[test]
    fn test_write_broadcasts_with_or_semantics() {
        let (server, net, _collector) = setup(DataMode::PayloadHeader);
        assert!(matches!(server.write(b"x"), Err(ServerError::NoClientAccepted)));

        server.start(1234, 3).unwrap();
        let first = connect_fake(&server, &net);
        let second = connect_fake(&server, &net);
        second.fail_send.store(true, Ordering::SeqCst);

        assert_eq!(server.write(b"HI").unwrap(), 1);
        assert_eq!(&first.sent.lock()[..], &[2, 0, 0, 0, b'H', b'I']);
        assert!(second.sent.lock().is_empty());

        first.fail_send.store(true, Ordering::SeqCst);
        assert!(matches!(server.write(b"HI"), Err(ServerError::NoClientAccepted)));
    }

    #[test]
    fn test_write_rejects_oversized_frame() {
        let (server, net, _collector) = setup(DataMode::PayloadHeader);
        server.start(1234, 1).unwrap();
        connect_fake(&server, &net);
        let result = server.write(&vec![0u8; MAX_PAYLOAD_LENGTH]);
        assert!(matches!(result, Err(ServerError::Frame(FrameError::FrameTooLarge { .. }))));
    }

    #[test]
    fn test_stop_notifies_each_client_once() {
        let (server, net, collector) = setup(DataMode::NewLineDelimiter);
        server.start(1234, 3).unwrap();
        let streams: Vec<_> = (0..3).map(|_| connect_fake(&server, &net)).collect();
        collector.wait_for(3);

        server.stop();
        assert!(!server.is_listening());
        assert_eq!(server.clients_count(), 0);
        assert!(streams.iter().all(|s| s.shut.load(Ordering::SeqCst)));

        let events = collector.events.lock().clone();
        let mut disconnected: Vec<_> = events
            .iter()
            .filter(|e| e.1 == ServerEvent::ClientDisconnected)
            .map(|e| e.0)
            .collect();
        disconnected.sort();
        disconnected.dedup();
        assert_eq!(disconnected.len(), 3);
        assert_eq!(collector.count(ServerEvent::ClientDisconnected), 3);

        server.stop();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(collector.count(ServerEvent::ClientDisconnected), 3);
    }

    #[test]
    fn test_stop_does_not_wait_out_receive_timeout() {
        let (server, net, _collector) = setup(DataMode::NewLineDelimiter);
        let receive = TimeoutConfig::default().receive();
        for _ in 0..5 {
            server.start(1234, 1).unwrap();
            connect_fake(&server, &net);
            thread::sleep(Duration::from_millis(20));

            let start = Instant::now();
            server.stop();
            assert!(start.elapsed() < receive / 2, "stop took {:?}", start.elapsed());
        }

        let server = SocketServer::new(DataMode::NewLineDelimiter);
        server.start(free_port(), 1).unwrap();
        let start = Instant::now();
        server.stop();
        assert!(start.elapsed() < receive / 2, "stop took {:?}", start.elapsed());
    }

    /// Blocks inside the first callback until released.
    #[derive(Default)]
    struct GatedCollector {
        inner: Collector,
        entered: AtomicBool,
        open: Mutex<bool>,
        opened: Condvar,
    }

    impl ServerListener for GatedCollector {
        fn on_server_event(&self, client: ClientId, event: ServerEvent, data: &[u8]) {
            self.inner.on_server_event(client, event, data);
            if !self.entered.swap(true, Ordering::SeqCst) {
                let mut open = self.open.lock();
                self.opened.wait_while(&mut open, |o| !*o);
            }
        }
    }

    impl GatedCollector {
        fn release(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    #[test]
    fn test_stop_delivers_queued_connect_before_disconnect() {
        let net = Arc::new(FakeNet::default());
        let server = SocketServer::with_io(
            DataMode::NewLineDelimiter,
            FakeIo(net.clone()),
            TimeoutConfig::default(),
        );
        let gated = Arc::new(GatedCollector::default());
        server.add_listener(&gated);
        server.start(1234, 2).unwrap();

        connect_fake(&server, &net);
        assert!(wait_until(|| gated.entered.load(Ordering::SeqCst)));
        // Dispatch is stuck in the first callback, so this connect stays queued.
        connect_fake(&server, &net);

        let releaser = {
            let gated = gated.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                gated.release();
            })
        };
        server.stop();
        releaser.join().unwrap();

        let events = gated.inner.events.lock().clone();
        let mut ids: Vec<_> = events.iter().map(|e| e.0).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 2);
        for id in ids {
            let kinds: Vec<_> = events.iter().filter(|e| e.0 == id).map(|e| e.1).collect();
            assert_eq!(
                kinds,
                vec![ServerEvent::ClientConnected, ServerEvent::ClientDisconnected]
            );
        }
    }

    #[test]
    fn test_restart_after_stop() {
        let (server, net, collector) = setup(DataMode::NewLineDelimiter);
        server.start(1234, 1).unwrap();
        connect_fake(&server, &net);
        server.stop();

        server.start(1234, 1).unwrap();
        assert!(server.is_listening());
        connect_fake(&server, &net);
        let events = collector.wait_for(3);
        let connected: Vec<_> = events
            .iter()
            .filter(|e| e.1 == ServerEvent::ClientConnected)
            .map(|e| e.0)
            .collect();
        assert_eq!(connected.len(), 2);
        assert_ne!(connected[0], connected[1]);
    }

    #[test]
    fn test_loopback_tcp_peers() {
        let port = free_port();
        let server = SocketServer::new(DataMode::NewLineDelimiter);
        let collector = Arc::new(Collector::default());
        server.add_listener(&collector);
        server.start(port, 2).unwrap();

        let mut a = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        let mut b = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        assert!(wait_until(|| server.clients_count() == 2));

        a.write_all(b"from a\n").unwrap();
        assert!(wait_until(|| collector.count(ServerEvent::ClientDataRecv) == 1));

        assert_eq!(server.write(b"to all\n").unwrap(), 2);
        for peer in [&mut a, &mut b] {
            let mut buf = [0u8; 7];
            peer.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"to all\n");
        }

        drop(b);
        assert!(wait_until(|| collector.count(ServerEvent::ClientDisconnected) == 1));
        assert_eq!(server.clients_count(), 1);

        server.stop();
        assert_eq!(collector.count(ServerEvent::ClientDisconnected), 2);
        let mut buf = [0u8; 1];
        assert_eq!(a.read(&mut buf).unwrap(), 0);
    }

    #[derive(Default)]
    struct ClientCollector {
        frames: Mutex<Vec<Vec<u8>>>,
        changed: Condvar,
    }

    impl ClientListener for ClientCollector {
        fn on_client_event(&self, event: ClientEvent, data: &[u8]) {
            if event == ClientEvent::ServerDataRecv {
                self.frames.lock().push(data.to_vec());
                self.changed.notify_all();
            }
        }
    }

    #[test]
    fn test_header_mode_with_socket_client() {
        let port = free_port();
        let server = SocketServer::new(DataMode::PayloadHeader);
        let collector = Arc::new(Collector::default());
        server.add_listener(&collector);
        server.start(port, 1).unwrap();

        let client = SocketClient::new(DataMode::PayloadHeader);
        let received = Arc::new(ClientCollector::default());
        client.add_listener(&received);
        client.connect("127.0.0.1", port).unwrap();
        assert!(wait_until(|| server.clients_count() == 1));

        client.write(b"HELLO").unwrap();
        let events = collector.wait_for(2);
        assert_eq!(events[1].1, ServerEvent::ClientDataRecv);
        assert_eq!(events[1].2, b"HELLO");

        server.write(b"WORLD").unwrap();
        let mut frames = received.frames.lock();
        received
            .changed
            .wait_while_for(&mut frames, |f| f.is_empty(), Duration::from_secs(5));
        assert_eq!(frames.as_slice(), &[b"WORLD".to_vec()]);
        drop(frames);

        client.disconnect();
        assert!(wait_until(|| server.clients_count() == 0));
    }
}
