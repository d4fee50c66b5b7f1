//! Headless terminal: one transport, received frames on stdout, stdin lines
//! to the peer.

use crate::config::{Config, TransportKind};
use std::io::{self, BufRead};
use std::sync::Arc;
use termlink_client::{ClientError, ClientEvent, ClientListener, SocketClient, TcpIo};
use termlink_core::{ThroughputCalculator, Worker};
use termlink_server::{ClientId, ServerError, ServerEvent, ServerListener, SocketServer, TcpServerIo};
use termlink_serial::{SerialDriver, SerialError, SerialEvent, SerialListener, TermiosIo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("stdin: {0}")]
    Stdin(#[from] io::Error),
}

/// Renders a received frame as one output line.
pub fn format_frame(client: Option<ClientId>, data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_end_matches(&['\r', '\n'][..]);
    match client {
        Some(id) => format!("[{}] {}", id, text),
        None => text.to_string(),
    }
}

/// Listener printing every frame and counting received bytes.
#[derive(Default)]
pub struct FrameSink {
    rx: ThroughputCalculator,
}

impl FrameSink {
    pub fn new() -> Self {
        let sink = Self::default();
        sink.rx.start();
        sink
    }

    pub fn throughput(&self) -> &ThroughputCalculator {
        &self.rx
    }

    fn frame(&self, client: Option<ClientId>, data: &[u8]) {
        self.rx.report_bytes(data.len());
        println!("{}", format_frame(client, data));
    }
}

impl SerialListener for FrameSink {
    fn on_serial_event(&self, event: SerialEvent, data: &[u8]) {
        match event {
            SerialEvent::DataReceived => self.frame(None, data),
            SerialEvent::Disconnected => tracing::info!("serial port closed"),
            SerialEvent::CommunicationError => tracing::error!("serial communication error"),
        }
    }
}

impl ClientListener for FrameSink {
    fn on_client_event(&self, event: ClientEvent, data: &[u8]) {
        match event {
            ClientEvent::ServerDataRecv => self.frame(None, data),
            ClientEvent::ServerDisconnected => tracing::warn!("server disconnected"),
        }
    }
}

impl ServerListener for FrameSink {
    fn on_server_event(&self, client: ClientId, event: ServerEvent, data: &[u8]) {
        match event {
            ServerEvent::ClientConnected => tracing::info!("[{}] connected", client),
            ServerEvent::ClientDataRecv => self.frame(Some(client), data),
            ServerEvent::ClientDisconnected => tracing::info!("[{}] disconnected", client),
        }
    }
}

/// The transport selected by the configuration.
pub enum Transport {
    Serial(SerialDriver<TermiosIo>),
    Client(SocketClient<TcpIo>),
    Server(SocketServer<TcpServerIo>),
}

impl Transport {
    /// Creates the configured transport, registers `sink` and opens it.
    pub fn open(config: &Config, sink: &Arc<FrameSink>) -> Result<Self, TerminalError> {
        let timeouts = config.timeouts.clone();
        let transport = match config.transport {
            TransportKind::Serial => {
                let driver = SerialDriver::with_io(TermiosIo, timeouts);
                driver.add_listener(sink);
                driver.open(&config.serial)?;
                Transport::Serial(driver)
            }
            TransportKind::Client => {
                let client = SocketClient::with_io(config.client.mode, TcpIo::default(), timeouts);
                client.add_listener(sink);
                client.connect(&config.client.address, config.client.port)?;
                Transport::Client(client)
            }
            TransportKind::Server => {
                let server = SocketServer::with_io(config.server.mode, TcpServerIo, timeouts);
                server.add_listener(sink);
                server.start(config.server.port, config.server.max_clients)?;
                Transport::Server(server)
            }
        };
        Ok(transport)
    }

    pub fn write(&self, data: &[u8]) -> Result<(), TerminalError> {
        match self {
            Transport::Serial(driver) => driver.write(data)?,
            Transport::Client(client) => client.write(data)?,
            Transport::Server(server) => {
                let accepted = server.write(data)?;
                tracing::debug!("sent to {} clients", accepted);
            }
        }
        Ok(())
    }

    pub fn close(&self) {
        match self {
            Transport::Serial(driver) => driver.close(),
            Transport::Client(client) => client.disconnect(),
            Transport::Server(server) => server.stop(),
        }
    }
}

/// Forwards stdin lines, newline included, until EOF.
///
/// A failed write is logged and the line dropped, except for a client
/// whose server went away, which ends the session.
pub fn forward_lines(transport: &Transport, input: impl BufRead) -> Result<u64, TerminalError> {
    let mut sent = 0;
    for line in input.lines() {
        let mut line = line?.into_bytes();
        line.push(b'\n');
        match transport.write(&line) {
            Ok(()) => sent += 1,
            Err(TerminalError::Client(ClientError::NotConnected)) => {
                tracing::warn!("not connected, stopping input");
                break;
            }
            Err(e) => tracing::warn!("write failed: {}", e),
        }
    }
    Ok(sent)
}

/// Runs the terminal until stdin reaches EOF.
pub fn run(config: &Config) -> Result<(), TerminalError> {
    let sink = Arc::new(FrameSink::new());
    let transport = Transport::open(config, &sink)?;

    let reporter = config.throughput_interval().map(|interval| {
        let sink = sink.clone();
        let worker = Worker::new("throughput", move |ctx| {
            while ctx.sleep(interval) {
                tracing::info!("rx throughput: {}", sink.throughput().get());
            }
        });
        if let Err(e) = worker.start(config.timeouts.thread_start()) {
            tracing::warn!("throughput reporting disabled: {}", e);
        }
        worker
    });

    let result = forward_lines(&transport, io::stdin().lock());
    tracing::info!("input closed, shutting down");

    transport.close();
    if let Some(reporter) = reporter {
        reporter.stop();
    }
    result.map(|sent| tracing::info!("sent {} lines", sent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::net::TcpListener;
    use std::thread;
    use termlink_frame::DataMode;

    #[test]
    fn test_format_frame() {
        assert_eq!(format_frame(None, b"hello\r\n"), "hello");
        assert_eq!(format_frame(Some(ClientId::new(2)), b"hi\n"), "[client-2] hi");
        assert_eq!(format_frame(None, &[0x66, 0xff, b'\n']), "f\u{fffd}");
    }

    #[test]
    fn test_sink_counts_received_bytes() {
        let sink = FrameSink::new();
        SerialListener::on_serial_event(&sink, SerialEvent::DataReceived, b"abc\n");
        ServerListener::on_server_event(&sink, ClientId::new(1), ServerEvent::ClientConnected, &[]);
        assert!(sink.throughput().is_started());
        thread::sleep(std::time::Duration::from_millis(5));
        assert!(sink.throughput().get().value > 0.0);
    }

    #[test]
    fn test_client_session_forwards_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).unwrap();
            received
        });

        let mut config = Config {
            transport: TransportKind::Client,
            ..Config::default()
        };
        config.client.port = port;
        config.client.mode = DataMode::NewLineDelimiter;

        let sink = Arc::new(FrameSink::new());
        let transport = Transport::open(&config, &sink).unwrap();
        let sent = forward_lines(&transport, Cursor::new("one\ntwo\n")).unwrap();
        assert_eq!(sent, 2);
        transport.close();

        assert_eq!(peer.join().unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn test_open_reports_transport_errors() {
        let mut config = Config {
            transport: TransportKind::Server,
            ..Config::default()
        };
        config.server.port = 0;
        let sink = Arc::new(FrameSink::new());
        assert!(matches!(
            Transport::open(&config, &sink),
            Err(TerminalError::Server(ServerError::InvalidPort(0)))
        ));
    }
}
