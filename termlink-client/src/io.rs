//! Socket access used by the client.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

/// Operating system access to a client TCP socket.
///
/// The stream is closed when dropped. `recv` and `send` may be called
/// concurrently on the same stream; `recv` must return within the receive
/// timeout given to `connect`.
pub trait SocketIo: Send + Sync + 'static {
    type Stream: Send + Sync + 'static;

    fn connect(&self, addr: SocketAddrV4, recv_timeout: Duration) -> io::Result<Self::Stream>;

    fn recv(&self, stream: &Self::Stream, buf: &mut [u8]) -> io::Result<usize>;

    fn send(&self, stream: &Self::Stream, data: &[u8]) -> io::Result<usize>;

    /// Shuts both directions down, unblocking a pending `recv`.
    fn shutdown(&self, stream: &Self::Stream);
}

/// `SocketIo` over `std::net::TcpStream`.
#[derive(Debug, Clone, Copy)]
pub struct TcpIo {
    connect_timeout: Duration,
}

impl Default for TcpIo {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TcpIo {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl SocketIo for TcpIo {
    type Stream = TcpStream;

    fn connect(&self, addr: SocketAddrV4, recv_timeout: Duration) -> io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&SocketAddr::V4(addr), self.connect_timeout)?;
        stream.set_read_timeout(Some(recv_timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn recv(&self, stream: &TcpStream, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = stream;
        stream.read(buf)
    }

    fn send(&self, stream: &TcpStream, data: &[u8]) -> io::Result<usize> {
        let mut stream = stream;
        stream.write(data)
    }

    fn shutdown(&self, stream: &TcpStream) {
        let _ = stream.shutdown(Shutdown::Both);
    }
}
