//! Socket access used by the server.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Operating system access to a listening socket and its accepted streams.
///
/// `accept` must not block; it returns `Ok(None)` when no connection is
/// pending. Streams and listeners are closed when dropped.
pub trait ServerIo: Send + Sync + 'static {
    type Listener: Send + Sync + 'static;
    type Stream: Send + Sync + 'static;

    /// Binds all IPv4 interfaces on `port`.
    fn bind(&self, port: u16) -> io::Result<Self::Listener>;

    /// Accepts one pending connection. `recv` on the returned stream must
    /// return within `recv_timeout`.
    fn accept(
        &self,
        listener: &Self::Listener,
        recv_timeout: Duration,
    ) -> io::Result<Option<(Self::Stream, SocketAddr)>>;

    fn recv(&self, stream: &Self::Stream, buf: &mut [u8]) -> io::Result<usize>;

    fn send(&self, stream: &Self::Stream, data: &[u8]) -> io::Result<usize>;

    /// Shuts both directions down, unblocking a pending `recv`.
    fn shutdown(&self, stream: &Self::Stream);
}

/// `ServerIo` over `std::net`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpServerIo;

impl ServerIo for TcpServerIo {
    type Listener = TcpListener;
    type Stream = TcpStream;

    fn bind(&self, port: u16) -> io::Result<TcpListener> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    fn accept(
        &self,
        listener: &TcpListener,
        recv_timeout: Duration,
    ) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(recv_timeout))?;
                stream.set_nodelay(true)?;
                Ok(Some((stream, peer)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
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
