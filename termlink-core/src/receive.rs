//! Framed receive loop shared by socket clients and server-side handlers.

use std::io;
use termlink_frame::{decode_header, validate_declared_length, DataMode, ReceiveBuffer};
use termlink_frame::{HEADER_SIZE, MAX_PAYLOAD_LENGTH};

/// Why a receive loop returned.
#[derive(Debug)]
pub enum LoopExit {
    /// `keep_running` turned false.
    Stopped,
    /// The peer closed the connection (a read returned zero bytes).
    PeerClosed,
    /// A read failed, or the peer violated the framing.
    Failed(io::Error),
}

impl LoopExit {
    /// True when the connection was lost rather than released on request.
    pub fn is_disconnect(&self) -> bool {
        !matches!(self, LoopExit::Stopped)
    }
}

/// Returns true for errors produced by a receive timeout.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Reads frames from `recv` until the peer goes away or `keep_running`
/// turns false, handing each complete frame to `on_frame`.
///
/// `recv` is expected to block for a bounded time; timeouts only give the
/// loop a chance to check `keep_running`. In delimiter mode frames are
/// delivered with their trailing `\n`; in header mode only the payload is
/// delivered.
pub fn receive_frames<R, K, F>(mode: DataMode, mut recv: R, keep_running: K, mut on_frame: F) -> LoopExit
where
    R: FnMut(&mut [u8]) -> io::Result<usize>,
    K: Fn() -> bool,
    F: FnMut(&[u8]),
{
    match mode {
        DataMode::NewLineDelimiter => {
            let mut buffer = ReceiveBuffer::new();
            loop {
                if !keep_running() {
                    return LoopExit::Stopped;
                }
                match recv(buffer.spare_mut()) {
                    Ok(0) => return LoopExit::PeerClosed,
                    Ok(n) => {
                        buffer.commit(n);
                        buffer.drain_frames(&mut on_frame);
                    }
                    Err(e) if is_timeout(&e) => continue,
                    Err(e) => return LoopExit::Failed(e),
                }
            }
        }
        DataMode::PayloadHeader => {
            let mut header = [0u8; HEADER_SIZE];
            let mut payload = vec![0u8; MAX_PAYLOAD_LENGTH];
            loop {
                if let Err(exit) = read_exact(&mut recv, &keep_running, &mut header) {
                    return exit;
                }
                let len = match validate_declared_length(decode_header(header)) {
                    Ok(len) => len,
                    Err(e) => {
                        tracing::warn!("dropping connection: {}", e);
                        return LoopExit::Failed(io::Error::new(io::ErrorKind::InvalidData, e));
                    }
                };
                if let Err(exit) = read_exact(&mut recv, &keep_running, &mut payload[..len]) {
                    return exit;
                }
                on_frame(&payload[..len]);
            }
        }
    }
}

/// Fills `buf` completely, accumulating partial reads across timeouts.
fn read_exact<R, K>(recv: &mut R, keep_running: &K, buf: &mut [u8]) -> Result<(), LoopExit>
where
    R: FnMut(&mut [u8]) -> io::Result<usize>,
    K: Fn() -> bool,
{
    let mut filled = 0;
    while filled < buf.len() {
        if !keep_running() {
            return Err(LoopExit::Stopped);
        }
        match recv(&mut buf[filled..]) {
            Ok(0) => return Err(LoopExit::PeerClosed),
            Ok(n) => filled += n,
            Err(e) if is_timeout(&e) => continue,
            Err(e) => return Err(LoopExit::Failed(e)),
        }
    }
    // An empty payload still has to observe a stop request.
    if buf.is_empty() && !keep_running() {
        return Err(LoopExit::Stopped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use termlink_frame::encode_frame;

    /// Scripted reads: each entry is either a chunk or an error kind.
    fn scripted(
        script: Vec<io::Result<Vec<u8>>>,
    ) -> impl FnMut(&mut [u8]) -> io::Result<usize> {
        let mut script: VecDeque<io::Result<Vec<u8>>> = script.into();
        let mut carry: Vec<u8> = Vec::new();
        move |buf: &mut [u8]| {
            if carry.is_empty() {
                match script.pop_front() {
                    Some(Ok(chunk)) => carry = chunk,
                    Some(Err(e)) => return Err(e),
                    None => return Ok(0),
                }
            }
            let n = buf.len().min(carry.len());
            buf[..n].copy_from_slice(&carry[..n]);
            carry.drain(..n);
            Ok(n)
        }
    }

    fn timeout() -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::WouldBlock, "timeout"))
    }

    #[test]
    fn test_delimiter_frames_across_timeouts() {
        let recv = scripted(vec![
            Ok(b"he".to_vec()),
            timeout(),
            Ok(b"llo\nwor".to_vec()),
            timeout(),
            Ok(b"ld\n".to_vec()),
        ]);

        let mut frames = Vec::new();
        let exit = receive_frames(DataMode::NewLineDelimiter, recv, || true, |f| {
            frames.push(f.to_vec())
        });

        assert!(matches!(exit, LoopExit::PeerClosed));
        assert_eq!(frames, vec![b"hello\n".to_vec(), b"world\n".to_vec()]);
    }

    #[test]
    fn test_header_frames_split_anywhere() {
        let mut wire = encode_frame(DataMode::PayloadHeader, b"HELLO").unwrap().to_vec();
        wire.extend_from_slice(&encode_frame(DataMode::PayloadHeader, b"").unwrap());
        wire.extend_from_slice(&encode_frame(DataMode::PayloadHeader, b"AB").unwrap());

        let script = wire
            .chunks(3)
            .flat_map(|c| vec![Ok(c.to_vec()), timeout()])
            .collect();

        let mut frames = Vec::new();
        let exit = receive_frames(DataMode::PayloadHeader, scripted(script), || true, |f| {
            frames.push(f.to_vec())
        });

        assert!(matches!(exit, LoopExit::PeerClosed));
        assert_eq!(
            frames,
            vec![b"HELLO".to_vec(), Vec::new(), b"AB".to_vec()]
        );
    }

    #[test]
    fn test_header_oversized_length_disconnects() {
        let wire = ((MAX_PAYLOAD_LENGTH as u32) + 1).to_le_bytes().to_vec();
        let mut frames = 0;
        let exit = receive_frames(DataMode::PayloadHeader, scripted(vec![Ok(wire)]), || true, |_| {
            frames += 1
        });
        match exit {
            LoopExit::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected exit: {:?}", other),
        }
        assert_eq!(frames, 0);
    }

    #[test]
    fn test_peer_closed_mid_payload() {
        let recv = scripted(vec![Ok(vec![10, 0, 0, 0, b'a', b'b'])]);
        let exit = receive_frames(DataMode::PayloadHeader, recv, || true, |_| {
            panic!("no frame expected")
        });
        assert!(matches!(exit, LoopExit::PeerClosed));
    }

    #[test]
    fn test_hard_error_fails() {
        let recv = scripted(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ))]);
        let exit = receive_frames(DataMode::NewLineDelimiter, recv, || true, |_| {});
        match exit {
            LoopExit::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected exit: {:?}", other),
        }
    }

    #[test]
    fn test_stop_observed_on_timeout() {
        let calls = std::cell::Cell::new(0);
        let recv = |_: &mut [u8]| -> io::Result<usize> {
            calls.set(calls.get() + 1);
            Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
        };
        let exit = receive_frames(DataMode::PayloadHeader, recv, || calls.get() < 3, |_| {});
        assert!(matches!(exit, LoopExit::Stopped));
        assert!(!exit.is_disconnect());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_is_timeout() {
        assert!(is_timeout(&io::Error::new(io::ErrorKind::WouldBlock, "")));
        assert!(is_timeout(&io::Error::new(io::ErrorKind::TimedOut, "")));
        assert!(is_timeout(&io::Error::new(io::ErrorKind::Interrupted, "")));
        assert!(!is_timeout(&io::Error::new(io::ErrorKind::BrokenPipe, "")));
    }
}
