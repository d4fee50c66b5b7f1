//! Bounded receive buffer for delimiter-mode reassembly.

use crate::codec::scan_delimiter;
use crate::MAX_PAYLOAD_LENGTH;

/// Fixed-capacity buffer that reassembles newline-terminated frames from
/// arbitrarily chunked reads.
///
/// Between reads the buffer holds at most one partial frame at its start.
/// When a partial frame fills the whole capacity without a delimiter, it is
/// discarded before the next read.
///
/// ```
/// use termlink_frame::ReceiveBuffer;
///
/// let mut buf = ReceiveBuffer::new();
/// let chunk = b"hello\nwor";
/// buf.spare_mut()[..chunk.len()].copy_from_slice(chunk);
/// buf.commit(chunk.len());
///
/// let mut frames = Vec::new();
/// buf.drain_frames(|frame| frames.push(frame.to_vec()));
/// assert_eq!(frames, vec![b"hello\n".to_vec()]);
/// assert_eq!(buf.pending(), b"wor");
/// ```
pub struct ReceiveBuffer {
    data: Box<[u8]>,
    len: usize,
    dropped: u64,
}

impl ReceiveBuffer {
    /// Creates a buffer holding up to `MAX_PAYLOAD_LENGTH` bytes.
    pub fn new() -> Self {
        Self::with_capacity(MAX_PAYLOAD_LENGTH)
    }

    /// Creates a buffer with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)].into_boxed_slice(),
            len: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes of the partial frame waiting for its delimiter.
    pub fn pending(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Total number of bytes discarded by the overflow policy.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped
    }

    /// Returns the writable tail for the next read.
    ///
    /// If the buffer is full and holds no delimiter, its content is thrown
    /// away first so the returned slice is never empty.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        if self.len == self.data.len() {
            tracing::warn!(
                "receive buffer full without delimiter, discarding {} bytes",
                self.len
            );
            self.dropped += self.len as u64;
            self.len = 0;
        }
        &mut self.data[self.len..]
    }

    /// Records `n` bytes written into the slice returned by `spare_mut`.
    pub fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(self.data.len());
    }

    /// Delivers every complete frame, delimiter included, in arrival order,
    /// then moves the remaining partial frame to the start of the buffer.
    ///
    /// Returns the number of frames delivered.
    pub fn drain_frames<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut start = 0;
        let mut delivered = 0;

        while let Some(idx) = scan_delimiter(&self.data[start..self.len]) {
            let end = start + idx + 1;
            f(&self.data[start..end]);
            delivered += 1;
            start = end;
        }

        if start > 0 {
            self.data.copy_within(start..self.len, 0);
            self.len -= start;
        }
        delivered
    }

    /// Discards everything buffered.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}
