//! Queue carrying client events from handler threads to the dispatch thread.

use crate::handler::ClientId;
use crate::server::ServerEvent;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// One event posted by a client handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub client_id: ClientId,
    pub event: ServerEvent,
    pub data: Vec<u8>,
}

impl EventRecord {
    pub fn new(client_id: ClientId, event: ServerEvent, data: &[u8]) -> Self {
        Self {
            client_id,
            event,
            data: data.to_vec(),
        }
    }
}

#[derive(Default)]
struct QueueState {
    records: VecDeque<EventRecord>,
    woken: bool,
}

/// FIFO of `EventRecord`s shared by many producers and one consumer.
#[derive(Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: EventRecord) {
        self.state.lock().records.push_back(record);
        self.available.notify_one();
    }

    /// Waits up to `timeout` for records and takes all of them.
    ///
    /// Returns early, possibly with nothing, after `wake`.
    pub fn wait_pop_all(&self, timeout: Duration) -> Vec<EventRecord> {
        let mut state = self.state.lock();
        self.available
            .wait_while_for(&mut state, |s| s.records.is_empty() && !s.woken, timeout);
        state.woken = false;
        state.records.drain(..).collect()
    }

    /// Interrupts the current or next `wait_pop_all`.
    pub fn wake(&self) {
        self.state.lock().woken = true;
        self.available.notify_all();
    }

    /// Takes every queued record without waiting and resets the wake flag.
    pub fn drain(&self) -> Vec<EventRecord> {
        let mut state = self.state.lock();
        state.woken = false;
        state.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn record(id: u64, data: &[u8]) -> EventRecord {
        EventRecord::new(ClientId::new(id), ServerEvent::ClientDataRecv, data)
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        queue.push(record(1, b"a"));
        queue.push(record(2, b"b"));
        queue.push(record(1, b"c"));

        let batch = queue.wait_pop_all(Duration::from_millis(10));
        let data: Vec<_> = batch.iter().map(|r| r.data.clone()).collect();
        assert_eq!(data, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wait_times_out_empty() {
        let queue = EventQueue::new();
        let start = Instant::now();
        assert!(queue.wait_pop_all(Duration::from_millis(30)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_push_wakes_waiter() {
        let queue = Arc::new(EventQueue::new());
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(record(7, b"x"));
        });

        let batch = queue.wait_pop_all(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(batch, vec![record(7, b"x")]);
    }

    #[test]
    fn test_wake_before_wait() {
        let queue = EventQueue::new();
        queue.wake();
        let start = Instant::now();
        assert!(queue.wait_pop_all(Duration::from_secs(5)).is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drain() {
        let queue = EventQueue::new();
        queue.push(record(1, b"a"));
        queue.push(record(1, b"b"));
        queue.wake();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![record(1, b"a"), record(1, b"b")]);
        assert!(queue.is_empty());

        let start = Instant::now();
        assert!(queue.wait_pop_all(Duration::from_millis(30)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
