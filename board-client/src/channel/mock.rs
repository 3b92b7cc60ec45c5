//! Mock push channel for testing.
//!
//! Allows queueing notifications and capturing join/leave calls for
//! verification.

use super::{ChannelError, PushChannel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use board_types::{EventId, RemoteEvent};

/// Mock push channel for testing.
///
/// Notifications are served from a queue; a `next_event()` call on an empty
/// queue reports the connection as closed, which doubles as the transport
/// loss signal in reconnect tests.
#[derive(Debug, Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug, Default)]
struct MockChannelInner {
    connected: bool,
    credential: Option<String>,
    connect_count: usize,
    joined: Vec<EventId>,
    left: Vec<EventId>,
    event_queue: VecDeque<RemoteEvent>,
    fail_next_connect: Option<String>,
    fail_next_join: Option<String>,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notification to be returned by the next `next_event()` call.
    pub fn queue_event(&self, event: RemoteEvent) {
        let mut inner = self.inner.lock().unwrap();
        inner.event_queue.push_back(event);
    }

    /// The credential presented to the last `connect()` call.
    pub fn credential(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.credential.clone()
    }

    /// Number of `connect()` calls so far.
    pub fn connect_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_count
    }

    /// All groups joined, in order (reconnects re-join).
    pub fn joined_groups(&self) -> Vec<EventId> {
        let inner = self.inner.lock().unwrap();
        inner.joined.clone()
    }

    /// All groups left, in order.
    pub fn left_groups(&self) -> Vec<EventId> {
        let inner = self.inner.lock().unwrap();
        inner.left.clone()
    }

    /// Cause the next `connect()` to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next `join()` to fail with the given error.
    pub fn fail_next_join(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_join = Some(error.to_string());
    }
}

impl Clone for MockChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PushChannel for MockChannel {
    async fn connect(&self, credential: &str) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_count += 1;

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(ChannelError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.credential = Some(credential.to_string());
        Ok(())
    }

    async fn join(&self, event_id: EventId) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(ChannelError::NotConnected);
        }
        if let Some(error) = inner.fail_next_join.take() {
            return Err(ChannelError::JoinFailed(error));
        }

        inner.joined.push(event_id);
        Ok(())
    }

    async fn leave(&self, event_id: EventId) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(ChannelError::NotConnected);
        }

        inner.left.push(event_id);
        Ok(())
    }

    async fn next_event(&self) -> Result<RemoteEvent, ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(ChannelError::NotConnected);
        }

        inner.event_queue.pop_front().ok_or(ChannelError::Closed)
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        Ok(())
    }
}
