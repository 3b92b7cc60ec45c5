//! Push-channel abstraction.
//!
//! This module provides a pluggable wrapper around the persistent,
//! server-initiated notification transport used for real-time collaboration
//! signals.
//!
//! # Design
//!
//! The channel is connection-oriented and credential-scoped:
//! - `connect()` establishes the connection with an access credential
//! - `join()` / `leave()` manage membership in an event's notification group
//! - `next_event()` delivers the next board-change notification
//! - `close()` terminates the connection
//!
//! The engine relies on no payload contract beyond "something about this
//! board changed"; the four notification kinds are defined in board-types.

mod mock;

pub use mock::MockChannel;

use async_trait::async_trait;
use thiserror::Error;

use board_types::{EventId, RemoteEvent};

/// Push-channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    Closed,

    /// Group join failed.
    #[error("join failed: {0}")]
    JoinFailed(String),

    /// Group leave failed.
    #[error("leave failed: {0}")]
    LeaveFailed(String),
}

/// The persistent notification transport the subscriber drives.
///
/// Implementations handle the underlying mechanism (a realtime hub client,
/// mock for testing). Group membership is not assumed to survive a
/// reconnect; the subscriber re-joins every time a connection is
/// (re-)established.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Open the connection, authenticating with the given credential.
    async fn connect(&self, credential: &str) -> Result<(), ChannelError>;

    /// Join the notification group for an event's board.
    async fn join(&self, event_id: EventId) -> Result<(), ChannelError>;

    /// Leave the notification group for an event's board.
    async fn leave(&self, event_id: EventId) -> Result<(), ChannelError>;

    /// Wait for the next board-change notification.
    ///
    /// An error signals transport loss; the caller decides whether to
    /// reconnect.
    async fn next_event(&self) -> Result<RemoteEvent, ChannelError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&self) -> Result<(), ChannelError>;
}
