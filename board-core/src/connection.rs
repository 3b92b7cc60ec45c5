//! Push-channel connection state machine.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the push-channel lifecycle of one board session. The state machine takes
//! events as input and produces a new state plus a list of actions to
//! execute.
//!
//! The actual I/O (connecting, joining the board group) is performed by
//! board-client, not by this module. This enables instant unit testing
//! without network mocks.
//!
//! Group membership is not assumed to survive a reconnect: every transition
//! into `Connected` carries [`Action::JoinGroup`].

use std::time::Duration;

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the push channel.
    Disconnected,
    /// Initial connection attempt in progress.
    Connecting,
    /// Connected and joined to the board group.
    Connected,
    /// Transport lost, waiting to reconnect.
    Reconnecting {
        /// Number of reconnection attempts so far.
        attempt: u32,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (board-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested) => {
                (Self::Connecting, vec![Action::Connect])
            }

            // From Connecting
            (Self::Connecting, Event::ConnectSucceeded) => (
                Self::Connected,
                vec![
                    Action::JoinGroup,
                    Action::EmitStatus(StatusChange::Connected),
                ],
            ),
            (Self::Connecting, Event::ConnectFailed { error }) => (
                Self::Reconnecting { attempt: 1 },
                vec![
                    Action::EmitStatus(StatusChange::ConnectionFailed { error }),
                    Action::StartReconnectTimer {
                        delay: calculate_backoff(1),
                    },
                ],
            ),

            // From Connected
            (Self::Connected, Event::ConnectionLost { reason }) => (
                Self::Reconnecting { attempt: 1 },
                vec![
                    Action::EmitStatus(StatusChange::Offline { reason }),
                    Action::StartReconnectTimer {
                        delay: calculate_backoff(1),
                    },
                ],
            ),
            (Self::Connected, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::LeaveGroup,
                    Action::Disconnect,
                    Action::EmitStatus(StatusChange::Disconnected),
                ],
            ),

            // From Reconnecting
            (Self::Reconnecting { attempt }, Event::ReconnectTimer) => {
                (Self::Reconnecting { attempt }, vec![Action::Connect])
            }
            // Group membership did not survive the transport loss; rejoin.
            (Self::Reconnecting { .. }, Event::ConnectSucceeded) => (
                Self::Connected,
                vec![
                    Action::JoinGroup,
                    Action::EmitStatus(StatusChange::Connected),
                ],
            ),
            (Self::Reconnecting { attempt }, Event::ConnectFailed { error }) => {
                let next_attempt = attempt.saturating_add(1);
                (
                    Self::Reconnecting {
                        attempt: next_attempt,
                    },
                    vec![
                        Action::EmitStatus(StatusChange::ReconnectFailed {
                            attempt: next_attempt,
                            error,
                        }),
                        Action::StartReconnectTimer {
                            delay: calculate_backoff(next_attempt),
                        },
                    ],
                )
            }
            (Self::Reconnecting { .. }, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::CancelReconnect,
                    Action::EmitStatus(StatusChange::Disconnected),
                ],
            ),

            // Teardown during the initial attempt
            (Self::Connecting, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::Disconnect,
                    Action::EmitStatus(StatusChange::Disconnected),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if currently trying to connect.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting { .. })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The board session requested connection.
    ConnectRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The established connection was lost.
    ConnectionLost {
        /// Reason for the loss.
        reason: String,
    },
    /// The board session requested teardown.
    DisconnectRequested,
    /// Reconnect timer fired.
    ReconnectTimer,
}

/// Actions to be executed by board-client.
///
/// These are instructions, not side effects. The board-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Initiate the transport connection.
    Connect,
    /// Close the transport.
    Disconnect,
    /// Join the board's notification group. Issued on every entry into
    /// Connected, including after a reconnect.
    JoinGroup,
    /// Leave the board's notification group before disconnecting.
    LeaveGroup,
    /// Start a timer for reconnection.
    StartReconnectTimer {
        /// Delay before attempting reconnection.
        delay: Duration,
    },
    /// Cancel any pending reconnect timer.
    CancelReconnect,
    /// Surface a status change to the application.
    EmitStatus(StatusChange),
}

/// Status changes surfaced to the application layer (e.g. for an offline
/// indicator). Connection failures are recovered internally and never
/// escalated beyond this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// Connected and joined to the board group.
    Connected,
    /// Initial connection failed.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The connection dropped; reconnection is underway.
    Offline {
        /// Reason for the drop.
        reason: String,
    },
    /// A reconnection attempt failed.
    ReconnectFailed {
        /// Which reconnection attempt this was.
        attempt: u32,
        /// Error message describing the failure.
        error: String,
    },
    /// Torn down by request.
    Disconnected,
}

/// Calculate reconnection backoff with jitter.
///
/// Uses exponential backoff with random jitter to prevent thundering herd
/// when many clients reconnect simultaneously after a server restart.
///
/// Formula: min(30s, 2^attempt seconds) + random(0..5000ms)
fn calculate_backoff(attempt: u32) -> Duration {
    // Base: 2^attempt seconds, capped at 30 seconds
    let base_secs = 2u64.pow(attempt.min(5)).min(30);
    let base = Duration::from_secs(base_secs);

    // Jitter: 0-5000ms random
    let jitter_ms = random_jitter_ms();
    let jitter = Duration::from_millis(jitter_ms);

    base + jitter
}

/// Generate random jitter between 0 and 5000 milliseconds.
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    let random = u64::from_le_bytes(bytes);
    random % 5001 // 0..5000 inclusive
}
