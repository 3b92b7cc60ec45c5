//! Remote event subscriber.
//!
//! Owns the push-channel lifecycle for one board session: connect, join the
//! board group, deliver notifications, reconnect with backoff, teardown. The
//! lifecycle decisions live in board-core's pure [`ConnectionState`]; this
//! module executes the actions it produces against a [`PushChannel`].
//!
//! One subscriber is constructed per board session and disposed on exit -
//! there is no process-wide channel singleton, so handlers can never leak
//! across boards.

use std::collections::HashMap;
use std::sync::Mutex as SyncMutex;
use std::time::Duration;

use tokio::sync::Mutex;

use board_core::{Action, ConnectionState, Event, StatusChange};
use board_types::{EventId, RemoteEvent, RemoteEventKind};

use crate::channel::{ChannelError, PushChannel};

type EventHandler = Box<dyn Fn(&RemoteEvent) + Send + Sync>;
type StatusHandler = Box<dyn Fn(&StatusChange) + Send + Sync>;

/// The result of one pump step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// A notification arrived and was dispatched to its handler.
    Delivered(RemoteEventKind),
    /// The transport was re-established and the board group re-joined.
    Reconnected,
    /// The transport is down; pump again after this delay.
    Backoff(Duration),
    /// The subscriber is torn down; stop pumping.
    Stopped,
}

/// Manages the push-channel connection for one board session.
pub struct EventSubscriber<C: PushChannel> {
    channel: C,
    event_id: EventId,
    state: Mutex<ConnectionState>,
    handlers: SyncMutex<HashMap<RemoteEventKind, EventHandler>>,
    status_handler: SyncMutex<Option<StatusHandler>>,
    credential: SyncMutex<Option<String>>,
    next_backoff: SyncMutex<Option<Duration>>,
}

impl<C: PushChannel> EventSubscriber<C> {
    /// Create a subscriber for one board session.
    pub fn new(channel: C, event_id: EventId) -> Self {
        Self {
            channel,
            event_id,
            state: Mutex::new(ConnectionState::new()),
            handlers: SyncMutex::new(HashMap::new()),
            status_handler: SyncMutex::new(None),
            credential: SyncMutex::new(None),
            next_backoff: SyncMutex::new(None),
        }
    }

    /// Register the handler for one notification kind, replacing any
    /// previous handler for that kind.
    pub fn subscribe<F>(&self, kind: RemoteEventKind, handler: F)
    where
        F: Fn(&RemoteEvent) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(kind, Box::new(handler));
    }

    /// Remove the handler for one notification kind.
    pub fn unsubscribe(&self, kind: RemoteEventKind) {
        self.handlers.lock().unwrap().remove(&kind);
    }

    /// Register the status-change observer (e.g. an offline indicator).
    pub fn on_status<F>(&self, handler: F)
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        *self.status_handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// The current connection state.
    pub async fn status(&self) -> ConnectionState {
        self.state.lock().await.clone()
    }

    /// Open the connection and join the board group.
    pub async fn connect(&self, credential: &str) -> Result<(), ChannelError> {
        if self.state.lock().await.is_connected() {
            return Ok(());
        }
        *self.credential.lock().unwrap() = Some(credential.to_string());

        let actions = self.apply(Event::ConnectRequested).await;
        let _ = self.run_actions(actions).await;

        match self.channel.connect(credential).await {
            Ok(()) => self.finish_connect().await,
            Err(e) => {
                tracing::warn!("push channel connect failed: {e}");
                let actions = self
                    .apply(Event::ConnectFailed {
                        error: e.to_string(),
                    })
                    .await;
                let _ = self.run_actions(actions).await;
                Err(e)
            }
        }
    }

    /// Run one step of the notification loop.
    ///
    /// Call after `connect()` resolves. Delivers the next notification,
    /// or performs one reconnection step when the transport is down.
    pub async fn pump(&self) -> PumpOutcome {
        let state = self.state.lock().await.clone();
        match state {
            ConnectionState::Disconnected | ConnectionState::Connecting => PumpOutcome::Stopped,

            ConnectionState::Connected => match self.channel.next_event().await {
                Ok(event) => {
                    self.dispatch(&event);
                    PumpOutcome::Delivered(event.kind)
                }
                Err(e) => {
                    // Teardown closes the channel; a loss observed after
                    // teardown is not a reconnect trigger.
                    if matches!(*self.state.lock().await, ConnectionState::Disconnected) {
                        return PumpOutcome::Stopped;
                    }
                    tracing::warn!("push channel lost: {e}");
                    let actions = self
                        .apply(Event::ConnectionLost {
                            reason: e.to_string(),
                        })
                        .await;
                    let _ = self.run_actions(actions).await;
                    self.take_backoff()
                }
            },

            ConnectionState::Reconnecting { attempt } => {
                tracing::debug!("reconnect attempt {attempt}");
                let actions = self.apply(Event::ReconnectTimer).await;
                let _ = self.run_actions(actions).await;

                let credential = self.credential.lock().unwrap().clone().unwrap_or_default();
                match self.channel.connect(&credential).await {
                    Ok(()) => match self.finish_connect().await {
                        Ok(()) => PumpOutcome::Reconnected,
                        Err(_) => self.take_backoff(),
                    },
                    Err(e) => {
                        let actions = self
                            .apply(Event::ConnectFailed {
                                error: e.to_string(),
                            })
                            .await;
                        let _ = self.run_actions(actions).await;
                        self.take_backoff()
                    }
                }
            }
        }
    }

    /// Tear the session down: drop all handlers, leave the board group and
    /// close the connection. Completes before returning; no handler fires
    /// afterwards.
    pub async fn teardown(&self) {
        self.handlers.lock().unwrap().clear();
        let actions = self.apply(Event::DisconnectRequested).await;
        let _ = self.run_actions(actions).await;
        *self.next_backoff.lock().unwrap() = None;
    }

    /// Get a reference to the underlying channel (for testing).
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Feed one event through the state machine, returning the actions to
    /// execute. The lock is released before any I/O runs.
    async fn apply(&self, event: Event) -> Vec<Action> {
        let mut state = self.state.lock().await;
        let (next, actions) = state.clone().on_event(event);
        *state = next;
        actions
    }

    async fn run_actions(&self, actions: Vec<Action>) -> Result<(), ChannelError> {
        for action in actions {
            match action {
                // Connection attempts are driven by connect()/pump() so the
                // error can be fed back into the state machine.
                Action::Connect => {}
                Action::JoinGroup => self.channel.join(self.event_id).await?,
                Action::LeaveGroup => {
                    if let Err(e) = self.channel.leave(self.event_id).await {
                        tracing::debug!("leave during teardown failed: {e}");
                    }
                }
                Action::Disconnect => {
                    if let Err(e) = self.channel.close().await {
                        tracing::debug!("close failed: {e}");
                    }
                }
                Action::StartReconnectTimer { delay } => {
                    *self.next_backoff.lock().unwrap() = Some(delay);
                }
                Action::CancelReconnect => {
                    *self.next_backoff.lock().unwrap() = None;
                }
                Action::EmitStatus(status) => {
                    let guard = self.status_handler.lock().unwrap();
                    if let Some(handler) = guard.as_ref() {
                        handler(&status);
                    }
                }
            }
        }
        Ok(())
    }

    /// Transition into Connected and execute the join. A failed join is a
    /// transport loss: membership is mandatory for this session.
    async fn finish_connect(&self) -> Result<(), ChannelError> {
        let actions = self.apply(Event::ConnectSucceeded).await;
        match self.run_actions(actions).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("board group join failed: {e}");
                let actions = self
                    .apply(Event::ConnectionLost {
                        reason: format!("join failed: {e}"),
                    })
                    .await;
                let _ = self.run_actions(actions).await;
                Err(e)
            }
        }
    }

    fn dispatch(&self, event: &RemoteEvent) {
        let handlers = self.handlers.lock().unwrap();
        match handlers.get(&event.kind) {
            Some(handler) => handler(event),
            None => tracing::trace!("no handler subscribed for {}", event.kind),
        }
    }

    fn take_backoff(&self) -> PumpOutcome {
        let delay = self
            .next_backoff
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Duration::from_secs(1));
        PumpOutcome::Backoff(delay)
    }
}
