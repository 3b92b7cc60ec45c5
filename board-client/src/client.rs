//! BoardClient - the main interface for boardsync.
//!
//! This module provides [`BoardClient`], the per-board-session engine that
//! keeps one user's view of a shared board consistent: optimistic local
//! edits render before any round-trip completes, remote edits arrive over
//! the push channel, and failures roll back silently.
//!
//! # Architecture
//!
//! ```text
//! UI → BoardClient → BoardApi (HTTP) / PushChannel (notifications)
//!          ↓
//!     board-core (pure store, allocator, state machines)
//! ```
//!
//! The board store is the single writable owner of the rendered board. It is
//! mutated on exactly two paths: the optimistic mutation path (with rollback
//! on rejection) and the reconciliation path (silent full-board refetch on
//! any remote notification). All store operations are serialized behind one
//! async mutex, so no torn state is ever observable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as SyncMutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use board_core::{
    plan_insert, plan_move, BoardStore, ColumnSnapshot, ConnectionState, InFlightTracker,
    MutationKind, RankPlan, RefetchDecision, RefetchFollowUp, RefetchGate, StatusChange,
};
use board_types::{
    Board, Card, CardId, ColumnId, CreateCardRequest, EventId, MoveCardRequest, RemoteEventKind,
    UpdateCardRequest,
};

use crate::api::{ApiError, BoardApi};
use crate::channel::{ChannelError, PushChannel};
use crate::subscriber::{EventSubscriber, PumpOutcome};

/// Configuration for one board session.
#[derive(Debug, Clone)]
pub struct BoardClientConfig {
    /// The event whose board this session renders.
    pub event_id: EventId,
    /// Access credential for the push channel. When empty, the channel is
    /// never started and the board is served by explicit loads only.
    pub credential: String,
}

impl BoardClientConfig {
    /// Create a configuration for an event's board.
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            credential: String::new(),
        }
    }

    /// Set the push-channel credential.
    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = credential.to_string();
        self
    }
}

/// The outcome of one mutation entry point.
///
/// Mutations never panic and never lose a failure silently: a rejection is
/// rolled back locally and surfaced here exactly once.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The server accepted. No corrective action is taken; the authoritative
    /// state arrives via the push-triggered refetch.
    Committed,
    /// Nothing to do: the target no longer exists locally, or the move was
    /// to the position the card already occupies. No request was issued.
    Noop,
    /// The server rejected the mutation; the optimistic patch was rolled
    /// back and this is the one failure signal for the UI.
    RolledBack {
        /// Why the server rejected the mutation.
        error: ApiError,
    },
}

impl MutationOutcome {
    /// Whether the mutation committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Whether the mutation was a no-op.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }

    /// Whether the mutation was rejected and rolled back.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. })
    }
}

type BoardListener = Box<dyn Fn(&Board) + Send + Sync>;

/// The per-session board synchronization engine.
pub struct BoardClient<A: BoardApi, C: PushChannel> {
    config: BoardClientConfig,
    api: A,
    subscriber: EventSubscriber<C>,
    store: Mutex<BoardStore>,
    tracker: Mutex<InFlightTracker>,
    gate: Mutex<RefetchGate>,
    /// Bumped on teardown; async continuations that captured an older value
    /// must not touch the store.
    generation: AtomicU64,
    invite_code: SyncMutex<Option<String>>,
    listeners: SyncMutex<Vec<BoardListener>>,
    notifications: Mutex<UnboundedReceiver<RemoteEventKind>>,
    notify_tx: UnboundedSender<RemoteEventKind>,
}

impl<A: BoardApi, C: PushChannel> BoardClient<A, C> {
    /// Create a new board session over the given API and push channel.
    pub fn new(config: BoardClientConfig, api: A, channel: C) -> Self {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let subscriber = EventSubscriber::new(channel, config.event_id);
        Self {
            config,
            api,
            subscriber,
            store: Mutex::new(BoardStore::new()),
            tracker: Mutex::new(InFlightTracker::new()),
            gate: Mutex::new(RefetchGate::new()),
            generation: AtomicU64::new(0),
            invite_code: SyncMutex::new(None),
            listeners: SyncMutex::new(Vec::new()),
            notifications: Mutex::new(notify_rx),
            notify_tx,
        }
    }

    // ===========================================
    // Loading & reconciliation
    // ===========================================

    /// Initial (non-silent) load: fetch the board, replace the store, and
    /// look up the event's invite code.
    pub async fn load(&self) -> Result<(), ApiError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let board = self.api.fetch_board(self.config.event_id).await?;
        if self.is_stale(generation) {
            return Ok(());
        }
        self.store.lock().await.replace(board);
        self.notify_board_changed().await;

        match self.api.fetch_event(self.config.event_id).await {
            Ok(info) => *self.invite_code.lock().unwrap() = info.invite_code,
            Err(e) => tracing::debug!("invite code lookup failed: {e}"),
        }
        Ok(())
    }

    /// Subscribe the four board notifications and open the push channel.
    ///
    /// Skipped silently when no credential is configured (no identity token
    /// means no push channel, matching the session collaborator's contract).
    pub async fn connect(&self) -> Result<(), ChannelError> {
        if self.config.credential.is_empty() {
            tracing::debug!("no credential; push channel not started");
            return Ok(());
        }
        for kind in RemoteEventKind::ALL {
            let tx = self.notify_tx.clone();
            self.subscriber.subscribe(kind, move |event| {
                let _ = tx.send(event.kind);
            });
        }
        self.subscriber.connect(&self.config.credential).await
    }

    /// Run one step of the notification loop: deliver the next push event
    /// and reconcile everything it queued.
    pub async fn pump_once(&self) -> PumpOutcome {
        let outcome = self.subscriber.pump().await;
        self.drain_notifications().await;
        outcome
    }

    /// Process notifications until teardown, sleeping through reconnect
    /// backoff.
    pub async fn run(&self) {
        loop {
            match self.pump_once().await {
                PumpOutcome::Backoff(delay) => tokio::time::sleep(delay).await,
                PumpOutcome::Stopped => break,
                PumpOutcome::Delivered(_) | PumpOutcome::Reconnected => {}
            }
        }
    }

    async fn drain_notifications(&self) {
        loop {
            let kind = { self.notifications.lock().await.try_recv().ok() };
            match kind {
                Some(kind) => self.reconcile(kind).await,
                None => break,
            }
        }
    }

    /// Answer a remote notification with a silent full-board refetch,
    /// coalescing with any refetch already in flight.
    async fn reconcile(&self, kind: RemoteEventKind) {
        tracing::debug!("remote {kind} notification; scheduling silent refetch");
        if self.gate.lock().await.request() == RefetchDecision::Coalesced {
            return;
        }
        loop {
            self.refetch_once().await;
            match self.gate.lock().await.complete() {
                RefetchFollowUp::Start => continue,
                RefetchFollowUp::Done => break,
            }
        }
    }

    async fn refetch_once(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.fetch_board(self.config.event_id).await {
            Ok(board) => {
                if self.is_stale(generation) {
                    tracing::debug!("refetch resolved after teardown; discarded");
                    return;
                }
                self.store.lock().await.replace(board);
                self.notify_board_changed().await;
            }
            // The store keeps its last known-good state; the next remote
            // event retries.
            Err(e) => tracing::warn!("silent refetch failed: {e}"),
        }
    }

    // ===========================================
    // Mutations
    // ===========================================

    /// Create a card at the end of a column.
    pub async fn create_card(
        &self,
        column_id: ColumnId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> MutationOutcome {
        let title = title.into();
        let generation = self.generation.load(Ordering::SeqCst);

        let provisional_id;
        let ticket;
        let request;
        {
            let mut store = self.store.lock().await;
            let Some(cards) = store.column_cards(&column_id).map(|c| c.to_vec()) else {
                tracing::debug!("create target column vanished; no-op");
                return MutationOutcome::Noop;
            };

            let position = cards.len();
            let plan = plan_insert(&ranks(&cards), position);
            let card = Card {
                id: CardId::new(),
                title: title.clone(),
                description: description.clone(),
                column_id,
                order_index: 0.0, // assigned by the plan below
                assigned_user_id: None,
            };
            provisional_id = card.id;

            let snapshot = ColumnSnapshot::capture([(column_id, cards.clone())]);
            let next = place_card(cards, card, position, plan);
            {
                let mut tracker = self.tracker.lock().await;
                ticket = tracker.begin(provisional_id, MutationKind::Create, snapshot);
            }
            store.patch(&column_id, next);
            request = CreateCardRequest {
                column_id,
                title,
                description,
            };
        }
        self.notify_board_changed().await;

        match self.api.create_card(&request).await {
            Ok(_created) => self.complete_commit(provisional_id, ticket).await,
            Err(error) => {
                self.complete_rollback(provisional_id, ticket, generation, error)
                    .await
            }
        }
    }

    /// Move a card to a 0-based position within a column.
    ///
    /// Moving a card to the position it already occupies issues no request
    /// and changes nothing.
    pub async fn move_card(
        &self,
        card_id: CardId,
        target_column_id: ColumnId,
        destination_index: usize,
    ) -> MutationOutcome {
        let generation = self.generation.load(Ordering::SeqCst);

        let ticket;
        let request;
        {
            let mut store = self.store.lock().await;
            let Some(location) = store.find_card(&card_id) else {
                tracing::debug!("move target card vanished; no-op");
                return MutationOutcome::Noop;
            };
            let source_column_id = location.column_id;
            let same_column = source_column_id == target_column_id;
            let Some(target_cards) = store.column_cards(&target_column_id).map(|c| c.to_vec())
            else {
                tracing::debug!("move destination column vanished; no-op");
                return MutationOutcome::Noop;
            };
            let source_cards = store
                .column_cards(&source_column_id)
                .map(|c| c.to_vec())
                .unwrap_or_default();

            // Destination positions are relative to the sequence with the
            // moved card removed.
            let slots = if same_column {
                target_cards.len().saturating_sub(1)
            } else {
                target_cards.len()
            };
            let destination_index = destination_index.min(slots);
            if same_column && destination_index == location.position {
                return MutationOutcome::Noop;
            }

            let plan = if same_column {
                plan_move(&ranks(&target_cards), location.position, destination_index)
            } else {
                plan_insert(&ranks(&target_cards), destination_index)
            };

            let snapshot = ColumnSnapshot::capture([
                (source_column_id, source_cards.clone()),
                (target_column_id, target_cards.clone()),
            ]);

            let mut moved = source_cards[location.position].clone();
            moved.column_id = target_column_id;

            let mut source_remaining = source_cards;
            source_remaining.remove(location.position);

            let destination_base = if same_column {
                source_remaining.clone()
            } else {
                target_cards
            };
            let destination_next = place_card(destination_base, moved, destination_index, plan);

            {
                let mut tracker = self.tracker.lock().await;
                ticket = tracker.begin(card_id, MutationKind::Move, snapshot);
            }
            if !same_column {
                store.patch(&source_column_id, source_remaining);
            }
            store.patch(&target_column_id, destination_next);

            request = MoveCardRequest {
                card_id,
                target_column_id,
                new_order_index: destination_index,
            };
        }
        self.notify_board_changed().await;

        match self.api.move_card(&request).await {
            Ok(()) => self.complete_commit(card_id, ticket).await,
            Err(error) => self.complete_rollback(card_id, ticket, generation, error).await,
        }
    }

    /// Update a card's title and description in place. Rank and column
    /// membership are untouched.
    pub async fn update_card(
        &self,
        card_id: CardId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> MutationOutcome {
        let title = title.into();
        let generation = self.generation.load(Ordering::SeqCst);

        let ticket;
        let column_id;
        {
            let mut store = self.store.lock().await;
            let Some(location) = store.find_card(&card_id) else {
                tracing::debug!("update target card vanished; no-op");
                return MutationOutcome::Noop;
            };
            column_id = location.column_id;
            let cards = store
                .column_cards(&column_id)
                .map(|c| c.to_vec())
                .unwrap_or_default();

            let snapshot = ColumnSnapshot::capture([(column_id, cards.clone())]);
            let mut next = cards;
            next[location.position].title = title.clone();
            next[location.position].description = description.clone();

            {
                let mut tracker = self.tracker.lock().await;
                ticket = tracker.begin(card_id, MutationKind::Update, snapshot);
            }
            store.patch(&column_id, next);
        }
        self.notify_board_changed().await;

        let request = UpdateCardRequest { title, description };
        match self.api.update_card(card_id, &request).await {
            Ok(()) => self.complete_commit(card_id, ticket).await,
            Err(error) => self.complete_rollback(card_id, ticket, generation, error).await,
        }
    }

    /// Delete a card immediately (any confirmation dialog belongs to the UI
    /// collaborator).
    pub async fn delete_card(&self, card_id: CardId) -> MutationOutcome {
        let generation = self.generation.load(Ordering::SeqCst);

        let ticket;
        {
            let mut store = self.store.lock().await;
            let Some(location) = store.find_card(&card_id) else {
                tracing::debug!("delete target card vanished; no-op");
                return MutationOutcome::Noop;
            };
            let column_id = location.column_id;
            let cards = store
                .column_cards(&column_id)
                .map(|c| c.to_vec())
                .unwrap_or_default();

            let snapshot = ColumnSnapshot::capture([(column_id, cards.clone())]);
            let mut next = cards;
            next.remove(location.position);

            {
                let mut tracker = self.tracker.lock().await;
                ticket = tracker.begin(card_id, MutationKind::Delete, snapshot);
            }
            store.patch(&column_id, next);
        }
        self.notify_board_changed().await;

        match self.api.delete_card(card_id).await {
            Ok(()) => self.complete_commit(card_id, ticket).await,
            Err(error) => self.complete_rollback(card_id, ticket, generation, error).await,
        }
    }

    // ===========================================
    // Produced interface
    // ===========================================

    /// A snapshot of the current normalized board.
    pub async fn snapshot(&self) -> Option<Board> {
        self.store.lock().await.snapshot()
    }

    /// Register a board-change observer. Fired after every visible store
    /// update (load, optimistic patch, rollback, refetch).
    pub fn on_board_changed<F>(&self, listener: F)
    where
        F: Fn(&Board) + Send + Sync + 'static,
    {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    /// Register a connection-status observer (offline indicator).
    pub fn on_status_changed<F>(&self, listener: F)
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        self.subscriber.on_status(listener);
    }

    /// The current push-channel state.
    pub async fn connection_status(&self) -> ConnectionState {
        self.subscriber.status().await
    }

    /// The invite code of the board's event, once loaded.
    pub fn invite_code(&self) -> Option<String> {
        self.invite_code.lock().unwrap().clone()
    }

    /// Tear the session down: close the push channel, drop every handler,
    /// and invalidate all outstanding async continuations. Any request that
    /// resolves late is discarded before it can touch the store.
    pub async fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.subscriber.teardown().await;
        self.gate.lock().await.reset();
        self.tracker.lock().await.clear();
        tracing::debug!("board session torn down");
    }

    /// Get a reference to the underlying API (for testing).
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Get a reference to the subscriber (for testing).
    pub fn subscriber(&self) -> &EventSubscriber<C> {
        &self.subscriber
    }

    // ===========================================
    // Internals
    // ===========================================

    async fn complete_commit(&self, card_id: CardId, ticket: u64) -> MutationOutcome {
        let mut tracker = self.tracker.lock().await;
        if tracker.commit(&card_id, ticket).is_none() {
            tracing::debug!("mutation superseded before commit");
        }
        MutationOutcome::Committed
    }

    async fn complete_rollback(
        &self,
        card_id: CardId,
        ticket: u64,
        generation: u64,
        error: ApiError,
    ) -> MutationOutcome {
        tracing::warn!("mutation rejected: {error}; rolling back");
        let snapshot = {
            let mut tracker = self.tracker.lock().await;
            tracker
                .roll_back(&card_id, ticket)
                .and_then(|record| record.into_rollback_snapshot())
        };
        // A superseded or torn-down mutation no longer owns the column
        // state; the failure is still surfaced exactly once.
        if let Some(snapshot) = snapshot {
            if self.is_stale(generation) {
                tracing::debug!("rollback resolved after teardown; discarded");
            } else {
                {
                    let mut store = self.store.lock().await;
                    for (column_id, cards) in snapshot.columns() {
                        store.patch(column_id, cards.clone());
                    }
                }
                self.notify_board_changed().await;
            }
        }
        MutationOutcome::RolledBack { error }
    }

    async fn notify_board_changed(&self) {
        let Some(board) = self.store.lock().await.snapshot() else {
            return;
        };
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(&board);
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

fn ranks(cards: &[Card]) -> Vec<f64> {
    cards.iter().map(|c| c.order_index).collect()
}

/// Insert `card` at `position` in `cards`, applying the rank plan.
fn place_card(mut cards: Vec<Card>, mut card: Card, position: usize, plan: RankPlan) -> Vec<Card> {
    let position = position.min(cards.len());
    match plan {
        RankPlan::Rank(rank) => {
            card.order_index = rank;
            cards.insert(position, card);
        }
        RankPlan::Rebalance(new_ranks) => {
            cards.insert(position, card);
            for (card, rank) in cards.iter_mut().zip(new_ranks) {
                card.order_index = rank;
            }
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiCall, MockApi};
    use crate::channel::MockChannel;
    use board_types::{BoardId, Column, EventInfo, RemoteEvent};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        client: BoardClient<MockApi, MockChannel>,
        api: MockApi,
        channel: MockChannel,
        event_id: EventId,
        column_a: ColumnId,
        column_b: ColumnId,
        card_x: CardId,
        card_y: CardId,
    }

    fn card(column_id: ColumnId, id: CardId, title: &str, rank: f64) -> Card {
        Card {
            id,
            title: title.into(),
            description: None,
            column_id,
            order_index: rank,
            assigned_user_id: None,
        }
    }

    /// Column A = [x, y], Column B = [] - the two-column scenario board.
    fn two_column_board(
        event_id: EventId,
        column_a: ColumnId,
        column_b: ColumnId,
        card_x: CardId,
        card_y: CardId,
    ) -> Board {
        Board {
            id: BoardId::new(),
            title: "Board".into(),
            event_id,
            columns: vec![
                Column {
                    id: column_a,
                    title: "To do".into(),
                    order_index: 0,
                    cards: vec![
                        card(column_a, card_x, "x", 0.0),
                        card(column_a, card_y, "y", 1.0),
                    ],
                },
                Column {
                    id: column_b,
                    title: "Doing".into(),
                    order_index: 1,
                    cards: vec![],
                },
            ],
        }
    }

    async fn loaded_fixture() -> Fixture {
        let api = MockApi::new();
        let channel = MockChannel::new();
        let event_id = EventId::new();
        let column_a = ColumnId::new();
        let column_b = ColumnId::new();
        let card_x = CardId::new();
        let card_y = CardId::new();

        api.queue_board(two_column_board(event_id, column_a, column_b, card_x, card_y));
        api.set_event_info(EventInfo {
            id: event_id,
            invite_code: Some("JOIN-42".into()),
        });

        let config = BoardClientConfig::new(event_id).with_credential("token");
        let client = BoardClient::new(config, api.clone(), channel.clone());
        client.load().await.unwrap();

        Fixture {
            client,
            api,
            channel,
            event_id,
            column_a,
            column_b,
            card_x,
            card_y,
        }
    }

    fn column_titles(board: &Board, column_id: ColumnId) -> Vec<String> {
        board
            .columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.cards.iter().map(|card| card.title.clone()).collect())
            .unwrap_or_default()
    }

    fn column_ranks(board: &Board, column_id: ColumnId) -> Vec<f64> {
        board
            .columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.cards.iter().map(|card| card.order_index).collect())
            .unwrap_or_default()
    }

    fn contains_card(board: &Board, card_id: CardId) -> bool {
        board
            .columns
            .iter()
            .any(|c| c.cards.iter().any(|card| card.id == card_id))
    }

    fn assert_strictly_increasing(ranks: &[f64]) {
        for pair in ranks.windows(2) {
            assert!(pair[0] < pair[1], "ranks not strictly increasing: {ranks:?}");
        }
    }

    // ===========================================
    // Load Tests
    // ===========================================

    #[tokio::test]
    async fn load_replaces_store_and_fetches_invite() {
        let f = loaded_fixture().await;

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["x", "y"]);
        assert_eq!(f.client.invite_code(), Some("JOIN-42".into()));
    }

    #[tokio::test]
    async fn load_failure_is_surfaced() {
        let api = MockApi::new();
        let client = BoardClient::new(
            BoardClientConfig::new(EventId::new()),
            api,
            MockChannel::new(),
        );

        let result = client.load().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
        assert!(client.snapshot().await.is_none());
    }

    // ===========================================
    // Create Tests
    // ===========================================

    #[tokio::test]
    async fn create_card_appends_provisionally() {
        let f = loaded_fixture().await;

        let outcome = f
            .client
            .create_card(f.column_a, "Order catering", Some("by Friday".into()))
            .await;
        assert!(outcome.is_committed());

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["x", "y", "Order catering"]);
        assert_strictly_increasing(&column_ranks(&board, f.column_a));
        assert!(f
            .api
            .calls()
            .iter()
            .any(|c| matches!(c, ApiCall::CreateCard(req) if req.title == "Order catering")));
    }

    #[tokio::test]
    async fn create_failure_removes_the_provisional_card() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();
        f.api.fail_next_create(ApiError::Rejected {
            status: 500,
            message: "nope".into(),
        });

        let outcome = f.client.create_card(f.column_a, "doomed", None).await;
        assert!(outcome.is_rolled_back());

        let after = f.client.snapshot().await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn create_into_vanished_column_is_noop() {
        let f = loaded_fixture().await;

        let outcome = f.client.create_card(ColumnId::new(), "lost", None).await;
        assert!(outcome.is_noop());
        assert_eq!(f.api.mutation_count(), 0);
    }

    #[tokio::test]
    async fn create_confirmed_by_refetch_has_exactly_one_card() {
        let f = loaded_fixture().await;
        f.client.connect().await.unwrap();

        let outcome = f.client.create_card(f.column_a, "Order catering", None).await;
        assert!(outcome.is_committed());

        // The server's board carries its own id for the new card.
        let mut confirmed =
            two_column_board(f.event_id, f.column_a, f.column_b, f.card_x, f.card_y);
        confirmed.columns[0]
            .cards
            .push(card(f.column_a, CardId::new(), "Order catering", 2.0));
        f.api.queue_board(confirmed);
        f.channel
            .queue_event(RemoteEvent::new(RemoteEventKind::CardCreated));

        f.client.pump_once().await;

        let board = f.client.snapshot().await.unwrap();
        let count = board.columns[0]
            .cards
            .iter()
            .filter(|c| c.title == "Order catering")
            .count();
        assert_eq!(count, 1);
    }

    // ===========================================
    // Move Tests
    // ===========================================

    #[tokio::test]
    async fn move_between_columns_updates_both() {
        let f = loaded_fixture().await;
        let rank_of_y = column_ranks(&f.client.snapshot().await.unwrap(), f.column_a)[1];

        let outcome = f.client.move_card(f.card_x, f.column_b, 0).await;
        assert!(outcome.is_committed());

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["y"]);
        assert_eq!(column_titles(&board, f.column_b), vec!["x"]);
        // y keeps its rank; only the moved card was touched.
        assert_eq!(column_ranks(&board, f.column_a), vec![rank_of_y]);
        assert!(f.api.calls().iter().any(|c| matches!(
            c,
            ApiCall::MoveCard(req)
                if req.card_id == f.card_x
                    && req.target_column_id == f.column_b
                    && req.new_order_index == 0
        )));
    }

    #[tokio::test]
    async fn move_to_same_position_is_idempotent() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();

        let outcome = f.client.move_card(f.card_x, f.column_a, 0).await;
        assert!(outcome.is_noop());

        // No request, no change.
        assert_eq!(f.api.mutation_count(), 0);
        assert_eq!(f.client.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn move_rollback_restores_both_columns() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();
        f.api.fail_next_move(ApiError::Rejected {
            status: 409,
            message: "conflict".into(),
        });

        let outcome = f.client.move_card(f.card_x, f.column_b, 0).await;
        assert!(outcome.is_rolled_back());

        // Structurally identical: same cards, same ranks, same membership.
        let after = f.client.snapshot().await.unwrap();
        assert_eq!(after, before);
        assert_eq!(column_titles(&after, f.column_a), vec!["x", "y"]);
        assert!(column_titles(&after, f.column_b).is_empty());
    }

    #[tokio::test]
    async fn move_sequence_keeps_ranks_unique_and_ordered() {
        let api = MockApi::new();
        let event_id = EventId::new();
        let column = ColumnId::new();
        let (x, y, z) = (CardId::new(), CardId::new(), CardId::new());
        api.queue_board(Board {
            id: BoardId::new(),
            title: "Board".into(),
            event_id,
            columns: vec![Column {
                id: column,
                title: "To do".into(),
                order_index: 0,
                cards: vec![
                    card(column, x, "x", 0.0),
                    card(column, y, "y", 1.0),
                    card(column, z, "z", 2.0),
                ],
            }],
        });
        let client = BoardClient::new(BoardClientConfig::new(event_id), api, MockChannel::new());
        client.load().await.unwrap();

        let moves: [(CardId, usize, [&str; 3]); 3] = [
            (z, 0, ["z", "x", "y"]),
            (x, 2, ["z", "y", "x"]),
            (y, 0, ["y", "z", "x"]),
        ];
        for (card_id, index, expected) in moves {
            let outcome = client.move_card(card_id, column, index).await;
            assert!(outcome.is_committed());

            let board = client.snapshot().await.unwrap();
            assert_eq!(column_titles(&board, column), expected);
            assert_strictly_increasing(&column_ranks(&board, column));
        }
    }

    #[tokio::test]
    async fn move_of_vanished_card_is_noop() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();

        let outcome = f.client.move_card(CardId::new(), f.column_b, 0).await;
        assert!(outcome.is_noop());
        assert_eq!(f.api.mutation_count(), 0);
        assert_eq!(f.client.snapshot().await.unwrap(), before);
    }

    // ===========================================
    // Update Tests
    // ===========================================

    #[tokio::test]
    async fn update_edits_fields_in_place() {
        let f = loaded_fixture().await;

        let outcome = f
            .client
            .update_card(f.card_y, "y renamed", Some("details".into()))
            .await;
        assert!(outcome.is_committed());

        let board = f.client.snapshot().await.unwrap();
        let column = board.columns.iter().find(|c| c.id == f.column_a).unwrap();
        let updated = &column.cards[1];
        assert_eq!(updated.id, f.card_y);
        assert_eq!(updated.title, "y renamed");
        assert_eq!(updated.description.as_deref(), Some("details"));
        // Rank and membership untouched.
        assert_eq!(updated.order_index, 1.0);
        assert_eq!(updated.column_id, f.column_a);
    }

    #[tokio::test]
    async fn update_rollback_restores_fields() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();
        f.api.fail_next_update(ApiError::Rejected {
            status: 422,
            message: "invalid".into(),
        });

        let outcome = f.client.update_card(f.card_y, "rejected", None).await;
        assert!(outcome.is_rolled_back());
        assert_eq!(f.client.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn update_of_vanished_card_is_noop() {
        let f = loaded_fixture().await;

        let outcome = f.client.update_card(CardId::new(), "ghost", None).await;
        assert!(outcome.is_noop());
        assert_eq!(f.api.mutation_count(), 0);
    }

    // ===========================================
    // Delete Tests
    // ===========================================

    #[tokio::test]
    async fn delete_removes_immediately() {
        let f = loaded_fixture().await;

        let outcome = f.client.delete_card(f.card_x).await;
        assert!(outcome.is_committed());

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["y"]);
    }

    #[tokio::test]
    async fn delete_rollback_reinserts_at_prior_rank() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();
        f.api.fail_next_delete(ApiError::Rejected {
            status: 403,
            message: "forbidden".into(),
        });

        let outcome = f.client.delete_card(f.card_x).await;
        assert!(outcome.is_rolled_back());

        let after = f.client.snapshot().await.unwrap();
        assert_eq!(after, before);
        assert_eq!(column_titles(&after, f.column_a), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn delete_of_vanished_card_is_noop() {
        let f = loaded_fixture().await;

        let outcome = f.client.delete_card(CardId::new()).await;
        assert!(outcome.is_noop());
        assert_eq!(f.api.mutation_count(), 0);
    }

    // ===========================================
    // Reconciliation Tests
    // ===========================================

    #[tokio::test]
    async fn remote_event_triggers_silent_refetch() {
        let f = loaded_fixture().await;
        f.client.connect().await.unwrap();

        let mut changed = two_column_board(f.event_id, f.column_a, f.column_b, f.card_x, f.card_y);
        changed.columns[0]
            .cards
            .push(card(f.column_a, CardId::new(), "z", 2.0));
        f.api.queue_board(changed);
        f.channel
            .queue_event(RemoteEvent::new(RemoteEventKind::CardMoved));

        let outcome = f.client.pump_once().await;
        assert_eq!(outcome, PumpOutcome::Delivered(RemoteEventKind::CardMoved));

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["x", "y", "z"]);
        assert_eq!(f.api.fetch_count(), 2); // load + one silent refetch
    }

    #[tokio::test]
    async fn duplicate_events_coalesce_to_one_follow_up() {
        let f = loaded_fixture().await;
        f.api.set_fetch_delay(Duration::from_millis(20));

        tokio::join!(
            f.client.reconcile(RemoteEventKind::CardMoved),
            f.client.reconcile(RemoteEventKind::CardMoved),
            f.client.reconcile(RemoteEventKind::CardMoved),
        );

        // One in-flight refetch plus exactly one queued follow-up.
        assert_eq!(f.api.fetch_count(), 3); // load + 2
    }

    #[tokio::test]
    async fn refetch_failure_keeps_last_known_good() {
        let f = loaded_fixture().await;
        f.client.connect().await.unwrap();
        let before = f.client.snapshot().await.unwrap();

        f.api.fail_next_fetch(ApiError::Transport("offline".into()));
        f.channel
            .queue_event(RemoteEvent::new(RemoteEventKind::CardUpdated));
        f.client.pump_once().await;

        assert_eq!(f.client.snapshot().await.unwrap(), before);

        // The next remote event retries and succeeds.
        let mut changed = two_column_board(f.event_id, f.column_a, f.column_b, f.card_x, f.card_y);
        changed.columns[0].cards[0].title = "x (edited remotely)".into();
        f.api.queue_board(changed);
        f.channel
            .queue_event(RemoteEvent::new(RemoteEventKind::CardUpdated));
        f.client.pump_once().await;

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(board.columns[0].cards[0].title, "x (edited remotely)");
    }

    #[tokio::test]
    async fn stale_update_event_never_resurrects_deleted_card() {
        let f = loaded_fixture().await;
        f.client.connect().await.unwrap();

        let outcome = f.client.delete_card(f.card_x).await;
        assert!(outcome.is_committed());

        // The authoritative board no longer contains x; the racing
        // CardUpdated payload about x must not bring it back.
        let mut authoritative =
            two_column_board(f.event_id, f.column_a, f.column_b, f.card_x, f.card_y);
        authoritative.columns[0].cards.remove(0);
        f.api.queue_board(authoritative);
        f.channel.queue_event(RemoteEvent::with_payload(
            RemoteEventKind::CardUpdated,
            serde_json::json!({ "cardId": f.card_x.to_string(), "title": "zombie" }),
        ));

        f.client.pump_once().await;

        let board = f.client.snapshot().await.unwrap();
        assert!(!contains_card(&board, f.card_x));
    }

    // ===========================================
    // In-Flight Tests
    // ===========================================

    #[tokio::test]
    async fn second_mutation_on_same_card_supersedes_the_first() {
        let f = loaded_fixture().await;
        f.api.set_mutation_delay(Duration::from_millis(20));
        f.api.fail_next_move(ApiError::Rejected {
            status: 500,
            message: "late rejection".into(),
        });

        let (move_outcome, update_outcome) = tokio::join!(
            f.client.move_card(f.card_x, f.column_b, 0),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                f.client.update_card(f.card_x, "renamed mid-flight", None).await
            }
        );

        // The rejected move surfaces its failure, but its rollback is
        // discarded: the update superseded its record.
        assert!(move_outcome.is_rolled_back());
        assert!(update_outcome.is_committed());

        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_b), vec!["renamed mid-flight"]);
        assert_eq!(column_titles(&board, f.column_a), vec!["y"]);
    }

    // ===========================================
    // Teardown Tests
    // ===========================================

    #[tokio::test]
    async fn teardown_discards_late_refetch() {
        let f = loaded_fixture().await;
        let before = f.client.snapshot().await.unwrap();

        let mut changed = two_column_board(f.event_id, f.column_a, f.column_b, f.card_x, f.card_y);
        changed.columns[0].cards[0].title = "too late".into();
        f.api.queue_board(changed);
        f.api.set_fetch_delay(Duration::from_millis(30));

        tokio::join!(f.client.reconcile(RemoteEventKind::CardMoved), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            f.client.teardown().await;
        });

        // The refetch resolved after teardown and must not replace the store.
        assert_eq!(f.client.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn teardown_discards_late_rollback() {
        let f = loaded_fixture().await;
        f.api.set_mutation_delay(Duration::from_millis(30));
        f.api.fail_next_delete(ApiError::Rejected {
            status: 500,
            message: "late".into(),
        });

        let (outcome, ()) = tokio::join!(f.client.delete_card(f.card_x), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            f.client.teardown().await;
        });

        // The failure is still surfaced, but the stale rollback does not
        // patch the torn-down session's store.
        assert!(outcome.is_rolled_back());
        let board = f.client.snapshot().await.unwrap();
        assert_eq!(column_titles(&board, f.column_a), vec!["y"]);
    }

    #[tokio::test]
    async fn teardown_stops_the_event_loop() {
        let f = loaded_fixture().await;
        f.client.connect().await.unwrap();

        f.client.teardown().await;

        assert_eq!(f.client.pump_once().await, PumpOutcome::Stopped);
        assert_eq!(f.channel.left_groups(), vec![f.event_id]);
        assert!(!f.channel.is_connected());
    }

    // ===========================================
    // Listener Tests
    // ===========================================

    #[tokio::test]
    async fn listeners_fire_on_every_visible_update() {
        let f = loaded_fixture().await;
        let seen = Arc::new(SyncMutex::new(0usize));
        let counter = Arc::clone(&seen);
        f.client.on_board_changed(move |_board| {
            *counter.lock().unwrap() += 1;
        });

        f.client.create_card(f.column_a, "new", None).await;
        let after_create = *seen.lock().unwrap();
        assert!(after_create >= 1);

        f.api.fail_next_delete(ApiError::Rejected {
            status: 500,
            message: "no".into(),
        });
        f.client.delete_card(f.card_x).await;

        // Optimistic removal + rollback both notify.
        assert!(*seen.lock().unwrap() >= after_create + 2);
    }
}
