//! Mock board API for testing.
//!
//! Allows queueing fetch results and capturing issued requests for
//! verification.

use super::{ApiError, BoardApi};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use board_types::{
    Board, Card, CardId, CreateCardRequest, EventId, EventInfo, MoveCardRequest,
    UpdateCardRequest,
};

/// A recorded API call, for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `fetch_board` was invoked.
    FetchBoard(EventId),
    /// `create_card` was invoked.
    CreateCard(CreateCardRequest),
    /// `move_card` was invoked.
    MoveCard(MoveCardRequest),
    /// `update_card` was invoked.
    UpdateCard(CardId, UpdateCardRequest),
    /// `delete_card` was invoked.
    DeleteCard(CardId),
    /// `fetch_event` was invoked.
    FetchEvent(EventId),
}

/// Mock board API for testing.
///
/// Boards are served from a queue; once the queue drains, the most recently
/// served board keeps being returned (the authoritative state between
/// changes is stable). Mutations succeed unless a `fail_next_*` switch is
/// armed.
#[derive(Debug, Default)]
pub struct MockApi {
    inner: Arc<Mutex<MockApiInner>>,
}

#[derive(Debug, Default)]
struct MockApiInner {
    board_queue: VecDeque<Board>,
    last_board: Option<Board>,
    event_info: Option<EventInfo>,
    calls: Vec<ApiCall>,
    fail_next_fetch: Option<ApiError>,
    fail_next_create: Option<ApiError>,
    fail_next_move: Option<ApiError>,
    fail_next_update: Option<ApiError>,
    fail_next_delete: Option<ApiError>,
    fetch_delay: Option<Duration>,
    mutation_delay: Option<Duration>,
}

impl MockApi {
    /// Create a new mock API.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a board to be returned by the next `fetch_board()` call.
    pub fn queue_board(&self, board: Board) {
        let mut inner = self.inner.lock().unwrap();
        inner.board_queue.push_back(board);
    }

    /// Set the event info returned by `fetch_event()`.
    pub fn set_event_info(&self, info: EventInfo) {
        let mut inner = self.inner.lock().unwrap();
        inner.event_info = Some(info);
    }

    /// Get all calls that were issued.
    pub fn calls(&self) -> Vec<ApiCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of `fetch_board` calls issued so far.
    pub fn fetch_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|c| matches!(c, ApiCall::FetchBoard(_)))
            .count()
    }

    /// Number of mutation calls (create/move/update/delete) issued so far.
    pub fn mutation_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|c| !matches!(c, ApiCall::FetchBoard(_) | ApiCall::FetchEvent(_)))
            .count()
    }

    /// Cause the next `fetch_board()` to fail with the given error.
    pub fn fail_next_fetch(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_fetch = Some(error);
    }

    /// Cause the next `create_card()` to fail with the given error.
    pub fn fail_next_create(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_create = Some(error);
    }

    /// Cause the next `move_card()` to fail with the given error.
    pub fn fail_next_move(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_move = Some(error);
    }

    /// Cause the next `update_card()` to fail with the given error.
    pub fn fail_next_update(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_update = Some(error);
    }

    /// Cause the next `delete_card()` to fail with the given error.
    pub fn fail_next_delete(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_delete = Some(error);
    }

    /// Delay every `fetch_board()` response, so tests can overlap requests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().fetch_delay = Some(delay);
    }

    /// Delay every mutation response, so tests can overlap requests.
    pub fn set_mutation_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().mutation_delay = Some(delay);
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Clone for MockApi {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl BoardApi for MockApi {
    async fn fetch_board(&self, event_id: EventId) -> Result<Board, ApiError> {
        let delay = self.inner.lock().unwrap().fetch_delay;
        Self::pause(delay).await;

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::FetchBoard(event_id));

        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(error);
        }

        if let Some(board) = inner.board_queue.pop_front() {
            inner.last_board = Some(board.clone());
            return Ok(board);
        }
        inner
            .last_board
            .clone()
            .ok_or_else(|| ApiError::Transport("no board queued".into()))
    }

    async fn create_card(&self, request: &CreateCardRequest) -> Result<Card, ApiError> {
        let delay = self.inner.lock().unwrap().mutation_delay;
        Self::pause(delay).await;

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::CreateCard(request.clone()));

        if let Some(error) = inner.fail_next_create.take() {
            return Err(error);
        }

        // The engine never trusts this shape; a fresh server-side id is enough.
        Ok(Card {
            id: CardId::new(),
            title: request.title.clone(),
            description: request.description.clone(),
            column_id: request.column_id,
            order_index: 0.0,
            assigned_user_id: None,
        })
    }

    async fn move_card(&self, request: &MoveCardRequest) -> Result<(), ApiError> {
        let delay = self.inner.lock().unwrap().mutation_delay;
        Self::pause(delay).await;

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::MoveCard(request.clone()));

        if let Some(error) = inner.fail_next_move.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn update_card(
        &self,
        card_id: CardId,
        request: &UpdateCardRequest,
    ) -> Result<(), ApiError> {
        let delay = self.inner.lock().unwrap().mutation_delay;
        Self::pause(delay).await;

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::UpdateCard(card_id, request.clone()));

        if let Some(error) = inner.fail_next_update.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn delete_card(&self, card_id: CardId) -> Result<(), ApiError> {
        let delay = self.inner.lock().unwrap().mutation_delay;
        Self::pause(delay).await;

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::DeleteCard(card_id));

        if let Some(error) = inner.fail_next_delete.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn fetch_event(&self, event_id: EventId) -> Result<EventInfo, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(ApiCall::FetchEvent(event_id));

        inner
            .event_info
            .clone()
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                message: "event not found".into(),
            })
    }
}
