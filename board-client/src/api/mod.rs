//! Board API abstraction.
//!
//! This module provides a pluggable client for the HTTP-style operations the
//! engine consumes (board fetch, card mutations, event lookup).
//!
//! # Design
//!
//! The trait is async and request-response oriented. Implementations handle
//! the underlying mechanism (REST over HTTP, mock for testing); the engine
//! only depends on the operation semantics:
//! - `fetch_board()` returns the full authoritative board
//! - the card mutations return success/failure (plus the created card)
//! - `fetch_event()` returns the invite code for the board's event

mod mock;
mod rest;

pub use mock::{ApiCall, MockApi};
pub use rest::RestApi;

use async_trait::async_trait;
use thiserror::Error;

use board_types::{
    Board, Card, CardId, CreateCardRequest, EventId, EventInfo, MoveCardRequest,
    UpdateCardRequest, WireError,
};

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection dropped, DNS failure, ...).
    /// Mutations are never silently retried after this.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status; the optimistic patch
    /// must be rolled back.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The credential was rejected. Not handled here; the session-management
    /// collaborator forces re-authentication.
    #[error("credential rejected")]
    AuthExpired,

    /// The response body was not valid board JSON.
    #[error("decode error: {0}")]
    Decode(#[from] WireError),
}

/// The HTTP-style operations the sync engine consumes.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Fetch the full board for an event: columns with ranks, cards with
    /// ranks.
    async fn fetch_board(&self, event_id: EventId) -> Result<Board, ApiError>;

    /// Create a card. The server assigns the authoritative identity and
    /// rank; the returned card is not trusted to match the optimistic one.
    async fn create_card(&self, request: &CreateCardRequest) -> Result<Card, ApiError>;

    /// Move a card; the server re-ranks the affected column(s).
    async fn move_card(&self, request: &MoveCardRequest) -> Result<(), ApiError>;

    /// Update a card's fields in place.
    async fn update_card(
        &self,
        card_id: CardId,
        request: &UpdateCardRequest,
    ) -> Result<(), ApiError>;

    /// Delete a card.
    async fn delete_card(&self, card_id: CardId) -> Result<(), ApiError>;

    /// Fetch the event owning the board (for its invite code).
    async fn fetch_event(&self, event_id: EventId) -> Result<EventInfo, ApiError>;
}
