//! REST implementation of the board API.
//!
//! Routes match the server's contract:
//! - `GET    {base}/kanban/{eventId}` - full board
//! - `POST   {base}/kanban/cards` - create card
//! - `PUT    {base}/kanban/cards/move` - move card
//! - `PUT    {base}/kanban/cards/{id}` - update card
//! - `DELETE {base}/kanban/cards/{id}` - delete card
//! - `GET    {base}/events/{id}` - event details (invite code)
//!
//! Every request carries the bearer credential; a 401 response maps to
//! [`ApiError::AuthExpired`] for the session-management collaborator.

use super::{ApiError, BoardApi};
use async_trait::async_trait;

use board_types::{
    Board, Card, CardId, CreateCardRequest, EventId, EventInfo, MoveCardRequest,
    UpdateCardRequest,
};

/// REST board API over HTTP.
#[derive(Clone)]
pub struct RestApi {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for RestApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestApi")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl RestApi {
    /// Create a REST API client against `base_url` (e.g. `https://host/api`)
    /// using the given bearer credential.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            access_token: access_token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthExpired);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn body(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BoardApi for RestApi {
    async fn fetch_board(&self, event_id: EventId) -> Result<Board, ApiError> {
        let body = self
            .body(self.http.get(self.url(&format!("/kanban/{event_id}"))))
            .await?;
        Ok(Board::from_json(&body)?)
    }

    async fn create_card(&self, request: &CreateCardRequest) -> Result<Card, ApiError> {
        let body = self
            .body(
                self.http
                    .post(self.url("/kanban/cards"))
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(request.to_json()?),
            )
            .await?;
        Ok(Card::from_json(&body)?)
    }

    async fn move_card(&self, request: &MoveCardRequest) -> Result<(), ApiError> {
        self.send(
            self.http
                .put(self.url("/kanban/cards/move"))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(request.to_json()?),
        )
        .await?;
        Ok(())
    }

    async fn update_card(
        &self,
        card_id: CardId,
        request: &UpdateCardRequest,
    ) -> Result<(), ApiError> {
        self.send(
            self.http
                .put(self.url(&format!("/kanban/cards/{card_id}")))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(request.to_json()?),
        )
        .await?;
        Ok(())
    }

    async fn delete_card(&self, card_id: CardId) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(&format!("/kanban/cards/{card_id}"))))
            .await?;
        Ok(())
    }

    async fn fetch_event(&self, event_id: EventId) -> Result<EventInfo, ApiError> {
        let body = self
            .body(self.http.get(self.url(&format!("/events/{event_id}"))))
            .await?;
        Ok(EventInfo::from_json(&body)?)
    }
}
