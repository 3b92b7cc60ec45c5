//! The board data model.
//!
//! These are the shapes the board API returns. Field names follow the
//! server's camelCase JSON; ranks are carried as-is and normalized by the
//! store, not here.

use serde::{Deserialize, Serialize};

use crate::{BoardId, CardId, ColumnId, EventId, UserId, WireError};

/// A single task item, owned by exactly one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card identifier.
    pub id: CardId,
    /// Card title.
    pub title: String,
    /// Optional long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The column that owns this card.
    pub column_id: ColumnId,
    /// Numeric rank within the owning column. Unique per column, strictly
    /// increasing with visual position.
    pub order_index: f64,
    /// Optional assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
}

/// An ordered bucket of cards within a board (a workflow stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column identifier.
    pub id: ColumnId,
    /// Column title.
    pub title: String,
    /// Rank among the board's columns. Dense 0..n-1 after normalization.
    pub order_index: i64,
    /// The cards in this column, ordered by rank after normalization.
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// The ordered set of columns representing one event's task tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Board identifier.
    pub id: BoardId,
    /// Board title.
    pub title: String,
    /// The event this board belongs to.
    pub event_id: EventId,
    /// The board's columns.
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Board {
    /// Deserialize a board from the server's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        serde_json::from_str(json).map_err(WireError::Deserialization)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }
}

impl Card {
    /// Deserialize a card from the server's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        serde_json::from_str(json).map_err(WireError::Deserialization)
    }
}

/// The slice of an event this engine consumes: its identity and the invite
/// code used to share the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    /// Event identifier.
    pub id: EventId,
    /// Invite code for joining the event, if one exists.
    #[serde(default)]
    pub invite_code: Option<String>,
}

impl EventInfo {
    /// Deserialize event info from the server's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        serde_json::from_str(json).map_err(WireError::Deserialization)
    }
}
