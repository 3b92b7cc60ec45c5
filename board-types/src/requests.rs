//! Mutation request DTOs.
//!
//! These are the bodies of the card mutation calls. Field names follow the
//! server's camelCase JSON contract.

use serde::{Deserialize, Serialize};

use crate::{CardId, ColumnId, WireError};

/// Request body for creating a card in a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    /// Target column.
    pub column_id: ColumnId,
    /// Card title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request body for moving a card to a position within a column.
///
/// The server re-ranks the affected column(s); the index here is the
/// destination position, not a rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    /// The card being moved.
    pub card_id: CardId,
    /// Destination column (may equal the source column).
    pub target_column_id: ColumnId,
    /// 0-based destination position within the target column.
    pub new_order_index: usize,
}

/// Request body for updating a card's fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    /// New title.
    pub title: String,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateCardRequest {
    /// Serialize to the wire JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }
}

impl MoveCardRequest {
    /// Serialize to the wire JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }
}

impl UpdateCardRequest {
    /// Serialize to the wire JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }
}
