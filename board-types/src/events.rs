//! Push-channel change notifications.
//!
//! The server broadcasts exactly four named notifications when a board
//! changes. Their payloads are carried opaquely: a payload is not guaranteed
//! to be a full, order-consistent column snapshot, so the engine never
//! patches state from it directly and instead refetches the board.

use std::fmt;

/// The four board-change notification names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteEventKind {
    /// A card was moved within or between columns.
    CardMoved,
    /// A card was created.
    CardCreated,
    /// A card was deleted.
    CardDeleted,
    /// A card's fields were updated.
    CardUpdated,
}

impl RemoteEventKind {
    /// All four kinds, in subscription order.
    pub const ALL: [RemoteEventKind; 4] = [
        RemoteEventKind::CardMoved,
        RemoteEventKind::CardCreated,
        RemoteEventKind::CardDeleted,
        RemoteEventKind::CardUpdated,
    ];

    /// The wire name of this notification.
    pub fn name(self) -> &'static str {
        match self {
            RemoteEventKind::CardMoved => "CardMoved",
            RemoteEventKind::CardCreated => "CardCreated",
            RemoteEventKind::CardDeleted => "CardDeleted",
            RemoteEventKind::CardUpdated => "CardUpdated",
        }
    }

    /// Parse a wire name into a kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CardMoved" => Some(RemoteEventKind::CardMoved),
            "CardCreated" => Some(RemoteEventKind::CardCreated),
            "CardDeleted" => Some(RemoteEventKind::CardDeleted),
            "CardUpdated" => Some(RemoteEventKind::CardUpdated),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A change notification received from the push channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    /// Which of the four notifications this is.
    pub kind: RemoteEventKind,
    /// Opaque payload as delivered. Never used to patch the store.
    pub payload: Option<serde_json::Value>,
}

impl RemoteEvent {
    /// Create a payload-less notification.
    pub fn new(kind: RemoteEventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Create a notification carrying the delivered payload.
    pub fn with_payload(kind: RemoteEventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload: Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for kind in RemoteEventKind::ALL {
            assert_eq!(RemoteEventKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(RemoteEventKind::from_name("ColumnMoved"), None);
        assert_eq!(RemoteEventKind::from_name(""), None);
    }

    #[test]
    fn all_lists_each_kind_once() {
        let mut names: Vec<&str> = RemoteEventKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn event_carries_opaque_payload() {
        let event = RemoteEvent::with_payload(
            RemoteEventKind::CardUpdated,
            serde_json::json!({"cardId": "abc"}),
        );
        assert_eq!(event.kind, RemoteEventKind::CardUpdated);
        assert!(event.payload.is_some());
    }
}
