//! The board state store.
//!
//! Single writable owner of the client-visible board. Mutators go through
//! two atomic operations: [`BoardStore::replace`] (full board, used by the
//! initial load and every reconciliation refetch) and [`BoardStore::patch`]
//! (one column's card sequence, used by optimistic mutations and rollback).
//!
//! Normalization is the store's responsibility: after any operation,
//! consumers observe columns sorted by rank and re-ranked dense `0..n-1`,
//! and cards within each column sorted by rank. No torn state is ever
//! observable between operations.

use board_types::{Board, Card, CardId, ColumnId};

/// Where a card currently sits: its column and 0-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLocation {
    /// The owning column.
    pub column_id: ColumnId,
    /// 0-based position within the column's card sequence.
    pub position: usize,
}

/// Holds the current client-visible board.
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    board: Option<Board>,
}

impl BoardStore {
    /// Create an empty store (no board loaded).
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the whole board, normalizing it first.
    pub fn replace(&mut self, mut board: Board) {
        normalize(&mut board);
        self.board = Some(board);
    }

    /// Atomically replace one column's card sequence.
    ///
    /// The cards are sorted by rank before becoming visible. Returns `false`
    /// (and changes nothing) when no board is loaded or the column does not
    /// exist; a stale patch must never corrupt the store.
    pub fn patch(&mut self, column_id: &ColumnId, mut cards: Vec<Card>) -> bool {
        let Some(board) = self.board.as_mut() else {
            return false;
        };
        let Some(column) = board.columns.iter_mut().find(|c| c.id == *column_id) else {
            return false;
        };
        sort_cards(&mut cards);
        column.cards = cards;
        true
    }

    /// Drop the loaded board entirely (teardown).
    pub fn clear(&mut self) {
        self.board = None;
    }

    /// The current normalized board, if one is loaded.
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// A cloned snapshot of the current normalized board.
    pub fn snapshot(&self) -> Option<Board> {
        self.board.clone()
    }

    /// Locate a card by id.
    pub fn find_card(&self, card_id: &CardId) -> Option<CardLocation> {
        let board = self.board.as_ref()?;
        for column in &board.columns {
            if let Some(position) = column.cards.iter().position(|c| c.id == *card_id) {
                return Some(CardLocation {
                    column_id: column.id,
                    position,
                });
            }
        }
        None
    }

    /// The card sequence of a column, if the column exists.
    pub fn column_cards(&self, column_id: &ColumnId) -> Option<&[Card]> {
        let board = self.board.as_ref()?;
        board
            .columns
            .iter()
            .find(|c| c.id == *column_id)
            .map(|c| c.cards.as_slice())
    }
}

/// Sort columns by rank, re-rank them dense `0..n-1`, and sort each
/// column's cards by rank.
fn normalize(board: &mut Board) {
    board.columns.sort_by_key(|c| c.order_index);
    for (index, column) in board.columns.iter_mut().enumerate() {
        column.order_index = index as i64;
        sort_cards(&mut column.cards);
    }
}

fn sort_cards(cards: &mut [Card]) {
    cards.sort_by(|a, b| a.order_index.total_cmp(&b.order_index));
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_types::{BoardId, Column, EventId};

    fn card(column_id: ColumnId, title: &str, rank: f64) -> Card {
        Card {
            id: CardId::new(),
            title: title.into(),
            description: None,
            column_id,
            order_index: rank,
            assigned_user_id: None,
        }
    }

    fn board_with(columns: Vec<Column>) -> Board {
        Board {
            id: BoardId::new(),
            title: "Board".into(),
            event_id: EventId::new(),
            columns,
        }
    }

    #[test]
    fn replace_sorts_columns_and_makes_ranks_dense() {
        let a = ColumnId::new();
        let b = ColumnId::new();
        let board = board_with(vec![
            Column {
                id: a,
                title: "Done".into(),
                order_index: 7,
                cards: vec![],
            },
            Column {
                id: b,
                title: "To do".into(),
                order_index: 2,
                cards: vec![],
            },
        ]);

        let mut store = BoardStore::new();
        store.replace(board);

        let columns = &store.board().unwrap().columns;
        assert_eq!(columns[0].id, b);
        assert_eq!(columns[1].id, a);
        assert_eq!(columns[0].order_index, 0);
        assert_eq!(columns[1].order_index, 1);
    }

    #[test]
    fn replace_sorts_cards_by_rank() {
        let col = ColumnId::new();
        let board = board_with(vec![Column {
            id: col,
            title: "To do".into(),
            order_index: 0,
            cards: vec![
                card(col, "second", 1.5),
                card(col, "first", 0.25),
                card(col, "third", 9.0),
            ],
        }]);

        let mut store = BoardStore::new();
        store.replace(board);

        let titles: Vec<&str> = store
            .column_cards(&col)
            .unwrap()
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn patch_replaces_one_column_only() {
        let a = ColumnId::new();
        let b = ColumnId::new();
        let keep = card(b, "untouched", 0.0);
        let board = board_with(vec![
            Column {
                id: a,
                title: "To do".into(),
                order_index: 0,
                cards: vec![card(a, "old", 0.0)],
            },
            Column {
                id: b,
                title: "Doing".into(),
                order_index: 1,
                cards: vec![keep.clone()],
            },
        ]);

        let mut store = BoardStore::new();
        store.replace(board);

        assert!(store.patch(&a, vec![card(a, "new", 3.0), card(a, "newer", 1.0)]));

        let titles: Vec<&str> = store
            .column_cards(&a)
            .unwrap()
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["newer", "new"]);
        assert_eq!(store.column_cards(&b).unwrap().to_vec(), vec![keep]);
    }

    #[test]
    fn patch_unknown_column_is_rejected() {
        let col = ColumnId::new();
        let mut store = BoardStore::new();
        store.replace(board_with(vec![Column {
            id: col,
            title: "To do".into(),
            order_index: 0,
            cards: vec![],
        }]));

        let before = store.snapshot();
        assert!(!store.patch(&ColumnId::new(), vec![card(col, "lost", 0.0)]));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn patch_without_board_is_rejected() {
        let mut store = BoardStore::new();
        assert!(!store.patch(&ColumnId::new(), vec![]));
        assert!(store.board().is_none());
    }

    #[test]
    fn find_card_reports_column_and_position() {
        let col = ColumnId::new();
        let target = card(col, "target", 2.0);
        let target_id = target.id;
        let mut store = BoardStore::new();
        store.replace(board_with(vec![Column {
            id: col,
            title: "To do".into(),
            order_index: 0,
            cards: vec![card(col, "first", 1.0), target],
        }]));

        let location = store.find_card(&target_id).unwrap();
        assert_eq!(location.column_id, col);
        assert_eq!(location.position, 1);
        assert!(store.find_card(&CardId::new()).is_none());
    }

    #[test]
    fn clear_drops_the_board() {
        let mut store = BoardStore::new();
        store.replace(board_with(vec![]));
        assert!(store.board().is_some());

        store.clear();
        assert!(store.board().is_none());
    }
}
