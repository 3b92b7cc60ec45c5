//! Optimistic mutation records.
//!
//! Every optimistic edit captures a pre-mutation snapshot of the column(s)
//! it touches and moves through three states:
//!
//! 1. `Pending(snapshot)` - the optimistic patch is visible, the request is
//!    outstanding
//! 2. `Committed` - the server accepted; the snapshot is discarded
//! 3. `RolledBack(snapshot)` - the server rejected; the snapshot is what the
//!    applier must patch back into the store
//!
//! The [`InFlightTracker`] enforces the at-most-one-record-per-card rule: a
//! second mutation on a card whose record is still pending supersedes the
//! old record, and the superseded request's late result is ignored (its
//! ticket no longer matches).

use std::collections::HashMap;

use board_types::{Card, CardId, ColumnId};

/// Pre-mutation snapshot of the affected column card sequences.
///
/// Holds one entry per affected column; capturing the same column twice
/// (source equals destination) keeps a single entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSnapshot {
    columns: Vec<(ColumnId, Vec<Card>)>,
}

impl ColumnSnapshot {
    /// Capture the given column sequences, deduplicating by column id.
    pub fn capture<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ColumnId, Vec<Card>)>,
    {
        let mut columns: Vec<(ColumnId, Vec<Card>)> = Vec::new();
        for (id, cards) in entries {
            if !columns.iter().any(|(existing, _)| *existing == id) {
                columns.push((id, cards));
            }
        }
        Self { columns }
    }

    /// The captured `(column, cards)` entries.
    pub fn columns(&self) -> &[(ColumnId, Vec<Card>)] {
        &self.columns
    }
}

/// Which of the four mutations a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Card creation.
    Create,
    /// Card move within or between columns.
    Move,
    /// In-place field update.
    Update,
    /// Card deletion.
    Delete,
}

/// The three-state lifecycle of one optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPhase {
    /// Optimistic patch applied, request outstanding.
    Pending {
        /// The pre-mutation column state to restore on failure.
        snapshot: ColumnSnapshot,
    },
    /// Server accepted; no corrective action needed.
    Committed,
    /// Server rejected; the snapshot must be patched back.
    RolledBack {
        /// The pre-mutation column state the applier restores.
        snapshot: ColumnSnapshot,
    },
}

/// One optimistic mutation and its lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    card_id: CardId,
    kind: MutationKind,
    ticket: u64,
    phase: MutationPhase,
}

impl MutationRecord {
    /// The card this mutation targets (the provisional id for creates).
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    /// The mutation kind.
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// The ticket identifying this record among supersessions.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The lifecycle phase.
    pub fn phase(&self) -> &MutationPhase {
        &self.phase
    }

    /// Consume the record, returning the snapshot if it was rolled back.
    pub fn into_rollback_snapshot(self) -> Option<ColumnSnapshot> {
        match self.phase {
            MutationPhase::RolledBack { snapshot } => Some(snapshot),
            _ => None,
        }
    }
}

/// Tracks the in-flight mutation record per card.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    next_ticket: u64,
    records: HashMap<CardId, MutationRecord>,
}

impl InFlightTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a mutation on a card, superseding any record still pending for
    /// it. Returns the ticket the result handler must present.
    pub fn begin(&mut self, card_id: CardId, kind: MutationKind, snapshot: ColumnSnapshot) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.records.insert(
            card_id,
            MutationRecord {
                card_id,
                kind,
                ticket,
                phase: MutationPhase::Pending { snapshot },
            },
        );
        ticket
    }

    /// Mark a mutation committed.
    ///
    /// Returns the completed record, or `None` when the record was
    /// superseded or already resolved (the caller takes no action).
    pub fn commit(&mut self, card_id: &CardId, ticket: u64) -> Option<MutationRecord> {
        let mut record = self.take(card_id, ticket)?;
        record.phase = MutationPhase::Committed;
        Some(record)
    }

    /// Mark a mutation rolled back.
    ///
    /// Returns the record in its `RolledBack` phase carrying the snapshot to
    /// restore, or `None` when the record was superseded (stale results
    /// must not roll back state they no longer own).
    pub fn roll_back(&mut self, card_id: &CardId, ticket: u64) -> Option<MutationRecord> {
        let mut record = self.take(card_id, ticket)?;
        let MutationPhase::Pending { snapshot } = record.phase else {
            return None;
        };
        record.phase = MutationPhase::RolledBack { snapshot };
        Some(record)
    }

    /// Whether a card has a pending record.
    pub fn is_in_flight(&self, card_id: &CardId) -> bool {
        self.records.contains_key(card_id)
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records (teardown).
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn take(&mut self, card_id: &CardId, ticket: u64) -> Option<MutationRecord> {
        let live = self
            .records
            .get(card_id)
            .map_or(false, |record| record.ticket == ticket);
        if live {
            self.records.remove(card_id)
        } else {
            None
        }
    }
}
