//! # boardsync-core
//!
//! Pure logic for boardsync (no I/O, instant tests).
//!
//! This crate implements the state machines and algorithms of the board
//! synchronization engine without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP requests, the push channel) is performed by
//! `board-client`, which interprets the actions produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod mutation;
pub mod rank;
pub mod refetch;
pub mod store;

pub use connection::{Action, ConnectionState, Event, StatusChange};
pub use mutation::{ColumnSnapshot, InFlightTracker, MutationKind, MutationPhase, MutationRecord};
pub use rank::{plan_insert, plan_move, RankPlan};
pub use refetch::{RefetchDecision, RefetchFollowUp, RefetchGate};
pub use store::{BoardStore, CardLocation};
