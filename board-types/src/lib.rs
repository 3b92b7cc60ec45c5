//! # boardsync-types
//!
//! Shared types for the boardsync client engine.
//!
//! This crate provides the foundational types used across all boardsync
//! crates:
//! - [`BoardId`], [`ColumnId`], [`CardId`], [`EventId`], [`UserId`] - Identity types
//! - [`Board`], [`Column`], [`Card`] - The board data model
//! - [`CreateCardRequest`], [`MoveCardRequest`], [`UpdateCardRequest`] - Mutation DTOs
//! - [`RemoteEvent`] - Push-channel change notifications
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;
mod model;
mod requests;

pub use error::WireError;
pub use events::{RemoteEvent, RemoteEventKind};
pub use ids::{BoardId, CardId, ColumnId, EventId, UserId};
pub use model::{Board, Card, Column, EventInfo};
pub use requests::{CreateCardRequest, MoveCardRequest, UpdateCardRequest};
