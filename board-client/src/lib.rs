//! # boardsync-client
//!
//! Client engine for optimistic, push-reconciled board synchronization.
//!
//! This is the library applications embed to render a shared task board.
//!
//! ## Features
//!
//! - **Optimistic Mutations**: create/move/update/delete render before the
//!   server answers, with silent rollback on rejection
//! - **Push-Triggered Reconciliation**: any remote change notification is
//!   answered with one coalesced, silent full-board refetch
//! - **Pluggable I/O**: `BoardApi` and `PushChannel` traits (REST, mock)
//! - **Pure State Machines**: board-core carries the side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use boardsync_client::{BoardClient, BoardClientConfig, RestApi};
//!
//! let config = BoardClientConfig::new(event_id).with_credential(token);
//! let client = BoardClient::new(config, api, channel);
//!
//! client.load().await?;
//! client.connect().await?;
//!
//! // Optimistic edit; rolls back by itself if the server rejects it.
//! client.move_card(card_id, column_id, 0).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod channel;
pub mod client;
pub mod subscriber;

pub use api::{ApiCall, ApiError, BoardApi, MockApi, RestApi};
pub use channel::{ChannelError, MockChannel, PushChannel};
pub use client::{BoardClient, BoardClientConfig, MutationOutcome};
pub use subscriber::{EventSubscriber, PumpOutcome};
