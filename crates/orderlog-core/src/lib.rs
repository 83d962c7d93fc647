//! orderlog-core library.
//!
//! The reversible-action history behind the order board: an item model, the
//! [`board::ItemCollection`] contract actions are applied to, the closed set
//! of [`action::Action`] kinds, and the bounded [`history::History`].
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in the library, each mapping to an
//!   [`error::ErrorCode`]; `anyhow::Result` for file and config loading.
//! - **Logging**: `tracing` macros only; installing a subscriber is the
//!   host's job.

pub mod action;
pub mod board;
pub mod config;
pub mod error;
pub mod history;
pub mod model;

pub use action::{Action, ActionKind, Outcome};
pub use board::{Board, CollectionError, ItemCollection};
pub use history::{History, HistoryError, Step};
