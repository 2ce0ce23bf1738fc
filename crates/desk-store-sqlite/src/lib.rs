//! SQLite backend for the helpdesk ticket store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Implements both
//! [`TicketStore`](desk_core::store::TicketStore) and
//! [`WorkerDirectory`](desk_core::store::WorkerDirectory).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
