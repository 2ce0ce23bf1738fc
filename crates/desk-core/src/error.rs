//! Error taxonomy for the ticket engine.
//!
//! Every variant is a recoverable, typed result for the API layer; nothing
//! here is ever surfaced as an unhandled fault. Notification-sink failures
//! are not represented — they are swallowed and logged at the call site.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range input. Never mutates state.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("ticket not found: {0}")]
  TicketNotFound(Uuid),

  #[error("worker not found: {0}")]
  WorkerNotFound(Uuid),

  /// Role or ownership rule violated.
  #[error("forbidden: {0}")]
  Forbidden(String),

  /// Assignment target is not an active agent.
  #[error("invalid assignee: {0}")]
  InvalidAssignee(Uuid),

  /// The optimistic-concurrency guard tripped; nothing was written.
  #[error("concurrent update conflict on ticket {0}")]
  Conflict(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error at the store seam.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
