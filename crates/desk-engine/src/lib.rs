//! The ticket lifecycle and SLA enforcement engine.
//!
//! Composes the pure policy functions from [`desk_core`] with a
//! [`TicketStore`](desk_core::store::TicketStore) backend, a
//! [`WorkerDirectory`](desk_core::store::WorkerDirectory), and a
//! [`NotificationSink`](desk_core::store::NotificationSink):
//!
//! - [`TicketService`] — creation, guarded updates, deletion, role-scoped
//!   listing, and history reads.
//! - [`SlaMonitor`] — the recurring sweep that escalates and breaches
//!   tickets whose deadlines have passed.

pub mod assign;
pub mod guard;
pub mod monitor;
pub mod service;

#[cfg(test)]
mod tests;

pub use monitor::{MonitorHandle, SlaMonitor};
pub use service::{TicketFilters, TicketService};
