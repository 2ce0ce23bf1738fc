//! The `TicketStore` trait and the collaborator interfaces the engine
//! consumes.
//!
//! `TicketStore` is implemented by storage backends (e.g.
//! `desk-store-sqlite`). [`WorkerDirectory`] and [`NotificationSink`] are the
//! narrow seams to the identity directory and the outbound message sink; the
//! engine never knows how either is implemented.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  actor::{Department, Worker},
  log::{NewLogEntry, TicketLog},
  ticket::{Priority, Status, Ticket},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Role-scoped visibility applied to ticket listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
  /// Managers, admins, and super-admins see everything.
  #[default]
  Everything,
  /// Plain users see only tickets they created.
  CreatedBy(Uuid),
  /// Agents see tickets assigned to them, plus unassigned tickets in their
  /// own department.
  AgentScope {
    worker_id:  Uuid,
    department: Department,
  },
}

/// Parameters for [`TicketStore::list_tickets`].
#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
  pub visibility:  Visibility,
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub assigned_to: Option<Uuid>,
}

// ─── TicketStore ─────────────────────────────────────────────────────────────

/// Abstraction over a durable ticket store.
///
/// The ticket record is read-modify-written under optimistic concurrency:
/// [`update_ticket`](TicketStore::update_ticket) only applies when the stored
/// `updated_at` still matches the value the caller read. Log writes are
/// strictly append-only. The sweep predicates and conditional marks exist so
/// the SLA monitor can process each ticket at most once per state change
/// without a global lock.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TicketStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tickets ───────────────────────────────────────────────────────────

  /// Persist a fully-built new ticket record.
  fn insert_ticket(
    &self,
    ticket: Ticket,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a ticket by id. Returns `None` if not found.
  fn get_ticket(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Ticket>, Self::Error>> + Send + '_;

  /// List tickets matching `query`, newest first.
  fn list_tickets<'a>(
    &'a self,
    query: &'a TicketQuery,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + 'a;

  /// Replace the stored record with `ticket`, but only if the stored
  /// `updated_at` still equals `expected_updated_at`.
  ///
  /// Returns `false` when the guard trips (another writer got there first);
  /// nothing is written in that case.
  fn update_ticket(
    &self,
    ticket: Ticket,
    expected_updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete a ticket and cascade-delete its log entries in one transaction.
  /// Returns `false` if the ticket did not exist.
  fn delete_ticket(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Audit log — append-only ───────────────────────────────────────────

  /// Append a log entry. `log_id` and `created_at` are assigned by the
  /// store. Existing entries are never touched.
  fn append_log(
    &self,
    entry: NewLogEntry,
  ) -> impl Future<Output = Result<TicketLog, Self::Error>> + Send + '_;

  /// All log entries for a ticket, newest first.
  fn logs_for_ticket(
    &self,
    ticket_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TicketLog>, Self::Error>> + Send + '_;

  // ── SLA sweep support ─────────────────────────────────────────────────

  /// Tickets whose escalation threshold has passed: `escalation_due_at <=
  /// now`, status not terminal, not yet escalated, not yet breached.
  fn tickets_due_for_escalation(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  /// Tickets whose hard deadline has passed: `sla_due_at <= now`, status not
  /// terminal, not yet breached.
  fn tickets_due_for_breach(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  /// Conditionally set `is_escalated`. Returns `false` if the ticket was
  /// already escalated, already breached, or has left the sweep predicate —
  /// the atomicity guard against double-processing.
  fn mark_escalated(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Conditionally set `is_sla_breached` and `sla_breached_at`. Same
  /// idempotence contract as [`mark_escalated`](TicketStore::mark_escalated).
  fn mark_breached(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Worker directory ────────────────────────────────────────────────────────

/// Read access to the worker directory maintained by the identity
/// collaborator.
pub trait WorkerDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Active workers with role `agent` in `department`.
  fn find_active_agents(
    &self,
    department: Department,
  ) -> impl Future<Output = Result<Vec<Worker>, Self::Error>> + Send + '_;

  /// Look up any directory principal by id. Returns `None` if unknown.
  fn get_worker(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Worker>, Self::Error>> + Send + '_;
}

// ─── Notification sink ───────────────────────────────────────────────────────

/// Severity attached to an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
  Info,
  Success,
  Warning,
  Error,
}

/// Fire-and-forget outbound messaging. Callers swallow failures: a sink
/// error is logged and never propagated as a lifecycle error.
pub trait NotificationSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Deliver an in-app notification to a directory principal.
  fn notify(
    &self,
    recipient: Uuid,
    message: String,
    severity: Severity,
    ticket_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Deliver an email.
  fn send_email(
    &self,
    to: String,
    subject: String,
    html: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
