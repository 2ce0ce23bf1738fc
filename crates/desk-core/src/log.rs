//! Ticket audit log — the append-only history of every mutation.
//!
//! Log entries are never updated or deleted (except when their ticket is
//! deleted, which cascades). `old_value` / `new_value` are partial snapshots
//! holding only the fields that changed, for diff display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Classifier for a log entry. Serialised with the human-readable strings the
/// history view displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogAction {
  #[serde(rename = "Ticket Created")]
  TicketCreated,
  #[serde(rename = "Status Updated")]
  StatusUpdated,
  #[serde(rename = "Ticket Assigned")]
  TicketAssigned,
  #[serde(rename = "SLA Escalation")]
  SlaEscalation,
  #[serde(rename = "SLA Breached")]
  SlaBreached,
}

impl LogAction {
  pub fn as_str(self) -> &'static str {
    match self {
      LogAction::TicketCreated => "Ticket Created",
      LogAction::StatusUpdated => "Status Updated",
      LogAction::TicketAssigned => "Ticket Assigned",
      LogAction::SlaEscalation => "SLA Escalation",
      LogAction::SlaBreached => "SLA Breached",
    }
  }
}

impl std::fmt::Display for LogAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A persisted audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketLog {
  pub log_id:       Uuid,
  pub ticket_id:    Uuid,
  pub action:       LogAction,
  /// `None` for system-originated entries (the SLA monitor).
  pub performed_by: Option<Uuid>,
  /// Partial snapshot of the changed fields before the mutation.
  pub old_value:    Option<Value>,
  /// Partial snapshot of the changed fields after the mutation.
  pub new_value:    Option<Value>,
  pub details:      Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// Input for appending a log entry; `log_id` and `created_at` are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
  pub ticket_id:    Uuid,
  pub action:       LogAction,
  pub performed_by: Option<Uuid>,
  pub old_value:    Option<Value>,
  pub new_value:    Option<Value>,
  pub details:      Option<String>,
}

impl NewLogEntry {
  pub fn new(ticket_id: Uuid, action: LogAction) -> Self {
    Self {
      ticket_id,
      action,
      performed_by: None,
      old_value: None,
      new_value: None,
      details: None,
    }
  }

  pub fn performed_by(mut self, actor_id: Uuid) -> Self {
    self.performed_by = Some(actor_id);
    self
  }

  pub fn old_value(mut self, value: Value) -> Self {
    self.old_value = Some(value);
    self
  }

  pub fn new_value(mut self, value: Value) -> Self {
    self.new_value = Some(value);
    self
  }

  pub fn details(mut self, details: impl Into<String>) -> Self {
    self.details = Some(details.into());
    self
  }
}
