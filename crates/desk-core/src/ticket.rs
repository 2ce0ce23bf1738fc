//! Ticket — the unit of work tracked by the helpdesk engine.
//!
//! A ticket is created once and then mutated through its state machine. Every
//! accepted mutation bumps `updated_at`, which doubles as the optimistic
//! concurrency token for read-modify-write cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Department;

/// Maximum accepted length of a ticket subject, in characters.
pub const MAX_SUBJECT_LEN: usize = 100;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Workflow state of a ticket. There is no enforced total order; who may move
/// a ticket between states is governed by the transition guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
  Open,
  #[serde(rename = "In Progress")]
  InProgress,
  #[serde(rename = "Waiting for Customer")]
  WaitingForCustomer,
  Resolved,
  Closed,
}

impl Status {
  /// Resolved and Closed tickets are out of scope for SLA sweeps.
  pub fn is_terminal(self) -> bool {
    matches!(self, Status::Resolved | Status::Closed)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Status::Open => "Open",
      Status::InProgress => "In Progress",
      Status::WaitingForCustomer => "Waiting for Customer",
      Status::Resolved => "Resolved",
      Status::Closed => "Closed",
    }
  }
}

impl std::fmt::Display for Status {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Urgency classification; drives the SLA clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
  Low,
  Medium,
  High,
  Critical,
}

impl Priority {
  pub fn as_str(self) -> &'static str {
    match self {
      Priority::Low => "Low",
      Priority::Medium => "Medium",
      Priority::High => "High",
      Priority::Critical => "Critical",
    }
  }
}

impl std::fmt::Display for Priority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The kind of request a ticket represents. Determines the default department
/// and priority when the creator does not (or may not) choose them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketType {
  Incident,
  #[serde(rename = "Service Request")]
  ServiceRequest,
  #[serde(rename = "Billing Issue")]
  BillingIssue,
  #[serde(rename = "Technical Support")]
  TechnicalSupport,
  #[serde(rename = "Access Issue")]
  AccessIssue,
  #[serde(rename = "Feature Request")]
  FeatureRequest,
  #[serde(rename = "General Inquiry")]
  GeneralInquiry,
}

impl TicketType {
  pub fn as_str(self) -> &'static str {
    match self {
      TicketType::Incident => "Incident",
      TicketType::ServiceRequest => "Service Request",
      TicketType::BillingIssue => "Billing Issue",
      TicketType::TechnicalSupport => "Technical Support",
      TicketType::AccessIssue => "Access Issue",
      TicketType::FeatureRequest => "Feature Request",
      TicketType::GeneralInquiry => "General Inquiry",
    }
  }
}

impl std::fmt::Display for TicketType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// Opaque metadata for a file already stored by the file-intake collaborator.
/// The engine never touches raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
  pub path:          String,
  pub original_name: String,
  pub size:          u64,
  pub mime_type:     String,
  pub uploader:      Uuid,
  pub uploaded_at:   DateTime<Utc>,
}

/// Attachment metadata as supplied by the file-intake collaborator, before
/// the engine stamps uploader and upload time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
  pub path:          String,
  pub original_name: String,
  pub size:          u64,
  pub mime_type:     String,
}

impl NewAttachment {
  pub fn into_attachment(self, uploader: Uuid, at: DateTime<Utc>) -> Attachment {
    Attachment {
      path:          self.path,
      original_name: self.original_name,
      size:          self.size,
      mime_type:     self.mime_type,
      uploader,
      uploaded_at:   at,
    }
  }
}

// ─── Ticket ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
  pub ticket_id:         Uuid,
  pub subject:           String,
  pub description:       String,
  pub ticket_type:       TicketType,
  pub status:            Status,
  pub priority:          Priority,
  pub department:        Department,
  /// Immutable after creation.
  pub created_by:        Uuid,
  pub assigned_to:       Option<Uuid>,
  /// Hard SLA deadline.
  pub sla_due_at:        DateTime<Utc>,
  /// Earlier warning threshold; always strictly before `sla_due_at`.
  pub escalation_due_at: DateTime<Utc>,
  pub is_escalated:      bool,
  /// Once set, never reset by normal operation.
  pub is_sla_breached:   bool,
  pub sla_breached_at:   Option<DateTime<Utc>>,
  pub attachments:       Vec<Attachment>,
  pub created_at:        DateTime<Utc>,
  /// Bumped on every mutation; doubles as the optimistic-concurrency token.
  pub updated_at:        DateTime<Utc>,
}

/// Input accepted by ticket creation, before routing, SLA computation, and
/// assignment resolution have run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTicket {
  pub subject:     String,
  pub description: String,
  pub ticket_type: Option<TicketType>,
  /// Honoured only for admin-tier actors; otherwise the routing table wins.
  pub priority:    Option<Priority>,
  /// Honoured only for admin-tier actors; otherwise the routing table wins.
  pub department:  Option<Department>,
  /// Explicit assignee; honoured only for admin-tier actors.
  pub assigned_to: Option<Uuid>,
  #[serde(default)]
  pub attachments: Vec<NewAttachment>,
}

/// A partial update to a ticket. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
  pub subject:     Option<String>,
  pub description: Option<String>,
  pub ticket_type: Option<TicketType>,
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub department:  Option<Department>,
  pub assigned_to: Option<Uuid>,
  #[serde(default)]
  pub attachments: Vec<NewAttachment>,
}

impl TicketPatch {
  /// True if the patch carries no changes at all.
  pub fn is_empty(&self) -> bool {
    self.subject.is_none()
      && self.description.is_none()
      && self.ticket_type.is_none()
      && self.status.is_none()
      && self.priority.is_none()
      && self.department.is_none()
      && self.assigned_to.is_none()
      && self.attachments.is_empty()
  }
}
