//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, explicit `+00:00` offset) so that lexicographic comparison in
//! SQL matches chronological order, round-trips are lossless, and the
//! optimistic-concurrency equality check is exact. UUIDs are stored as
//! hyphenated lowercase strings; attachments and log snapshots as compact
//! JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use desk_core::{
  actor::{Department, Role, Worker},
  log::{LogAction, TicketLog},
  ticket::{Attachment, Priority, Status, Ticket, TicketType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, false)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<Status> {
  match s {
    "Open" => Ok(Status::Open),
    "In Progress" => Ok(Status::InProgress),
    "Waiting for Customer" => Ok(Status::WaitingForCustomer),
    "Resolved" => Ok(Status::Resolved),
    "Closed" => Ok(Status::Closed),
    other => Err(Error::Decode(format!("status {other:?}"))),
  }
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  match s {
    "Low" => Ok(Priority::Low),
    "Medium" => Ok(Priority::Medium),
    "High" => Ok(Priority::High),
    "Critical" => Ok(Priority::Critical),
    other => Err(Error::Decode(format!("priority {other:?}"))),
  }
}

pub fn decode_ticket_type(s: &str) -> Result<TicketType> {
  match s {
    "Incident" => Ok(TicketType::Incident),
    "Service Request" => Ok(TicketType::ServiceRequest),
    "Billing Issue" => Ok(TicketType::BillingIssue),
    "Technical Support" => Ok(TicketType::TechnicalSupport),
    "Access Issue" => Ok(TicketType::AccessIssue),
    "Feature Request" => Ok(TicketType::FeatureRequest),
    "General Inquiry" => Ok(TicketType::GeneralInquiry),
    other => Err(Error::Decode(format!("ticket type {other:?}"))),
  }
}

pub fn decode_department(s: &str) -> Result<Department> {
  match s {
    "IT" => Ok(Department::It),
    "HR" => Ok(Department::Hr),
    "Sales" => Ok(Department::Sales),
    "Support" => Ok(Department::Support),
    "Finance" => Ok(Department::Finance),
    "General" => Ok(Department::General),
    "Global" => Ok(Department::Global),
    other => Err(Error::Decode(format!("department {other:?}"))),
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "user" => Ok(Role::User),
    "agent" => Ok(Role::Agent),
    "manager" => Ok(Role::Manager),
    "admin" => Ok(Role::Admin),
    "super-admin" => Ok(Role::SuperAdmin),
    other => Err(Error::Decode(format!("role {other:?}"))),
  }
}

pub fn decode_log_action(s: &str) -> Result<LogAction> {
  match s {
    "Ticket Created" => Ok(LogAction::TicketCreated),
    "Status Updated" => Ok(LogAction::StatusUpdated),
    "Ticket Assigned" => Ok(LogAction::TicketAssigned),
    "SLA Escalation" => Ok(LogAction::SlaEscalation),
    "SLA Breached" => Ok(LogAction::SlaBreached),
    other => Err(Error::Decode(format!("log action {other:?}"))),
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

pub fn encode_attachments(attachments: &[Attachment]) -> Result<String> {
  Ok(serde_json::to_string(attachments)?)
}

pub fn decode_attachments(s: &str) -> Result<Vec<Attachment>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `tickets` row as read from SQLite, before decoding.
pub struct RawTicket {
  pub ticket_id:         String,
  pub subject:           String,
  pub description:       String,
  pub ticket_type:       String,
  pub status:            String,
  pub priority:          String,
  pub department:        String,
  pub created_by:        String,
  pub assigned_to:       Option<String>,
  pub sla_due_at:        String,
  pub escalation_due_at: String,
  pub is_escalated:      bool,
  pub is_sla_breached:   bool,
  pub sla_breached_at:   Option<String>,
  pub attachments:       String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawTicket {
  pub fn into_ticket(self) -> Result<Ticket> {
    Ok(Ticket {
      ticket_id:         decode_uuid(&self.ticket_id)?,
      subject:           self.subject,
      description:       self.description,
      ticket_type:       decode_ticket_type(&self.ticket_type)?,
      status:            decode_status(&self.status)?,
      priority:          decode_priority(&self.priority)?,
      department:        decode_department(&self.department)?,
      created_by:        decode_uuid(&self.created_by)?,
      assigned_to:       self
        .assigned_to
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      sla_due_at:        decode_dt(&self.sla_due_at)?,
      escalation_due_at: decode_dt(&self.escalation_due_at)?,
      is_escalated:      self.is_escalated,
      is_sla_breached:   self.is_sla_breached,
      sla_breached_at:   self
        .sla_breached_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      attachments:       decode_attachments(&self.attachments)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// A `ticket_logs` row as read from SQLite, before decoding.
pub struct RawLog {
  pub log_id:       String,
  pub ticket_id:    String,
  pub action:       String,
  pub performed_by: Option<String>,
  pub old_value:    Option<String>,
  pub new_value:    Option<String>,
  pub details:      Option<String>,
  pub created_at:   String,
}

impl RawLog {
  pub fn into_log(self) -> Result<TicketLog> {
    Ok(TicketLog {
      log_id:       decode_uuid(&self.log_id)?,
      ticket_id:    decode_uuid(&self.ticket_id)?,
      action:       decode_log_action(&self.action)?,
      performed_by: self
        .performed_by
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      old_value:    self
        .old_value
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      new_value:    self
        .new_value
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      details:      self.details,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// A `workers` row as read from SQLite, before decoding.
pub struct RawWorker {
  pub worker_id:  String,
  pub name:       String,
  pub email:      String,
  pub role:       String,
  pub department: String,
  pub active:     bool,
}

impl RawWorker {
  pub fn into_worker(self) -> Result<Worker> {
    Ok(Worker {
      worker_id:  decode_uuid(&self.worker_id)?,
      name:       self.name,
      email:      self.email,
      role:       decode_role(&self.role)?,
      department: decode_department(&self.department)?,
      active:     self.active,
    })
  }
}
