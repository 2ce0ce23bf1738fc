//! Transition guard — the role-aware validator for ticket mutations.
//!
//! All role-based branching in the lifecycle is centralised here as a
//! field-level policy table (role → touchable fields) plus a handful of
//! value rules that a flat table cannot express (users may only set status
//! to `Closed`; only users may attach files). The guard never mutates
//! anything: it turns a [`TicketPatch`] into a validated [`ChangeSet`]
//! containing only the fields that actually differ from the current record,
//! or fails without side effects.

use desk_core::{
  Error, Result,
  actor::{Actor, Department, Role},
  ticket::{
    MAX_SUBJECT_LEN, NewAttachment, Priority, Status, Ticket, TicketPatch,
    TicketType,
  },
};
use uuid::Uuid;

// ─── Change set ──────────────────────────────────────────────────────────────

/// The accepted, already-diffed outcome of guarding a patch. Every `Some`
/// field is a real change against the current record.
#[derive(Debug, Default)]
pub struct ChangeSet {
  pub subject:     Option<String>,
  pub description: Option<String>,
  pub ticket_type: Option<TicketType>,
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub department:  Option<Department>,
  /// Requested new assignee; still subject to directory validation.
  pub assigned_to: Option<Uuid>,
  pub attachments: Vec<NewAttachment>,
}

impl ChangeSet {
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

// ─── Policy table ────────────────────────────────────────────────────────────

/// A mutable field group on a ticket, as seen by the authorization matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Subject,
  Description,
  Type,
  Status,
  Priority,
  Department,
  Assignment,
  Attachments,
}

impl Field {
  fn name(self) -> &'static str {
    match self {
      Field::Subject => "subject",
      Field::Description => "description",
      Field::Type => "type",
      Field::Status => "status",
      Field::Priority => "priority",
      Field::Department => "department",
      Field::Assignment => "assignment",
      Field::Attachments => "attachments",
    }
  }
}

/// Which field groups a role may touch at all. Managers are read-only and
/// rejected before this table is consulted.
fn allowed_fields(role: Role) -> &'static [Field] {
  match role {
    Role::User => &[
      Field::Subject,
      Field::Description,
      Field::Status,
      Field::Attachments,
    ],
    Role::Agent => &[
      Field::Subject,
      Field::Description,
      Field::Type,
      Field::Status,
    ],
    Role::Manager => &[],
    Role::Admin | Role::SuperAdmin => &[
      Field::Subject,
      Field::Description,
      Field::Type,
      Field::Status,
      Field::Priority,
      Field::Department,
      Field::Assignment,
    ],
  }
}

fn check_field(role: Role, field: Field) -> Result<()> {
  if allowed_fields(role).contains(&field) {
    Ok(())
  } else {
    Err(Error::Forbidden(format!(
      "role {role} may not change {}",
      field.name()
    )))
  }
}

// ─── Field validation ────────────────────────────────────────────────────────

pub fn validate_subject(subject: &str) -> Result<()> {
  if subject.trim().is_empty() {
    return Err(Error::Validation("subject must not be empty".into()));
  }
  if subject.chars().count() > MAX_SUBJECT_LEN {
    return Err(Error::Validation(format!(
      "subject exceeds {MAX_SUBJECT_LEN} characters"
    )));
  }
  Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
  if description.trim().is_empty() {
    return Err(Error::Validation("description must not be empty".into()));
  }
  Ok(())
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Whether `actor` is within mutation scope for `ticket` at all.
fn in_scope(ticket: &Ticket, actor: &Actor) -> bool {
  match actor.role {
    Role::User => ticket.created_by == actor.actor_id,
    Role::Agent => {
      ticket.assigned_to == Some(actor.actor_id)
        || (ticket.assigned_to.is_none()
          && ticket.department == actor.department)
    }
    // Managers never pass the guard; admins always do.
    Role::Manager => false,
    Role::Admin | Role::SuperAdmin => true,
  }
}

// ─── Guard ───────────────────────────────────────────────────────────────────

/// Validate `patch` against the actor's role and the ticket's current state.
///
/// On success, returns the diffed [`ChangeSet`]; values equal to the current
/// record are dropped before the policy table is consulted, so re-sending an
/// unchanged field is never an authorization error. On failure, nothing has
/// been mutated and no log entry may be written.
pub fn authorize(
  ticket: &Ticket,
  patch: &TicketPatch,
  actor: &Actor,
) -> Result<ChangeSet> {
  if actor.role == Role::Manager {
    return Err(Error::Forbidden("managers have read-only access".into()));
  }
  if !in_scope(ticket, actor) {
    return Err(Error::Forbidden(format!(
      "not authorized to update ticket {}",
      ticket.ticket_id
    )));
  }

  // Field validation happens before any policy decision so that malformed
  // input always fails with ValidationError regardless of role.
  if let Some(subject) = &patch.subject {
    validate_subject(subject)?;
  }
  if let Some(description) = &patch.description {
    validate_description(description)?;
  }

  let mut change = ChangeSet::default();

  if let Some(subject) = &patch.subject
    && *subject != ticket.subject
  {
    check_field(actor.role, Field::Subject)?;
    change.subject = Some(subject.clone());
  }
  if let Some(description) = &patch.description
    && *description != ticket.description
  {
    check_field(actor.role, Field::Description)?;
    change.description = Some(description.clone());
  }
  if let Some(ticket_type) = patch.ticket_type
    && ticket_type != ticket.ticket_type
  {
    check_field(actor.role, Field::Type)?;
    change.ticket_type = Some(ticket_type);
  }
  if let Some(status) = patch.status
    && status != ticket.status
  {
    check_field(actor.role, Field::Status)?;
    // Users may only self-service close; any other target value (including
    // reopening a ticket they closed) is denied.
    if actor.role == Role::User && status != Status::Closed {
      return Err(Error::Forbidden(
        "users may only close their own tickets".into(),
      ));
    }
    change.status = Some(status);
  }
  if let Some(priority) = patch.priority
    && priority != ticket.priority
  {
    check_field(actor.role, Field::Priority)?;
    change.priority = Some(priority);
  }
  if let Some(department) = patch.department
    && department != ticket.department
  {
    check_field(actor.role, Field::Department)?;
    change.department = Some(department);
  }
  if let Some(assignee) = patch.assigned_to
    && ticket.assigned_to != Some(assignee)
  {
    check_field(actor.role, Field::Assignment)?;
    change.assigned_to = Some(assignee);
  }
  if !patch.attachments.is_empty() {
    // Only end users upload files, on create and on update alike.
    if actor.role != Role::User {
      return Err(Error::Forbidden(
        "only users may upload attachments".into(),
      ));
    }
    check_field(actor.role, Field::Attachments)?;
    change.attachments = patch.attachments.clone();
  }

  Ok(change)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use desk_core::sla::compute_sla;

  use super::*;

  fn ticket(created_by: Uuid, assigned_to: Option<Uuid>) -> Ticket {
    let now = Utc::now();
    let clock = compute_sla(Priority::Medium, now);
    Ticket {
      ticket_id: Uuid::new_v4(),
      subject: "Printer on fire".into(),
      description: "It is quite literally on fire.".into(),
      ticket_type: TicketType::Incident,
      status: Status::Open,
      priority: Priority::Medium,
      department: Department::Support,
      created_by,
      assigned_to,
      sla_due_at: clock.sla_due_at,
      escalation_due_at: clock.escalation_due_at,
      is_escalated: false,
      is_sla_breached: false,
      sla_breached_at: None,
      attachments: vec![],
      created_at: now,
      updated_at: now,
    }
  }

  fn actor(role: Role) -> Actor {
    Actor {
      actor_id: Uuid::new_v4(),
      role,
      department: Department::Support,
    }
  }

  #[test]
  fn manager_is_always_forbidden() {
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      status: Some(Status::Resolved),
      ..Default::default()
    };
    let err = authorize(&t, &patch, &actor(Role::Manager)).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[test]
  fn agent_cannot_change_priority() {
    let a = actor(Role::Agent);
    let t = ticket(Uuid::new_v4(), Some(a.actor_id));
    let patch = TicketPatch {
      priority: Some(Priority::Critical),
      ..Default::default()
    };
    let err = authorize(&t, &patch, &a).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[test]
  fn agent_resending_current_priority_is_not_an_error() {
    let a = actor(Role::Agent);
    let t = ticket(Uuid::new_v4(), Some(a.actor_id));
    let patch = TicketPatch {
      priority: Some(t.priority),
      status: Some(Status::InProgress),
      ..Default::default()
    };
    let change = authorize(&t, &patch, &a).unwrap();
    assert!(change.priority.is_none());
    assert_eq!(change.status, Some(Status::InProgress));
  }

  #[test]
  fn agent_cannot_reassign() {
    let a = actor(Role::Agent);
    let t = ticket(Uuid::new_v4(), Some(a.actor_id));
    let patch = TicketPatch {
      assigned_to: Some(Uuid::new_v4()),
      ..Default::default()
    };
    let err = authorize(&t, &patch, &a).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[test]
  fn agent_out_of_scope_ticket_is_forbidden() {
    let a = actor(Role::Agent);
    // Assigned to someone else.
    let t = ticket(Uuid::new_v4(), Some(Uuid::new_v4()));
    let patch = TicketPatch {
      status: Some(Status::Resolved),
      ..Default::default()
    };
    assert!(authorize(&t, &patch, &a).is_err());
  }

  #[test]
  fn agent_may_take_unassigned_department_ticket_through_states() {
    let a = actor(Role::Agent);
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      status: Some(Status::WaitingForCustomer),
      ..Default::default()
    };
    let change = authorize(&t, &patch, &a).unwrap();
    assert_eq!(change.status, Some(Status::WaitingForCustomer));
  }

  #[test]
  fn user_may_close_own_ticket_only() {
    let a = actor(Role::User);
    let t = ticket(a.actor_id, None);

    let close = TicketPatch {
      status: Some(Status::Closed),
      ..Default::default()
    };
    assert!(authorize(&t, &close, &a).is_ok());

    let resolve = TicketPatch {
      status: Some(Status::Resolved),
      ..Default::default()
    };
    assert!(matches!(
      authorize(&t, &resolve, &a).unwrap_err(),
      Error::Forbidden(_)
    ));
  }

  #[test]
  fn user_cannot_reopen_after_close() {
    let a = actor(Role::User);
    let mut t = ticket(a.actor_id, None);
    t.status = Status::Closed;
    let patch = TicketPatch {
      status: Some(Status::Open),
      ..Default::default()
    };
    assert!(matches!(
      authorize(&t, &patch, &a).unwrap_err(),
      Error::Forbidden(_)
    ));
  }

  #[test]
  fn user_cannot_touch_other_users_ticket() {
    let a = actor(Role::User);
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      status: Some(Status::Closed),
      ..Default::default()
    };
    assert!(matches!(
      authorize(&t, &patch, &a).unwrap_err(),
      Error::Forbidden(_)
    ));
  }

  #[test]
  fn admin_may_change_everything() {
    let a = actor(Role::Admin);
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      status: Some(Status::InProgress),
      priority: Some(Priority::Critical),
      department: Some(Department::It),
      assigned_to: Some(Uuid::new_v4()),
      ..Default::default()
    };
    let change = authorize(&t, &patch, &a).unwrap();
    assert!(change.status.is_some());
    assert!(change.priority.is_some());
    assert!(change.department.is_some());
    assert!(change.assigned_to.is_some());
  }

  #[test]
  fn staff_may_not_attach_files() {
    let a = actor(Role::Admin);
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      attachments: vec![NewAttachment {
        path:          "uploads/x.png".into(),
        original_name: "x.png".into(),
        size:          1,
        mime_type:     "image/png".into(),
      }],
      ..Default::default()
    };
    assert!(matches!(
      authorize(&t, &patch, &a).unwrap_err(),
      Error::Forbidden(_)
    ));
  }

  #[test]
  fn oversized_subject_is_a_validation_error() {
    let a = actor(Role::Admin);
    let t = ticket(Uuid::new_v4(), None);
    let patch = TicketPatch {
      subject: Some("x".repeat(MAX_SUBJECT_LEN + 1)),
      ..Default::default()
    };
    assert!(matches!(
      authorize(&t, &patch, &a).unwrap_err(),
      Error::Validation(_)
    ));
  }
}
