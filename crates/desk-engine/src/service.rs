//! Ticket lifecycle service — orchestrates creation and update.
//!
//! Composes the SLA clock, type routing, assignment resolver, and transition
//! guard over a [`TicketStore`], appends audit log entries for every
//! accepted mutation, and emits fire-and-forget notifications.
//!
//! Write discipline: the ticket record is committed exactly once per
//! accepted request (optimistic concurrency on `updated_at`); log appends
//! and notifications run after the commit and are best-effort — a failed
//! append is logged and never rolls back the ticket write.

use std::sync::Arc;

use chrono::Utc;
use desk_core::{
  Error, Result,
  actor::{Actor, Role},
  log::{LogAction, NewLogEntry, TicketLog},
  sla::{compute_sla, route_for_type},
  store::{
    NotificationSink, Severity, TicketQuery, TicketStore, Visibility,
    WorkerDirectory,
  },
  ticket::{NewTicket, Priority, Status, Ticket, TicketPatch, TicketType},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
  assign::{auto_assign, validate_assignee},
  guard::{self, validate_description, validate_subject},
};

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Optional narrowing filters for [`TicketService::list`]; visibility
/// scoping is derived from the actor and applied on top.
#[derive(Debug, Clone, Default)]
pub struct TicketFilters {
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub assigned_to: Option<Uuid>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The lifecycle service. Cheap to clone; all state is shared.
pub struct TicketService<S, D, N> {
  store:     Arc<S>,
  directory: Arc<D>,
  sink:      Arc<N>,
}

impl<S, D, N> Clone for TicketService<S, D, N> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      directory: Arc::clone(&self.directory),
      sink:      Arc::clone(&self.sink),
    }
  }
}

impl<S, D, N> TicketService<S, D, N>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  pub fn new(store: Arc<S>, directory: Arc<D>, sink: Arc<N>) -> Self {
    Self {
      store,
      directory,
      sink,
    }
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  // ── Create ────────────────────────────────────────────────────────────

  /// Create a ticket: route it, compute its SLA clock, resolve assignment,
  /// persist, log, notify.
  pub async fn create(&self, input: NewTicket, actor: Actor) -> Result<Ticket> {
    validate_subject(&input.subject)?;
    validate_description(&input.description)?;
    if !input.attachments.is_empty() && actor.role != Role::User {
      return Err(Error::Forbidden(
        "only users may upload attachments".into(),
      ));
    }

    let ticket_type = input.ticket_type.unwrap_or(TicketType::Incident);
    // An absent type routes like a general inquiry (Support/Low) even though
    // the stored type defaults to Incident.
    let (routed_department, routed_priority) = match input.ticket_type {
      Some(t) => route_for_type(t),
      None => route_for_type(TicketType::GeneralInquiry),
    };

    // Only admin-tier actors may pin classification; everyone else gets the
    // routing table.
    let privileged = actor.role.is_admin_tier();
    let department = match input.department {
      Some(d) if privileged => d,
      _ => routed_department,
    };
    let priority = match input.priority {
      Some(p) if privileged => p,
      _ => routed_priority,
    };

    let now = Utc::now();
    let clock = compute_sla(priority, now);

    let assigned_to = match input.assigned_to {
      Some(requested) if privileged => {
        Some(validate_assignee(self.directory.as_ref(), requested).await?.worker_id)
      }
      _ => auto_assign(self.directory.as_ref(), department).await?,
    };

    let ticket = Ticket {
      ticket_id: Uuid::new_v4(),
      subject: input.subject,
      description: input.description,
      ticket_type,
      status: Status::Open,
      priority,
      department,
      created_by: actor.actor_id,
      assigned_to,
      sla_due_at: clock.sla_due_at,
      escalation_due_at: clock.escalation_due_at,
      is_escalated: false,
      is_sla_breached: false,
      sla_breached_at: None,
      attachments: input
        .attachments
        .into_iter()
        .map(|a| a.into_attachment(actor.actor_id, now))
        .collect(),
      created_at: now,
      updated_at: now,
    };

    self
      .store
      .insert_ticket(ticket.clone())
      .await
      .map_err(Error::store)?;

    // The creation entry snapshots the full initial record.
    let snapshot =
      serde_json::to_value(&ticket).unwrap_or(serde_json::Value::Null);
    self
      .append_log_best_effort(
        NewLogEntry::new(ticket.ticket_id, LogAction::TicketCreated)
          .performed_by(actor.actor_id)
          .new_value(snapshot),
      )
      .await;

    self.notify_creation(&ticket).await;

    Ok(ticket)
  }

  // ── Read ──────────────────────────────────────────────────────────────

  /// Fetch a single ticket. Plain users may only read their own.
  pub async fn get(&self, id: Uuid, actor: Actor) -> Result<Ticket> {
    let ticket = self
      .store
      .get_ticket(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TicketNotFound(id))?;

    if actor.role == Role::User && ticket.created_by != actor.actor_id {
      return Err(Error::Forbidden(
        "not authorized to view this ticket".into(),
      ));
    }
    Ok(ticket)
  }

  /// List tickets visible to `actor`, newest first, narrowed by `filters`.
  pub async fn list(
    &self,
    actor: Actor,
    filters: TicketFilters,
  ) -> Result<Vec<Ticket>> {
    let visibility = match actor.role {
      Role::User => Visibility::CreatedBy(actor.actor_id),
      Role::Agent => Visibility::AgentScope {
        worker_id:  actor.actor_id,
        department: actor.department,
      },
      Role::Manager | Role::Admin | Role::SuperAdmin => Visibility::Everything,
    };
    let query = TicketQuery {
      visibility,
      status: filters.status,
      priority: filters.priority,
      assigned_to: filters.assigned_to,
    };
    self.store.list_tickets(&query).await.map_err(Error::store)
  }

  /// The audit history of a ticket, newest first. Staff only.
  pub async fn history(&self, id: Uuid, actor: Actor) -> Result<Vec<TicketLog>> {
    if !actor.role.is_staff() {
      return Err(Error::Forbidden(
        "not authorized to view ticket history".into(),
      ));
    }
    self
      .store
      .get_ticket(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TicketNotFound(id))?;
    self.store.logs_for_ticket(id).await.map_err(Error::store)
  }

  // ── Update ────────────────────────────────────────────────────────────

  /// Apply a guarded partial update and return the refreshed record.
  pub async fn update(
    &self,
    id: Uuid,
    patch: TicketPatch,
    actor: Actor,
  ) -> Result<Ticket> {
    let current = self
      .store
      .get_ticket(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TicketNotFound(id))?;

    let mut change = guard::authorize(&current, &patch, &actor)?;

    if let Some(requested) = change.assigned_to {
      validate_assignee(self.directory.as_ref(), requested).await?;
      // Assignment pulls an Open ticket into In Progress unless the caller
      // asked for a specific status in the same patch.
      if current.status == Status::Open && change.status.is_none() {
        change.status = Some(Status::InProgress);
      }
    }

    if change.is_empty() {
      return Ok(current);
    }

    let now = Utc::now();
    let mut updated = current.clone();
    if let Some(subject) = change.subject {
      updated.subject = subject;
    }
    if let Some(description) = change.description {
      updated.description = description;
    }
    if let Some(ticket_type) = change.ticket_type {
      updated.ticket_type = ticket_type;
    }
    if let Some(status) = change.status {
      updated.status = status;
    }
    if let Some(priority) = change.priority {
      updated.priority = priority;
    }
    if let Some(department) = change.department {
      updated.department = department;
    }
    if let Some(assignee) = change.assigned_to {
      updated.assigned_to = Some(assignee);
    }
    for attachment in change.attachments {
      updated
        .attachments
        .push(attachment.into_attachment(actor.actor_id, now));
    }
    updated.updated_at = now;

    let applied = self
      .store
      .update_ticket(updated.clone(), current.updated_at)
      .await
      .map_err(Error::store)?;
    if !applied {
      return Err(Error::Conflict(id));
    }

    // One log entry per changed field group, carrying only that field.
    if updated.status != current.status {
      self
        .append_log_best_effort(
          NewLogEntry::new(id, LogAction::StatusUpdated)
            .performed_by(actor.actor_id)
            .old_value(json!({ "status": current.status }))
            .new_value(json!({ "status": updated.status })),
        )
        .await;
      self.notify_status_change(&updated).await;
    }
    if updated.assigned_to != current.assigned_to {
      self
        .append_log_best_effort(
          NewLogEntry::new(id, LogAction::TicketAssigned)
            .performed_by(actor.actor_id)
            .old_value(json!({ "assigned_to": current.assigned_to }))
            .new_value(json!({ "assigned_to": updated.assigned_to })),
        )
        .await;
      if let Some(assignee) = updated.assigned_to {
        self.notify_assignment(&updated, assignee).await;
      }
    }

    Ok(updated)
  }

  // ── Delete ────────────────────────────────────────────────────────────

  /// Remove a ticket and its log entries. Admin tier only.
  pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<()> {
    if !actor.role.is_admin_tier() {
      return Err(Error::Forbidden(
        "not authorized to delete tickets".into(),
      ));
    }
    let existed = self.store.delete_ticket(id).await.map_err(Error::store)?;
    if !existed {
      return Err(Error::TicketNotFound(id));
    }
    Ok(())
  }

  // ── Side effects ──────────────────────────────────────────────────────

  /// Append a log entry for an already-committed ticket write. Failures are
  /// logged and swallowed: the ticket record is the source of truth and is
  /// never rolled back for a lost history line.
  async fn append_log_best_effort(&self, entry: NewLogEntry) {
    let ticket_id = entry.ticket_id;
    let action = entry.action;
    if let Err(e) = self.store.append_log(entry).await {
      tracing::error!(%ticket_id, %action, error = %e, "audit log append failed");
    }
  }

  async fn notify_creation(&self, ticket: &Ticket) {
    let message = format!(
      "Ticket #{} created successfully.",
      ticket.ticket_id
    );
    self
      .notify_quietly(ticket.created_by, message, Severity::Success, ticket)
      .await;

    if let Some(creator) = self.lookup_worker(ticket.created_by).await {
      let subject = format!(
        "Ticket Created: #{} - {}",
        ticket.ticket_id, ticket.subject
      );
      let html = format!(
        "<p>Your ticket has been created successfully.</p>\
         <p><strong>Subject:</strong> {}</p>\
         <p>We will get back to you soon.</p>",
        ticket.subject
      );
      self.email_quietly(creator, subject, html).await;
    }
  }

  async fn notify_status_change(&self, ticket: &Ticket) {
    let message = format!(
      "Ticket #{} status updated to {}",
      ticket.ticket_id, ticket.status
    );
    self
      .notify_quietly(ticket.created_by, message, Severity::Info, ticket)
      .await;

    if let Some(creator) = self.lookup_worker(ticket.created_by).await {
      let subject = format!(
        "Ticket Update: #{} is now {}",
        ticket.ticket_id, ticket.status
      );
      let html = format!(
        "<p>Your ticket status has been updated to <strong>{}</strong>.</p>",
        ticket.status
      );
      self.email_quietly(creator, subject, html).await;
    }
  }

  async fn notify_assignment(&self, ticket: &Ticket, assignee: Uuid) {
    let message = format!(
      "You have been assigned to Ticket #{}",
      ticket.ticket_id
    );
    self
      .notify_quietly(assignee, message, Severity::Info, ticket)
      .await;

    if let Some(agent) = self.lookup_worker(assignee).await {
      let subject = format!("New Assignment: Ticket #{}", ticket.ticket_id);
      let html = format!(
        "<p>You have been assigned to ticket <strong>#{}</strong>.</p>\
         <p>Subject: {}</p>",
        ticket.ticket_id, ticket.subject
      );
      self.email_quietly(agent, subject, html).await;
    }
  }

  async fn lookup_worker(&self, id: Uuid) -> Option<desk_core::actor::Worker> {
    match self.directory.get_worker(id).await {
      Ok(worker) => worker,
      Err(e) => {
        tracing::warn!(worker_id = %id, error = %e, "directory lookup failed");
        None
      }
    }
  }

  async fn notify_quietly(
    &self,
    recipient: Uuid,
    message: String,
    severity: Severity,
    ticket: &Ticket,
  ) {
    if let Err(e) = self
      .sink
      .notify(recipient, message, severity, Some(ticket.ticket_id))
      .await
    {
      tracing::warn!(%recipient, error = %e, "notification delivery failed");
    }
  }

  async fn email_quietly(
    &self,
    to: desk_core::actor::Worker,
    subject: String,
    html: String,
  ) {
    if let Err(e) = self.sink.send_email(to.email, subject, html).await {
      tracing::warn!(worker_id = %to.worker_id, error = %e, "email delivery failed");
    }
  }
}
