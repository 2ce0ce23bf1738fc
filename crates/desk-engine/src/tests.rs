//! End-to-end engine tests against the in-memory SQLite store.

use std::{
  convert::Infallible,
  sync::{Arc, Mutex},
};

use chrono::Duration;
use desk_core::{
  Error,
  actor::{Actor, Department, Role, Worker},
  log::LogAction,
  store::{NotificationSink, Severity, TicketStore},
  ticket::{NewTicket, Priority, Status, TicketPatch, TicketType},
};
use desk_store_sqlite::SqliteStore;
use serde_json::json;
use uuid::Uuid;

use crate::{SlaMonitor, TicketFilters, TicketService};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Sink that records every delivery for assertion.
#[derive(Default)]
struct RecordingSink {
  notifications: Mutex<Vec<(Uuid, String, Severity)>>,
  emails:        Mutex<Vec<(String, String)>>,
}

impl NotificationSink for RecordingSink {
  type Error = Infallible;

  async fn notify(
    &self,
    recipient: Uuid,
    message: String,
    severity: Severity,
    _ticket_id: Option<Uuid>,
  ) -> Result<(), Infallible> {
    self
      .notifications
      .lock()
      .unwrap()
      .push((recipient, message, severity));
    Ok(())
  }

  async fn send_email(
    &self,
    to: String,
    subject: String,
    _html: String,
  ) -> Result<(), Infallible> {
    self.emails.lock().unwrap().push((to, subject));
    Ok(())
  }
}

struct Fixture {
  service: TicketService<SqliteStore, SqliteStore, RecordingSink>,
  monitor: SlaMonitor<SqliteStore, RecordingSink>,
  store:   Arc<SqliteStore>,
  sink:    Arc<RecordingSink>,
}

async fn fixture() -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("store"));
  let sink = Arc::new(RecordingSink::default());
  let service = TicketService::new(
    Arc::clone(&store),
    Arc::clone(&store),
    Arc::clone(&sink),
  );
  let monitor = SlaMonitor::new(
    Arc::clone(&store),
    Arc::clone(&sink),
    "ops@example.com",
  );
  Fixture {
    service,
    monitor,
    store,
    sink,
  }
}

fn actor(role: Role) -> Actor {
  Actor {
    actor_id: Uuid::new_v4(),
    role,
    department: Department::Support,
  }
}

async fn seed_agent(store: &SqliteStore, department: Department) -> Worker {
  let worker = Worker {
    worker_id: Uuid::new_v4(),
    name: "Sam Agent".into(),
    email: "sam@example.com".into(),
    role: Role::Agent,
    department,
    active: true,
  };
  store.put_worker(worker.clone()).await.unwrap();
  worker
}

fn new_ticket(ticket_type: TicketType) -> NewTicket {
  NewTicket {
    subject: "Cannot log in".into(),
    description: "SSO loops back to the login page.".into(),
    ticket_type: Some(ticket_type),
    ..Default::default()
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn access_issue_routes_to_it_critical_with_four_hour_clock() {
  let f = fixture().await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::AccessIssue), actor(Role::User))
    .await
    .unwrap();

  assert_eq!(ticket.department, Department::It);
  assert_eq!(ticket.priority, Priority::Critical);
  assert_eq!(ticket.status, Status::Open);
  assert_eq!(ticket.sla_due_at - ticket.created_at, Duration::hours(4));
  assert_eq!(
    ticket.sla_due_at - ticket.escalation_due_at,
    Duration::hours(1)
  );
}

#[tokio::test]
async fn absent_type_routes_like_general_inquiry() {
  let f = fixture().await;
  let input = NewTicket {
    ticket_type: None,
    ..new_ticket(TicketType::Incident)
  };
  let ticket = f.service.create(input, actor(Role::User)).await.unwrap();

  // Stored type defaults to Incident, but routing treats a missing type as
  // a general inquiry.
  assert_eq!(ticket.ticket_type, TicketType::Incident);
  assert_eq!(ticket.department, Department::Support);
  assert_eq!(ticket.priority, Priority::Low);
  assert_eq!(ticket.sla_due_at - ticket.created_at, Duration::hours(48));
}

#[tokio::test]
async fn empty_department_leaves_ticket_unassigned() {
  let f = fixture().await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::GeneralInquiry), actor(Role::User))
    .await
    .unwrap();
  assert_eq!(ticket.assigned_to, None);
}

#[tokio::test]
async fn auto_assignment_picks_a_department_agent() {
  let f = fixture().await;
  let a = seed_agent(&f.store, Department::It).await;
  let b = seed_agent(&f.store, Department::It).await;
  seed_agent(&f.store, Department::Hr).await;

  let ticket = f
    .service
    .create(new_ticket(TicketType::TechnicalSupport), actor(Role::User))
    .await
    .unwrap();

  let assignee = ticket.assigned_to.unwrap();
  assert!(assignee == a.worker_id || assignee == b.worker_id);
}

#[tokio::test]
async fn non_privileged_priority_request_is_overridden_by_routing() {
  let f = fixture().await;
  let input = NewTicket {
    priority: Some(Priority::Critical),
    department: Some(Department::Finance),
    ..new_ticket(TicketType::GeneralInquiry)
  };
  let ticket = f.service.create(input, actor(Role::User)).await.unwrap();
  assert_eq!(ticket.priority, Priority::Low);
  assert_eq!(ticket.department, Department::Support);
}

#[tokio::test]
async fn admin_may_pin_classification_and_assignee() {
  let f = fixture().await;
  let agent = seed_agent(&f.store, Department::Hr).await;
  let input = NewTicket {
    priority: Some(Priority::High),
    department: Some(Department::Sales),
    assigned_to: Some(agent.worker_id),
    ..new_ticket(TicketType::GeneralInquiry)
  };
  let ticket = f.service.create(input, actor(Role::Admin)).await.unwrap();
  assert_eq!(ticket.priority, Priority::High);
  assert_eq!(ticket.department, Department::Sales);
  assert_eq!(ticket.assigned_to, Some(agent.worker_id));
}

#[tokio::test]
async fn admin_assigning_a_non_agent_fails_with_invalid_assignee() {
  let f = fixture().await;
  let mut manager = seed_agent(&f.store, Department::It).await;
  manager.role = Role::Manager;
  f.store.put_worker(manager.clone()).await.unwrap();

  let input = NewTicket {
    assigned_to: Some(manager.worker_id),
    ..new_ticket(TicketType::Incident)
  };
  let err = f.service.create(input, actor(Role::Admin)).await.unwrap_err();
  assert!(matches!(err, Error::InvalidAssignee(id) if id == manager.worker_id));
}

#[tokio::test]
async fn creation_writes_a_full_snapshot_log_and_notifies_creator() {
  let f = fixture().await;
  let creator = actor(Role::User);
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), creator)
    .await
    .unwrap();

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].action, LogAction::TicketCreated);
  assert_eq!(logs[0].performed_by, Some(creator.actor_id));
  let snapshot = logs[0].new_value.as_ref().unwrap();
  assert_eq!(snapshot["subject"], json!("Cannot log in"));

  let notifications = f.sink.notifications.lock().unwrap();
  assert!(notifications
    .iter()
    .any(|(to, _, sev)| *to == creator.actor_id && *sev == Severity::Success));
}

// ─── Updates and the guard ───────────────────────────────────────────────────

#[tokio::test]
async fn agent_priority_change_is_forbidden_and_leaves_no_trace() {
  let f = fixture().await;
  let agent = seed_agent(&f.store, Department::It).await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::TechnicalSupport), actor(Role::User))
    .await
    .unwrap();

  let agent_actor = Actor {
    actor_id: agent.worker_id,
    role: Role::Agent,
    department: Department::It,
  };
  let patch = TicketPatch {
    priority: Some(Priority::Low),
    ..Default::default()
  };
  let err = f
    .service
    .update(ticket.ticket_id, patch, agent_actor)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let unchanged = f.store.get_ticket(ticket.ticket_id).await.unwrap().unwrap();
  assert_eq!(unchanged.priority, ticket.priority);
  assert_eq!(unchanged.updated_at, ticket.updated_at);
  // Only the creation entry exists.
  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn manager_update_always_fails() {
  let f = fixture().await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), actor(Role::User))
    .await
    .unwrap();

  let patch = TicketPatch {
    status: Some(Status::Resolved),
    ..Default::default()
  };
  let err = f
    .service
    .update(ticket.ticket_id, patch, actor(Role::Manager))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn status_change_logs_exactly_one_diff_entry() {
  let f = fixture().await;
  let admin = actor(Role::Admin);
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), actor(Role::User))
    .await
    .unwrap();

  let patch = TicketPatch {
    status: Some(Status::InProgress),
    ..Default::default()
  };
  let updated = f
    .service
    .update(ticket.ticket_id, patch, admin)
    .await
    .unwrap();
  assert_eq!(updated.status, Status::InProgress);

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  let status_logs: Vec<_> = logs
    .iter()
    .filter(|l| l.action == LogAction::StatusUpdated)
    .collect();
  assert_eq!(status_logs.len(), 1);
  assert_eq!(
    status_logs[0].old_value,
    Some(json!({ "status": "Open" }))
  );
  assert_eq!(
    status_logs[0].new_value,
    Some(json!({ "status": "In Progress" }))
  );
}

#[tokio::test]
async fn user_closes_own_ticket_with_a_single_status_entry() {
  let f = fixture().await;
  let creator = actor(Role::User);
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), creator)
    .await
    .unwrap();

  let patch = TicketPatch {
    status: Some(Status::Closed),
    ..Default::default()
  };
  let updated = f
    .service
    .update(ticket.ticket_id, patch, creator)
    .await
    .unwrap();
  assert_eq!(updated.status, Status::Closed);

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  assert_eq!(logs[0].action, LogAction::StatusUpdated);
  let diff = logs[0].new_value.as_ref().unwrap();
  assert_eq!(diff, &json!({ "status": "Closed" }));
  assert!(diff.get("priority").is_none());
  assert!(diff.get("department").is_none());
}

#[tokio::test]
async fn admin_reassignment_auto_advances_open_tickets() {
  let f = fixture().await;
  let agent = seed_agent(&f.store, Department::It).await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::GeneralInquiry), actor(Role::User))
    .await
    .unwrap();
  assert_eq!(ticket.status, Status::Open);

  let patch = TicketPatch {
    assigned_to: Some(agent.worker_id),
    ..Default::default()
  };
  let updated = f
    .service
    .update(ticket.ticket_id, patch, actor(Role::Admin))
    .await
    .unwrap();

  assert_eq!(updated.status, Status::InProgress);
  assert_eq!(updated.assigned_to, Some(agent.worker_id));

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  assert!(logs.iter().any(|l| l.action == LogAction::TicketAssigned));
  assert!(logs.iter().any(|l| l.action == LogAction::StatusUpdated));

  // The new assignee was notified.
  let notifications = f.sink.notifications.lock().unwrap();
  assert!(notifications
    .iter()
    .any(|(to, msg, _)| *to == agent.worker_id && msg.contains("assigned")));
}

#[tokio::test]
async fn explicit_status_wins_over_auto_advance() {
  let f = fixture().await;
  let agent = seed_agent(&f.store, Department::It).await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::GeneralInquiry), actor(Role::User))
    .await
    .unwrap();

  let patch = TicketPatch {
    assigned_to: Some(agent.worker_id),
    status: Some(Status::WaitingForCustomer),
    ..Default::default()
  };
  let updated = f
    .service
    .update(ticket.ticket_id, patch, actor(Role::Admin))
    .await
    .unwrap();
  assert_eq!(updated.status, Status::WaitingForCustomer);
}

#[tokio::test]
async fn update_of_missing_ticket_is_not_found() {
  let f = fixture().await;
  let err = f
    .service
    .update(Uuid::new_v4(), TicketPatch::default(), actor(Role::Admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TicketNotFound(_)));
}

// ─── Deletion, listing, history ──────────────────────────────────────────────

#[tokio::test]
async fn only_admin_tier_may_delete() {
  let f = fixture().await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), actor(Role::User))
    .await
    .unwrap();

  for role in [Role::User, Role::Agent, Role::Manager] {
    let err = f
      .service
      .delete(ticket.ticket_id, actor(role))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "{role}");
  }

  f.service
    .delete(ticket.ticket_id, actor(Role::SuperAdmin))
    .await
    .unwrap();
  assert!(f.store.get_ticket(ticket.ticket_id).await.unwrap().is_none());
}

#[tokio::test]
async fn users_list_only_their_own_tickets() {
  let f = fixture().await;
  let alice = actor(Role::User);
  let bob = actor(Role::User);
  f.service
    .create(new_ticket(TicketType::Incident), alice)
    .await
    .unwrap();
  f.service
    .create(new_ticket(TicketType::Incident), bob)
    .await
    .unwrap();

  let mine = f
    .service
    .list(alice, TicketFilters::default())
    .await
    .unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].created_by, alice.actor_id);

  let everything = f
    .service
    .list(actor(Role::Manager), TicketFilters::default())
    .await
    .unwrap();
  assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn history_is_staff_only() {
  let f = fixture().await;
  let creator = actor(Role::User);
  let ticket = f
    .service
    .create(new_ticket(TicketType::Incident), creator)
    .await
    .unwrap();

  let err = f
    .service
    .history(ticket.ticket_id, creator)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let logs = f
    .service
    .history(ticket.ticket_id, actor(Role::Agent))
    .await
    .unwrap();
  assert_eq!(logs.len(), 1);
}

// ─── SLA monitor ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn critical_ticket_escalates_then_breaches_on_schedule() {
  let f = fixture().await;
  let agent = seed_agent(&f.store, Department::It).await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::AccessIssue), actor(Role::User))
    .await
    .unwrap();
  assert_eq!(ticket.assigned_to, Some(agent.worker_id));

  // Five minutes past the escalation threshold (T0 + 3h05m for Critical).
  let escalation_time = ticket.escalation_due_at + Duration::minutes(5);
  let report = f.monitor.run_once_at(escalation_time).await.unwrap();
  assert_eq!(report.escalated, 1);
  assert_eq!(report.breached, 0);

  let after = f.store.get_ticket(ticket.ticket_id).await.unwrap().unwrap();
  assert!(after.is_escalated);
  assert!(!after.is_sla_breached);

  // Five minutes past the hard deadline (T0 + 4h05m).
  let breach_time = ticket.sla_due_at + Duration::minutes(5);
  let report = f.monitor.run_once_at(breach_time).await.unwrap();
  assert_eq!(report.breached, 1);

  let after = f.store.get_ticket(ticket.ticket_id).await.unwrap().unwrap();
  assert!(after.is_sla_breached);
  assert_eq!(after.sla_breached_at, Some(breach_time));

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  let actions: Vec<LogAction> = logs.iter().map(|l| l.action).collect();
  assert!(actions.contains(&LogAction::SlaEscalation));
  assert!(actions.contains(&LogAction::SlaBreached));
  // System entries carry no performer.
  assert!(logs
    .iter()
    .filter(|l| l.action != LogAction::TicketCreated)
    .all(|l| l.performed_by.is_none()));

  // The assignee heard about both, and ops got two emails.
  let notifications = f.sink.notifications.lock().unwrap();
  assert!(notifications
    .iter()
    .any(|(to, msg, _)| *to == agent.worker_id && msg.contains("Escalated")));
  assert!(notifications
    .iter()
    .any(|(to, msg, _)| *to == agent.worker_id && msg.contains("BREACHED")));
  let emails = f.sink.emails.lock().unwrap();
  assert_eq!(
    emails
      .iter()
      .filter(|(to, _)| to == "ops@example.com")
      .count(),
    2
  );
}

#[tokio::test]
async fn sweep_is_idempotent_without_time_advancing() {
  let f = fixture().await;
  let ticket = f
    .service
    .create(new_ticket(TicketType::AccessIssue), actor(Role::User))
    .await
    .unwrap();

  let later = ticket.sla_due_at + Duration::minutes(5);
  let first = f.monitor.run_once_at(later).await.unwrap();
  // Both thresholds have passed: the escalation pass runs first, then the
  // breach pass picks the ticket up in the same sweep.
  assert_eq!(first.escalated, 1);
  assert_eq!(first.breached, 1);

  let second = f.monitor.run_once_at(later).await.unwrap();
  assert_eq!(second.escalated, 0);
  assert_eq!(second.breached, 0);

  let logs = f.store.logs_for_ticket(ticket.ticket_id).await.unwrap();
  let breach_entries = logs
    .iter()
    .filter(|l| l.action == LogAction::SlaBreached)
    .count();
  assert_eq!(breach_entries, 1);
}

#[tokio::test]
async fn resolved_tickets_never_escalate() {
  let f = fixture().await;
  let creator = actor(Role::User);
  let ticket = f
    .service
    .create(new_ticket(TicketType::AccessIssue), creator)
    .await
    .unwrap();

  let patch = TicketPatch {
    status: Some(Status::Resolved),
    ..Default::default()
  };
  f.service
    .update(ticket.ticket_id, patch, actor(Role::Admin))
    .await
    .unwrap();

  let later = ticket.sla_due_at + Duration::hours(1);
  let report = f.monitor.run_once_at(later).await.unwrap();
  assert_eq!(report.escalated, 0);
  assert_eq!(report.breached, 0);
}
