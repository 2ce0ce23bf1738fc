//! [`SqliteStore`] — the SQLite implementation of
//! [`TicketStore`] and [`WorkerDirectory`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use desk_core::{
  actor::{Department, Worker},
  log::{NewLogEntry, TicketLog},
  store::{TicketQuery, TicketStore, Visibility, WorkerDirectory},
  ticket::Ticket,
};

use crate::{
  Error, Result,
  encode::{RawLog, RawTicket, RawWorker, encode_attachments, encode_dt, encode_uuid},
  schema::SCHEMA,
};

const TICKET_COLUMNS: &str = "ticket_id, subject, description, ticket_type, \
   status, priority, department, created_by, assigned_to, sla_due_at, \
   escalation_due_at, is_escalated, is_sla_breached, sla_breached_at, \
   attachments, created_at, updated_at";

fn raw_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTicket> {
  Ok(RawTicket {
    ticket_id:         row.get(0)?,
    subject:           row.get(1)?,
    description:       row.get(2)?,
    ticket_type:       row.get(3)?,
    status:            row.get(4)?,
    priority:          row.get(5)?,
    department:        row.get(6)?,
    created_by:        row.get(7)?,
    assigned_to:       row.get(8)?,
    sla_due_at:        row.get(9)?,
    escalation_due_at: row.get(10)?,
    is_escalated:      row.get(11)?,
    is_sla_breached:   row.get(12)?,
    sla_breached_at:   row.get(13)?,
    attachments:       row.get(14)?,
    created_at:        row.get(15)?,
    updated_at:        row.get(16)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ticket store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace a directory entry. The worker directory is mirrored
  /// from the identity collaborator; this is the sync entry point.
  pub async fn put_worker(&self, worker: Worker) -> Result<()> {
    let id_str = encode_uuid(worker.worker_id);
    let role = worker.role.as_str().to_owned();
    let department = worker.department.as_str().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO workers
             (worker_id, name, email, role, department, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            worker.name,
            worker.email,
            role,
            department,
            worker.active,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select_tickets(
    &self,
    where_clause: String,
    params: Vec<String>,
  ) -> Result<Vec<Ticket>> {
    let raws: Vec<RawTicket> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {TICKET_COLUMNS} FROM tickets \
           WHERE {where_clause} ORDER BY created_at DESC, rowid DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), raw_ticket)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicket::into_ticket).collect()
  }
}

// ─── TicketStore impl ────────────────────────────────────────────────────────

impl TicketStore for SqliteStore {
  type Error = Error;

  // ── Tickets ────────────────────────────────────────────────────────────────

  async fn insert_ticket(&self, ticket: Ticket) -> Result<()> {
    let ticket_id_str   = encode_uuid(ticket.ticket_id);
    let ticket_type     = ticket.ticket_type.as_str().to_owned();
    let status          = ticket.status.as_str().to_owned();
    let priority        = ticket.priority.as_str().to_owned();
    let department      = ticket.department.as_str().to_owned();
    let created_by_str  = encode_uuid(ticket.created_by);
    let assigned_to_str = ticket.assigned_to.map(encode_uuid);
    let sla_due_str     = encode_dt(ticket.sla_due_at);
    let escalation_str  = encode_dt(ticket.escalation_due_at);
    let breached_at_str = ticket.sla_breached_at.map(encode_dt);
    let attachments_str = encode_attachments(&ticket.attachments)?;
    let created_at_str  = encode_dt(ticket.created_at);
    let updated_at_str  = encode_dt(ticket.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tickets (
             ticket_id, subject, description, ticket_type, status, priority,
             department, created_by, assigned_to, sla_due_at,
             escalation_due_at, is_escalated, is_sla_breached,
             sla_breached_at, attachments, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17)",
          rusqlite::params![
            ticket_id_str,
            ticket.subject,
            ticket.description,
            ticket_type,
            status,
            priority,
            department,
            created_by_str,
            assigned_to_str,
            sla_due_str,
            escalation_str,
            ticket.is_escalated,
            ticket.is_sla_breached,
            breached_at_str,
            attachments_str,
            created_at_str,
            updated_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTicket> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"
              ),
              rusqlite::params![id_str],
              raw_ticket,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTicket::into_ticket).transpose()
  }

  async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    match query.visibility {
      Visibility::Everything => {}
      Visibility::CreatedBy(creator) => {
        conditions.push("created_by = ?".into());
        params.push(encode_uuid(creator));
      }
      Visibility::AgentScope {
        worker_id,
        department,
      } => {
        conditions.push(
          "(assigned_to = ? OR (assigned_to IS NULL AND department = ?))"
            .into(),
        );
        params.push(encode_uuid(worker_id));
        params.push(department.as_str().to_owned());
      }
    }
    if let Some(status) = query.status {
      conditions.push("status = ?".into());
      params.push(status.as_str().to_owned());
    }
    if let Some(priority) = query.priority {
      conditions.push("priority = ?".into());
      params.push(priority.as_str().to_owned());
    }
    if let Some(assignee) = query.assigned_to {
      conditions.push("assigned_to = ?".into());
      params.push(encode_uuid(assignee));
    }

    let where_clause = if conditions.is_empty() {
      "1=1".to_owned()
    } else {
      conditions.join(" AND ")
    };

    self.select_tickets(where_clause, params).await
  }

  async fn update_ticket(
    &self,
    ticket: Ticket,
    expected_updated_at: DateTime<Utc>,
  ) -> Result<bool> {
    let ticket_id_str   = encode_uuid(ticket.ticket_id);
    let ticket_type     = ticket.ticket_type.as_str().to_owned();
    let status          = ticket.status.as_str().to_owned();
    let priority        = ticket.priority.as_str().to_owned();
    let department      = ticket.department.as_str().to_owned();
    let assigned_to_str = ticket.assigned_to.map(encode_uuid);
    let breached_at_str = ticket.sla_breached_at.map(encode_dt);
    let attachments_str = encode_attachments(&ticket.attachments)?;
    let updated_at_str  = encode_dt(ticket.updated_at);
    let expected_str    = encode_dt(expected_updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE tickets SET
             subject = ?1, description = ?2, ticket_type = ?3, status = ?4,
             priority = ?5, department = ?6, assigned_to = ?7,
             is_escalated = ?8, is_sla_breached = ?9, sla_breached_at = ?10,
             attachments = ?11, updated_at = ?12
           WHERE ticket_id = ?13 AND updated_at = ?14",
          rusqlite::params![
            ticket.subject,
            ticket.description,
            ticket_type,
            status,
            priority,
            department,
            assigned_to_str,
            ticket.is_escalated,
            ticket.is_sla_breached,
            breached_at_str,
            attachments_str,
            updated_at_str,
            ticket_id_str,
            expected_str,
          ],
        )?;
        Ok(changed)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn delete_ticket(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        // Explicit application-level cascade: logs go with their ticket,
        // in one transaction.
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM ticket_logs WHERE ticket_id = ?1",
          rusqlite::params![id_str],
        )?;
        let deleted = tx.execute(
          "DELETE FROM tickets WHERE ticket_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    Ok(deleted == 1)
  }

  // ── Audit log — append-only ────────────────────────────────────────────────

  async fn append_log(&self, entry: NewLogEntry) -> Result<TicketLog> {
    let log = TicketLog {
      log_id:       Uuid::new_v4(),
      ticket_id:    entry.ticket_id,
      action:       entry.action,
      performed_by: entry.performed_by,
      old_value:    entry.old_value,
      new_value:    entry.new_value,
      details:      entry.details,
      created_at:   Utc::now(),
    };

    let log_id_str       = encode_uuid(log.log_id);
    let ticket_id_str    = encode_uuid(log.ticket_id);
    let action           = log.action.as_str().to_owned();
    let performed_by_str = log.performed_by.map(encode_uuid);
    let old_value_str    = log
      .old_value
      .as_ref()
      .map(serde_json::to_string)
      .transpose()?;
    let new_value_str    = log
      .new_value
      .as_ref()
      .map(serde_json::to_string)
      .transpose()?;
    let details          = log.details.clone();
    let created_at_str   = encode_dt(log.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ticket_logs (
             log_id, ticket_id, action, performed_by,
             old_value, new_value, details, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            log_id_str,
            ticket_id_str,
            action,
            performed_by_str,
            old_value_str,
            new_value_str,
            details,
            created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(log)
  }

  async fn logs_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<TicketLog>> {
    let id_str = encode_uuid(ticket_id);

    let raws: Vec<RawLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT log_id, ticket_id, action, performed_by,
                  old_value, new_value, details, created_at
           FROM ticket_logs WHERE ticket_id = ?1
           ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawLog {
              log_id:       row.get(0)?,
              ticket_id:    row.get(1)?,
              action:       row.get(2)?,
              performed_by: row.get(3)?,
              old_value:    row.get(4)?,
              new_value:    row.get(5)?,
              details:      row.get(6)?,
              created_at:   row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLog::into_log).collect()
  }

  // ── SLA sweep support ──────────────────────────────────────────────────────

  async fn tickets_due_for_escalation(
    &self,
    now: DateTime<Utc>,
  ) -> Result<Vec<Ticket>> {
    self
      .select_tickets(
        "escalation_due_at <= ? \
         AND status NOT IN ('Resolved', 'Closed') \
         AND is_escalated = 0 AND is_sla_breached = 0"
          .into(),
        vec![encode_dt(now)],
      )
      .await
  }

  async fn tickets_due_for_breach(
    &self,
    now: DateTime<Utc>,
  ) -> Result<Vec<Ticket>> {
    self
      .select_tickets(
        "sla_due_at <= ? \
         AND status NOT IN ('Resolved', 'Closed') \
         AND is_sla_breached = 0"
          .into(),
        vec![encode_dt(now)],
      )
      .await
  }

  async fn mark_escalated(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(id);
    let now_str = encode_dt(now);

    let changed = self
      .conn
      .call(move |conn| {
        // Conditional write: only applies while the sweep predicate still
        // matches, which makes the pass idempotent per ticket.
        let changed = conn.execute(
          "UPDATE tickets SET is_escalated = 1, updated_at = ?1
           WHERE ticket_id = ?2
             AND is_escalated = 0 AND is_sla_breached = 0
             AND status NOT IN ('Resolved', 'Closed')",
          rusqlite::params![now_str, id_str],
        )?;
        Ok(changed)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn mark_breached(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(id);
    let now_str = encode_dt(now);

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE tickets SET
             is_sla_breached = 1, sla_breached_at = ?1, updated_at = ?1
           WHERE ticket_id = ?2
             AND is_sla_breached = 0
             AND status NOT IN ('Resolved', 'Closed')",
          rusqlite::params![now_str, id_str],
        )?;
        Ok(changed)
      })
      .await?;

    Ok(changed == 1)
  }
}

// ─── WorkerDirectory impl ────────────────────────────────────────────────────

impl WorkerDirectory for SqliteStore {
  type Error = Error;

  async fn find_active_agents(
    &self,
    department: Department,
  ) -> Result<Vec<Worker>> {
    let department_str = department.as_str().to_owned();

    let raws: Vec<RawWorker> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT worker_id, name, email, role, department, active
           FROM workers
           WHERE role = 'agent' AND department = ?1 AND active = 1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![department_str], |row| {
            Ok(RawWorker {
              worker_id:  row.get(0)?,
              name:       row.get(1)?,
              email:      row.get(2)?,
              role:       row.get(3)?,
              department: row.get(4)?,
              active:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawWorker::into_worker).collect()
  }

  async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawWorker> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT worker_id, name, email, role, department, active
               FROM workers WHERE worker_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawWorker {
                  worker_id:  row.get(0)?,
                  name:       row.get(1)?,
                  email:      row.get(2)?,
                  role:       row.get(3)?,
                  department: row.get(4)?,
                  active:     row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWorker::into_worker).transpose()
  }
}
