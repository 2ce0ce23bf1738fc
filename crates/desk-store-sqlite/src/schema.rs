//! SQL schema for the helpdesk SQLite store.
//!
//! Executed at every connection startup; idempotent via `IF NOT EXISTS`.
//! The `PRAGMA user_version` stamp at the end exists so future migrations
//! can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id         TEXT PRIMARY KEY,
    subject           TEXT NOT NULL,
    description       TEXT NOT NULL,
    ticket_type       TEXT NOT NULL,
    status            TEXT NOT NULL,
    priority          TEXT NOT NULL,
    department        TEXT NOT NULL,
    created_by        TEXT NOT NULL,
    assigned_to       TEXT,
    sla_due_at        TEXT NOT NULL,   -- RFC 3339 UTC, fixed-width nanos
    escalation_due_at TEXT NOT NULL,
    is_escalated      INTEGER NOT NULL DEFAULT 0,
    is_sla_breached   INTEGER NOT NULL DEFAULT 0,
    sla_breached_at   TEXT,
    attachments       TEXT NOT NULL DEFAULT '[]',  -- JSON array, opaque
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL    -- optimistic concurrency token
);

-- Log entries are strictly append-only while their ticket lives.
-- No UPDATE is ever issued against this table; the only DELETE is the
-- explicit cascade when a ticket is removed.
CREATE TABLE IF NOT EXISTS ticket_logs (
    log_id       TEXT PRIMARY KEY,
    ticket_id    TEXT NOT NULL REFERENCES tickets(ticket_id),
    action       TEXT NOT NULL,
    performed_by TEXT,                -- NULL for system entries (SLA monitor)
    old_value    TEXT,                -- JSON, changed fields only
    new_value    TEXT,                -- JSON, changed fields only
    details      TEXT,
    created_at   TEXT NOT NULL
);

-- Mirror of the identity collaborator's directory; the engine only reads
-- role, department, active, and the contact fields for notifications.
CREATE TABLE IF NOT EXISTS workers (
    worker_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL,
    role       TEXT NOT NULL,
    department TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS tickets_status_idx      ON tickets(status);
CREATE INDEX IF NOT EXISTS tickets_priority_idx    ON tickets(priority);
CREATE INDEX IF NOT EXISTS tickets_assignee_idx    ON tickets(assigned_to);
CREATE INDEX IF NOT EXISTS tickets_created_idx     ON tickets(created_at);
CREATE INDEX IF NOT EXISTS tickets_escalation_idx  ON tickets(escalation_due_at);
CREATE INDEX IF NOT EXISTS tickets_sla_due_idx     ON tickets(sla_due_at);
CREATE INDEX IF NOT EXISTS logs_ticket_idx         ON ticket_logs(ticket_id, created_at);
CREATE INDEX IF NOT EXISTS workers_department_idx  ON workers(department, role, active);

PRAGMA user_version = 1;
";
