//! SLA monitor — the recurring sweep over overdue tickets.
//!
//! Each run makes two passes: escalation (warning threshold passed) and
//! breach (hard deadline passed). Both are idempotent per ticket: the
//! conditional `mark_*` store operations only apply while the boolean guard
//! is still clear, so a ticket is escalated and breached at most once no
//! matter how often a run repeats. A ticket may be escalated and later
//! breached, never the reverse.
//!
//! One run is logically single-threaded: a `Mutex` serialises runs so an
//! externally triggered `run_once` cannot overlap the scheduled cadence.
//! Per-ticket failures are logged and skipped; the selection predicate still
//! matches on the next tick, which is the retry.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use desk_core::{
  Error, Result,
  log::{LogAction, NewLogEntry},
  store::{NotificationSink, Severity, TicketStore},
  ticket::Ticket,
};
use serde_json::json;
use tokio::sync::watch;

// ─── Monitor ─────────────────────────────────────────────────────────────────

/// Outcome counts for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub escalated: usize,
  pub breached:  usize,
}

pub struct SlaMonitor<S, N> {
  store:     Arc<S>,
  sink:      Arc<N>,
  /// Fixed operations mailbox notified about every escalation and breach.
  ops_email: String,
  run_lock:  tokio::sync::Mutex<()>,
}

impl<S, N> SlaMonitor<S, N>
where
  S: TicketStore + 'static,
  N: NotificationSink + 'static,
{
  pub fn new(store: Arc<S>, sink: Arc<N>, ops_email: impl Into<String>) -> Self {
    Self {
      store,
      sink,
      ops_email: ops_email.into(),
      run_lock: tokio::sync::Mutex::new(()),
    }
  }

  /// One sweep at the current wall-clock time — the entry point a periodic
  /// task host invokes.
  pub async fn run_once(&self) -> Result<SweepReport> {
    self.run_once_at(Utc::now()).await
  }

  /// One sweep evaluated at `now`. Runs are serialised; a concurrent caller
  /// waits for the in-flight sweep to finish.
  pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
    let _guard = self.run_lock.lock().await;
    let mut report = SweepReport::default();

    // Escalation pass.
    let due = self
      .store
      .tickets_due_for_escalation(now)
      .await
      .map_err(Error::store)?;
    for ticket in due {
      match self.escalate(&ticket, now).await {
        Ok(true) => report.escalated += 1,
        Ok(false) => {} // already handled by an earlier run
        Err(e) => {
          tracing::error!(ticket_id = %ticket.ticket_id, error = %e,
            "escalation failed; will retry next sweep");
        }
      }
    }

    // Breach pass.
    let due = self
      .store
      .tickets_due_for_breach(now)
      .await
      .map_err(Error::store)?;
    for ticket in due {
      match self.breach(&ticket, now).await {
        Ok(true) => report.breached += 1,
        Ok(false) => {}
        Err(e) => {
          tracing::error!(ticket_id = %ticket.ticket_id, error = %e,
            "breach marking failed; will retry next sweep");
        }
      }
    }

    tracing::debug!(escalated = report.escalated, breached = report.breached,
      "SLA sweep complete");
    Ok(report)
  }

  async fn escalate(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<bool> {
    let applied = self
      .store
      .mark_escalated(ticket.ticket_id, now)
      .await
      .map_err(Error::store)?;
    if !applied {
      return Ok(false);
    }

    tracing::warn!(ticket_id = %ticket.ticket_id, "ticket escalated (SLA warning)");
    self
      .append_log_best_effort(
        NewLogEntry::new(ticket.ticket_id, LogAction::SlaEscalation)
          .new_value(json!({ "is_escalated": true }))
          .details(
            "Ticket automatically escalated due to approaching SLA deadline.",
          ),
      )
      .await;

    if let Some(assignee) = ticket.assigned_to {
      self
        .notify_quietly(
          assignee,
          format!("URGENT: Ticket #{} Escalated (SLA Warning)", ticket.ticket_id),
          Severity::Warning,
          ticket.ticket_id,
        )
        .await;
    }
    self
      .email_ops(
        format!("URGENT: Ticket #{} Escalated", ticket.ticket_id),
        format!(
          "<p>Ticket #{} is approaching its SLA deadline.</p>",
          ticket.ticket_id
        ),
      )
      .await;

    Ok(true)
  }

  async fn breach(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<bool> {
    let applied = self
      .store
      .mark_breached(ticket.ticket_id, now)
      .await
      .map_err(Error::store)?;
    if !applied {
      return Ok(false);
    }

    tracing::warn!(ticket_id = %ticket.ticket_id, "ticket SLA breached");
    self
      .append_log_best_effort(
        NewLogEntry::new(ticket.ticket_id, LogAction::SlaBreached)
          .new_value(json!({ "is_sla_breached": true }))
          .details("SLA deadline missed."),
      )
      .await;

    if let Some(assignee) = ticket.assigned_to {
      self
        .notify_quietly(
          assignee,
          format!("SLA BREACHED: Ticket #{}", ticket.ticket_id),
          Severity::Error,
          ticket.ticket_id,
        )
        .await;
    }
    self
      .email_ops(
        format!("SLA BREACH: Ticket #{}", ticket.ticket_id),
        format!(
          "<p>Ticket #{} has missed its SLA deadline.</p>",
          ticket.ticket_id
        ),
      )
      .await;

    Ok(true)
  }

  async fn append_log_best_effort(&self, entry: NewLogEntry) {
    let ticket_id = entry.ticket_id;
    let action = entry.action;
    if let Err(e) = self.store.append_log(entry).await {
      tracing::error!(%ticket_id, %action, error = %e, "audit log append failed");
    }
  }

  async fn notify_quietly(
    &self,
    recipient: uuid::Uuid,
    message: String,
    severity: Severity,
    ticket_id: uuid::Uuid,
  ) {
    if let Err(e) = self
      .sink
      .notify(recipient, message, severity, Some(ticket_id))
      .await
    {
      tracing::warn!(%recipient, error = %e, "notification delivery failed");
    }
  }

  async fn email_ops(&self, subject: String, html: String) {
    if let Err(e) = self
      .sink
      .send_email(self.ops_email.clone(), subject, html)
      .await
    {
      tracing::warn!(error = %e, "operations email delivery failed");
    }
  }
}

// ─── Scheduling ──────────────────────────────────────────────────────────────

/// Handle for the background sweep task; dropping it does not stop the task,
/// call [`stop`](MonitorHandle::stop) during shutdown.
pub struct MonitorHandle {
  shutdown: watch::Sender<bool>,
  task:     tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
  /// Signal the sweep loop to exit and wait for it.
  pub async fn stop(self) {
    let _ = self.shutdown.send(true);
    let _ = self.task.await;
  }
}

impl<S, N> SlaMonitor<S, N>
where
  S: TicketStore + 'static,
  N: NotificationSink + 'static,
{
  /// Start the recurring sweep on its own task, one run every `cadence`.
  /// A run that outlasts the cadence is logged as a warning; the next tick
  /// then fires immediately rather than stacking up.
  pub fn start(self: Arc<Self>, cadence: Duration) -> MonitorHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(cadence);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      tracing::info!(cadence_secs = cadence.as_secs(), "SLA monitor started");

      loop {
        tokio::select! {
          _ = ticker.tick() => {
            let started = tokio::time::Instant::now();
            if let Err(e) = self.run_once().await {
              tracing::error!(error = %e, "SLA sweep failed");
            }
            let elapsed = started.elapsed();
            if elapsed > cadence {
              tracing::warn!(elapsed_secs = elapsed.as_secs(),
                cadence_secs = cadence.as_secs(),
                "SLA sweep outlasted its cadence");
            }
          }
          _ = shutdown_rx.changed() => {
            tracing::info!("SLA monitor stopping");
            break;
          }
        }
      }
    });

    MonitorHandle { shutdown, task }
  }
}
