//! Notification sink for the reference deployment.
//!
//! Outbound delivery (email gateway, push service) lives outside this
//! process; this sink records every would-be delivery in the structured log
//! so the external forwarder can be wired in without touching the engine.

use std::convert::Infallible;

use desk_core::store::{NotificationSink, Severity};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
  type Error = Infallible;

  async fn notify(
    &self,
    recipient: Uuid,
    message: String,
    severity: Severity,
    ticket_id: Option<Uuid>,
  ) -> Result<(), Infallible> {
    tracing::info!(
      %recipient,
      ?severity,
      ticket_id = ?ticket_id,
      message,
      "notification"
    );
    Ok(())
  }

  async fn send_email(
    &self,
    to: String,
    subject: String,
    _html: String,
  ) -> Result<(), Infallible> {
    tracing::info!(to, subject, "outbound email");
    Ok(())
  }
}
