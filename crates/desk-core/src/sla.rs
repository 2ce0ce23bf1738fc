//! SLA clock and type routing — pure policy functions.
//!
//! No side effects, no errors. The policy table maps priority to a hard
//! breach deadline and an earlier escalation threshold; the routing table
//! maps ticket type to the default department and priority used when the
//! creator does not (or may not) choose them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  actor::Department,
  ticket::{Priority, TicketType},
};

/// The pair of deadlines attached to a ticket at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaClock {
  pub sla_due_at:        DateTime<Utc>,
  pub escalation_due_at: DateTime<Utc>,
}

/// Hours until breach and hours before breach to escalate, by priority.
fn policy(priority: Priority) -> (i64, i64) {
  match priority {
    Priority::Critical => (4, 1),
    Priority::High => (8, 2),
    Priority::Medium => (24, 4),
    Priority::Low => (48, 6),
  }
}

/// Compute the SLA deadlines for a ticket created at `now`.
///
/// Invariant: `escalation_due_at < sla_due_at` for every priority.
pub fn compute_sla(priority: Priority, now: DateTime<Utc>) -> SlaClock {
  let (hours_to_breach, escalation_lead_hours) = policy(priority);
  let sla_due_at = now + Duration::hours(hours_to_breach);
  SlaClock {
    sla_due_at,
    escalation_due_at: sla_due_at - Duration::hours(escalation_lead_hours),
  }
}

/// Default (department, priority) for a ticket type.
pub fn route_for_type(ticket_type: TicketType) -> (Department, Priority) {
  match ticket_type {
    TicketType::BillingIssue => (Department::Finance, Priority::Medium),
    TicketType::TechnicalSupport => (Department::It, Priority::High),
    TicketType::AccessIssue => (Department::It, Priority::Critical),
    TicketType::FeatureRequest => (Department::It, Priority::Low),
    TicketType::GeneralInquiry => (Department::Support, Priority::Low),
    TicketType::Incident => (Department::Support, Priority::Medium),
    TicketType::ServiceRequest => (Department::Support, Priority::Medium),
  }
}
