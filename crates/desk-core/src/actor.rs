//! Actors and workers — the identities that operate on tickets.
//!
//! Authentication happens upstream; the engine receives an [`Actor`] that is
//! already verified and trusts its role and department.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organisational routing key used for auto-assignment and visibility scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
  #[serde(rename = "IT")]
  It,
  #[serde(rename = "HR")]
  Hr,
  Sales,
  Support,
  Finance,
  General,
  Global,
}

impl Department {
  pub fn as_str(self) -> &'static str {
    match self {
      Department::It => "IT",
      Department::Hr => "HR",
      Department::Sales => "Sales",
      Department::Support => "Support",
      Department::Finance => "Finance",
      Department::General => "General",
      Department::Global => "Global",
    }
  }
}

impl std::fmt::Display for Department {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Role held by an actor or worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
  User,
  Agent,
  Manager,
  Admin,
  SuperAdmin,
}

impl Role {
  /// Admin-tier roles may set priority, assignment, and department, and may
  /// delete tickets.
  pub fn is_admin_tier(self) -> bool {
    matches!(self, Role::Admin | Role::SuperAdmin)
  }

  /// Staff roles (agent and above) may read ticket history.
  pub fn is_staff(self) -> bool {
    !matches!(self, Role::User)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Agent => "agent",
      Role::Manager => "manager",
      Role::Admin => "admin",
      Role::SuperAdmin => "super-admin",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id:   Uuid,
  pub role:       Role,
  pub department: Department,
}

/// A directory entry for a helpdesk worker (or end user). The engine only
/// needs role, department, and the active flag; name and email feed the
/// notification sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
  pub worker_id:  Uuid,
  pub name:       String,
  pub email:      String,
  pub role:       Role,
  pub department: Department,
  pub active:     bool,
}

impl Worker {
  /// Only active agents are valid assignment targets.
  pub fn is_assignable(&self) -> bool {
    self.active && self.role == Role::Agent
  }
}
