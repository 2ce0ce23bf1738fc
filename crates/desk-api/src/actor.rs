//! Trusted-header actor extractor.
//!
//! The engine never authenticates anyone: an upstream gateway verifies the
//! session and forwards the already-authenticated identity in three headers.
//! Requests without a complete, well-formed set are rejected before any
//! handler runs.

use axum::{extract::FromRequestParts, http::request::Parts};
use desk_core::actor::{Actor, Department, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_DEPARTMENT_HEADER: &str = "x-actor-department";

fn parse_role(s: &str) -> Option<Role> {
  match s {
    "user" => Some(Role::User),
    "agent" => Some(Role::Agent),
    "manager" => Some(Role::Manager),
    "admin" => Some(Role::Admin),
    "super-admin" => Some(Role::SuperAdmin),
    _ => None,
  }
}

fn parse_department(s: &str) -> Option<Department> {
  match s {
    "IT" => Some(Department::It),
    "HR" => Some(Department::Hr),
    "Sales" => Some(Department::Sales),
    "Support" => Some(Department::Support),
    "Finance" => Some(Department::Finance),
    "General" => Some(Department::General),
    "Global" => Some(Department::Global),
    _ => None,
  }
}

/// Extractor wrapper; present in a handler means the identity headers were
/// complete and well-formed.
pub struct ExtractActor(pub Actor);

impl<S> FromRequestParts<S> for ExtractActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let header = |name: &str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name}")))
    };

    let actor_id = Uuid::parse_str(header(ACTOR_ID_HEADER)?)
      .map_err(|_| ApiError::Unauthorized("malformed actor id".into()))?;
    let role = parse_role(header(ACTOR_ROLE_HEADER)?)
      .ok_or_else(|| ApiError::Unauthorized("unknown actor role".into()))?;
    let department = parse_department(header(ACTOR_DEPARTMENT_HEADER)?)
      .ok_or_else(|| ApiError::Unauthorized("unknown actor department".into()))?;

    Ok(ExtractActor(Actor {
      actor_id,
      role,
      department,
    }))
  }
}
