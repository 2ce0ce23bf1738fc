//! Handlers for `/tickets` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/tickets` | Role-scoped listing; optional `status`, `priority`, `assigned_to` filters |
//! | `POST`   | `/tickets` | Body: [`NewTicket`]; returns 201 + the created ticket |
//! | `GET`    | `/tickets/:id` | Single ticket; users may only read their own |
//! | `PUT`    | `/tickets/:id` | Body: [`TicketPatch`]; guarded by role |
//! | `DELETE` | `/tickets/:id` | Admin tier only; cascades the audit log |
//! | `GET`    | `/tickets/:id/history` | Audit trail, newest first; staff only |
//!
//! Every route requires the trusted identity headers (see
//! [`actor`](crate::actor)).

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use desk_core::{
  log::TicketLog,
  store::{NotificationSink, TicketStore, WorkerDirectory},
  ticket::{NewTicket, Priority, Status, Ticket, TicketPatch},
};
use desk_engine::{TicketFilters, TicketService};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::ExtractActor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub assigned_to: Option<Uuid>,
}

/// `GET /tickets[?status=...][&priority=...][&assigned_to=...]`
pub async fn list<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  let filters = TicketFilters {
    status:      params.status,
    priority:    params.priority,
    assigned_to: params.assigned_to,
  };
  Ok(Json(service.list(actor, filters).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /tickets` — returns 201 + the created [`Ticket`].
pub async fn create<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Json(body): Json<NewTicket>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  let ticket = service.create(body, actor).await?;
  Ok((StatusCode::CREATED, Json(ticket)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /tickets/:id`
pub async fn get_one<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  Ok(Json(service.get(id, actor).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /tickets/:id` — body is a [`TicketPatch`]; returns the refreshed
/// record.
pub async fn update<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Path(id): Path<Uuid>,
  Json(body): Json<TicketPatch>,
) -> Result<Json<Ticket>, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  Ok(Json(service.update(id, body, actor).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /tickets/:id` — 204 on success.
pub async fn delete_one<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  service.delete(id, actor).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── History ─────────────────────────────────────────────────────────────────

/// `GET /tickets/:id/history` — the audit trail, newest first.
pub async fn history<S, D, N>(
  State(service): State<TicketService<S, D, N>>,
  ExtractActor(actor): ExtractActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TicketLog>>, ApiError>
where
  S: TicketStore,
  D: WorkerDirectory,
  N: NotificationSink,
{
  Ok(Json(service.history(id, actor).await?))
}
