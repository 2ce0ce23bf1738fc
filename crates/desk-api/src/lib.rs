//! JSON REST API for the helpdesk ticket engine.
//!
//! Exposes an axum [`Router`] backed by a
//! [`TicketService`](desk_engine::TicketService). Authentication happens
//! upstream: a trusted gateway verifies the session and forwards the actor's
//! identity in headers (see [`actor`]). TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", desk_api::api_router(service.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod tickets;

use axum::{
  Router,
  routing::get,
};
use desk_core::store::{NotificationSink, TicketStore, WorkerDirectory};
use desk_engine::TicketService;

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D, N>(service: TicketService<S, D, N>) -> Router<()>
where
  S: TicketStore + 'static,
  D: WorkerDirectory + 'static,
  N: NotificationSink + 'static,
{
  Router::new()
    .route(
      "/tickets",
      get(tickets::list::<S, D, N>).post(tickets::create::<S, D, N>),
    )
    .route(
      "/tickets/{id}",
      get(tickets::get_one::<S, D, N>)
        .put(tickets::update::<S, D, N>)
        .delete(tickets::delete_one::<S, D, N>),
    )
    .route("/tickets/{id}/history", get(tickets::history::<S, D, N>))
    .with_state(service)
}
