//! Assignment resolver — picks a worker for a ticket.
//!
//! Auto-assignment draws uniformly at random from the active agents of the
//! target department. An empty department is not an error: the ticket is
//! simply left unassigned and the gap is logged.

use desk_core::{
  Error, Result,
  actor::{Department, Worker},
  store::WorkerDirectory,
};
use rand::seq::SliceRandom as _;
use uuid::Uuid;

/// Validate an explicitly requested assignee: the target must exist in the
/// directory and be an active agent.
pub async fn validate_assignee<D>(directory: &D, assignee: Uuid) -> Result<Worker>
where
  D: WorkerDirectory,
{
  let worker = directory
    .get_worker(assignee)
    .await
    .map_err(Error::store)?
    .ok_or(Error::WorkerNotFound(assignee))?;

  if !worker.is_assignable() {
    return Err(Error::InvalidAssignee(assignee));
  }
  Ok(worker)
}

/// Pick an assignee for a new ticket in `department`, uniformly at random
/// among its active agents. Returns `None` when the department has none.
pub async fn auto_assign<D>(
  directory: &D,
  department: Department,
) -> Result<Option<Uuid>>
where
  D: WorkerDirectory,
{
  let agents = directory
    .find_active_agents(department)
    .await
    .map_err(Error::store)?;

  let picked = agents.choose(&mut rand::thread_rng());
  match picked {
    Some(agent) => Ok(Some(agent.worker_id)),
    None => {
      tracing::info!(%department, "no active agents; ticket left unassigned");
      Ok(None)
    }
  }
}
