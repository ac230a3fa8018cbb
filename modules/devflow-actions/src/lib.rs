//! Server actions for the Q&A site.
//!
//! Every action follows the same shape: validate the params, check the actor,
//! open one unit of work, run the workflow against it, then commit on success
//! or roll back on any error. The outcome is always an [`ActionResponse`].

pub mod ai;
pub mod answer;
pub mod collection;
pub mod question;
pub mod tag;
pub mod user;
pub mod vote;

use tracing::{debug, error, warn};

use devflow_common::{ActionResponse, Actor, DevflowError, ErrorKind};
use devflow_store::UnitOfWork;

pub use ai::{AnswerGenerator, ChatAnswerGenerator};

/// The authenticated actor, or `Unauthorized`.
pub(crate) fn require_actor(actor: Option<&Actor>) -> Result<&Actor, DevflowError> {
    actor.ok_or(DevflowError::Unauthorized)
}

/// End a unit of work: commit if the workflow succeeded, roll back otherwise.
pub(crate) async fn settle<U, T>(tx: U, result: Result<T, DevflowError>) -> Result<T, DevflowError>
where
    U: UnitOfWork,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Log a failed action at a level matching its kind, then wrap the result.
pub(crate) fn respond<T>(action: &'static str, result: Result<T, DevflowError>) -> ActionResponse<T> {
    if let Err(err) = &result {
        log_failure(action, err);
    }
    result.into()
}

/// Like [`respond`] for actions whose success carries no payload.
pub(crate) fn respond_done(action: &'static str, result: Result<(), DevflowError>) -> ActionResponse<()> {
    match result {
        Ok(()) => ActionResponse::done(),
        Err(err) => {
            log_failure(action, &err);
            ActionResponse::failure(&err)
        }
    }
}

fn log_failure(action: &'static str, err: &DevflowError) {
    match err.kind() {
        ErrorKind::Internal => error!(action, error = ?err, "Action failed"),
        _ => debug!(action, error = %err, "Action rejected"),
    }
}
