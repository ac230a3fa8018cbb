use tracing::info;
use uuid::Uuid;

use devflow_common::types::{Actor, SavedState};
use devflow_common::{ActionResponse, DevflowError};
use devflow_store::{CollectionRepo, QuestionRepo, Store, UnitOfWork};

use crate::{require_actor, respond, settle};

/// Save the question to the actor's collection, or remove it if already saved.
pub async fn toggle_save_question<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    question_id: Uuid,
) -> ActionResponse<SavedState> {
    respond(
        "toggle_save_question",
        toggle_save_inner(store, actor, question_id).await,
    )
}

async fn toggle_save_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    question_id: Uuid,
) -> Result<SavedState, DevflowError> {
    let actor = require_actor(actor)?;

    let mut tx = store.begin().await?;
    let result = toggle(&mut tx, actor, question_id).await;
    let state = settle(tx, result).await?;

    info!(user_id = %actor.user_id, %question_id, saved = state.saved, "Collection updated");
    Ok(state)
}

async fn toggle<U: UnitOfWork>(
    tx: &mut U,
    actor: &Actor,
    question_id: Uuid,
) -> Result<SavedState, DevflowError> {
    if tx.find_question(question_id).await?.is_none() {
        return Err(DevflowError::NotFound("Question"));
    }

    match tx.find_saved(actor.user_id, question_id).await? {
        Some(entry) => {
            tx.delete_saved(entry.id).await?;
            Ok(SavedState { saved: false })
        }
        None => {
            tx.insert_saved(actor.user_id, question_id).await?;
            Ok(SavedState { saved: true })
        }
    }
}

pub async fn has_saved_question<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    question_id: Uuid,
) -> ActionResponse<SavedState> {
    respond(
        "has_saved_question",
        has_saved_inner(store, actor, question_id).await,
    )
}

async fn has_saved_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    question_id: Uuid,
) -> Result<SavedState, DevflowError> {
    let actor = require_actor(actor)?;

    let mut tx = store.begin().await?;
    let result = tx
        .find_saved(actor.user_id, question_id)
        .await
        .map_err(DevflowError::from);
    let entry = settle(tx, result).await?;

    Ok(SavedState {
        saved: entry.is_some(),
    })
}
