use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;

use devflow_actions::collection;
use devflow_store::Store;

use super::reply;
use crate::auth::MaybeActor;
use crate::AppState;

pub async fn toggle<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Path(id): Path<Uuid>,
) -> Response {
    let resp = collection::toggle_save_question(&state.store, actor.actor(), id).await;
    reply(resp, StatusCode::OK)
}

pub async fn show<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Path(id): Path<Uuid>,
) -> Response {
    let resp = collection::has_saved_question(&state.store, actor.actor(), id).await;
    reply(resp, StatusCode::OK)
}
