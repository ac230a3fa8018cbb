use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Json, Response},
};
use uuid::Uuid;

use devflow_actions::vote;
use devflow_common::params::CastVoteParams;
use devflow_common::types::{TargetKind, VoteTarget};
use devflow_store::Store;

use super::reply;
use crate::auth::MaybeActor;
use crate::AppState;

pub async fn cast<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Json(params): Json<CastVoteParams>,
) -> Response {
    reply(vote::cast_vote(&state.store, actor.actor(), params).await, StatusCode::OK)
}

pub async fn show<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Path((target_kind, id)): Path<(TargetKind, Uuid)>,
) -> Response {
    let target = VoteTarget::new(target_kind, id);
    reply(vote::vote_state(&state.store, actor.actor(), target).await, StatusCode::OK)
}
