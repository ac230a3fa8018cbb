use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Json,
};

use devflow_actions::user;
use devflow_common::params::{ListUsersParams, SaveProfileParams};
use devflow_store::Store;

use super::reply;
use crate::auth::MaybeActor;
use crate::AppState;

pub async fn index<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListUsersParams>,
) -> Response {
    reply(user::list_users(&state.store, params).await, StatusCode::OK)
}

pub async fn save_me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Json(params): Json<SaveProfileParams>,
) -> Response {
    let resp = user::save_profile(&state.store, actor.actor(), params).await;
    reply(resp, StatusCode::OK)
}
