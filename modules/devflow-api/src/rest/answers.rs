use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use devflow_actions::answer;
use devflow_common::params::{CreateAnswerParams, ListAnswersParams};
use devflow_store::Store;

use super::reply;
use crate::auth::MaybeActor;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateAnswerRequest {
    content: String,
}

pub async fn index<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListAnswersParams>,
) -> Response {
    reply(answer::list_answers(&state.store, id, params).await, StatusCode::OK)
}

pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateAnswerRequest>,
) -> Response {
    let params = CreateAnswerParams {
        question_id: id,
        content: body.content,
    };
    let resp = answer::create_answer(&state.store, actor.actor(), params).await;
    reply(resp, StatusCode::CREATED)
}
