use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use devflow_actions::question;
use devflow_common::params::{AskQuestionParams, EditQuestionParams};
use devflow_store::Store;

use super::reply;
use crate::auth::MaybeActor;
use crate::AppState;

#[derive(Deserialize)]
pub struct EditQuestionRequest {
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Json(params): Json<AskQuestionParams>,
) -> Response {
    let resp = question::create_question(&state.store, actor.actor(), params).await;
    reply(resp, StatusCode::CREATED)
}

pub async fn show<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Response {
    reply(question::get_question(&state.store, id).await, StatusCode::OK)
}

pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    actor: MaybeActor,
    Path(id): Path<Uuid>,
    Json(body): Json<EditQuestionRequest>,
) -> Response {
    let params = EditQuestionParams {
        question_id: id,
        title: body.title,
        content: body.content,
        tags: body.tags,
    };
    let resp = question::edit_question(&state.store, actor.actor(), params).await;
    reply(resp, StatusCode::OK)
}

pub async fn view<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Response {
    reply(question::increment_views(&state.store, id).await, StatusCode::OK)
}
