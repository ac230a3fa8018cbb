use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Json, Response},
};

use devflow_actions::ai;
use devflow_common::params::AiAnswerParams;

use super::reply;
use crate::AppState;

pub async fn suggest<S: Send + Sync>(
    State(state): State<Arc<AppState<S>>>,
    Json(params): Json<AiAnswerParams>,
) -> Response {
    reply(ai::ai_answer(state.ai.as_deref(), params).await, StatusCode::OK)
}
