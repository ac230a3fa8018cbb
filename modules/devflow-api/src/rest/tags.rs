use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;

use devflow_actions::tag;
use devflow_common::params::{ListTagsParams, PageParams};
use devflow_store::Store;

use super::reply;
use crate::AppState;

pub async fn index<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListTagsParams>,
) -> Response {
    reply(tag::list_tags(&state.store, params).await, StatusCode::OK)
}

pub async fn questions<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Response {
    reply(tag::tag_questions(&state.store, id, params).await, StatusCode::OK)
}
