//! HTTP surface for the Q&A actions.
//!
//! Handlers extract the caller's identity and params, run one action, and map
//! the action result to a status code. The body is always the action result.

pub mod auth;
pub mod jwt;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use devflow_actions::AnswerGenerator;
use devflow_store::Store;

use jwt::JwtService;

pub struct AppState<S> {
    pub store: S,
    pub jwt: JwtService,
    /// `None` when no AI provider is configured.
    pub ai: Option<Arc<dyn AnswerGenerator>>,
}

pub fn build_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(rest::health))
        .route("/api/questions", post(rest::questions::create::<S>))
        .route(
            "/api/questions/{id}",
            get(rest::questions::show::<S>).put(rest::questions::update::<S>),
        )
        .route("/api/questions/{id}/views", post(rest::questions::view::<S>))
        .route(
            "/api/questions/{id}/answers",
            get(rest::answers::index::<S>).post(rest::answers::create::<S>),
        )
        .route("/api/questions/{id}/save", post(rest::collections::toggle::<S>))
        .route("/api/questions/{id}/saved", get(rest::collections::show::<S>))
        .route("/api/votes", post(rest::votes::cast::<S>))
        .route("/api/votes/{target_kind}/{id}", get(rest::votes::show::<S>))
        .route("/api/tags", get(rest::tags::index::<S>))
        .route("/api/tags/{id}/questions", get(rest::tags::questions::<S>))
        .route("/api/users", get(rest::users::index::<S>))
        .route("/api/users/me", put(rest::users::save_me::<S>))
        .route("/api/ai/answers", post(rest::ai::suggest::<S>))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
