use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use devflow_actions::{AnswerGenerator, ChatAnswerGenerator};
use devflow_api::{build_router, jwt::JwtService, jwt::ISSUER, AppState};
use devflow_common::Config;
use devflow_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devflow=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_summary();

    let store = PgStore::connect(&config.database_url, config.db_max_connections).await?;
    store.migrate().await?;

    let ai = config.ai_api_key.as_ref().map(|key| {
        let model = OpenAi::new(key.clone(), config.ai_model.clone())
            .with_base_url(config.ai_base_url.clone());
        Arc::new(ChatAnswerGenerator::new(model)) as Arc<dyn AnswerGenerator>
    });
    if ai.is_none() {
        info!("AI_API_KEY not set, answer suggestions disabled");
    }

    let state = Arc::new(AppState {
        store,
        jwt: JwtService::new(&config.jwt_secret, ISSUER),
        ai,
    });
    let app = build_router(state);

    let addr = config.bind_addr();
    info!("Devflow API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
