use std::env;

pub const DEFAULT_AI_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_AI_MODEL: &str = "deepseek-chat";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,
    pub db_max_connections: u32,

    // Auth
    pub jwt_secret: String,

    // AI provider (OpenAI-compatible)
    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub ai_model: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            jwt_secret: required_env("JWT_SECRET"),
            ai_api_key: env::var("AI_API_KEY").ok().filter(|k| !k.is_empty()),
            ai_base_url: env::var("AI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_AI_BASE_URL.to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }

    /// Log which optional integrations are configured, without values.
    pub fn log_summary(&self) {
        tracing::info!(
            web = %self.bind_addr(),
            db_max_connections = self.db_max_connections,
            ai_enabled = self.ai_api_key.is_some(),
            ai_model = %self.ai_model,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
