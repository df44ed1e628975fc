use anyhow::{Context, Result};

/// Environment-driven configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path to the SQLite database. When unset the server runs with
    /// storage disabled and every operation degrades to its empty default.
    pub db_path: Option<String>,
    /// External identity auto-promoted to admin on first sign-in.
    pub owner_open_id: Option<String>,
    pub jwt_secret: String,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("PULSO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("PULSO_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("PULSO_PORT is not a valid port number")?;

        Ok(Self {
            host,
            port,
            db_path: std::env::var("PULSO_DB_PATH").ok(),
            owner_open_id: std::env::var("PULSO_OWNER_OPEN_ID").ok(),
            jwt_secret: std::env::var("PULSO_JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            llm_api_url: std::env::var("PULSO_LLM_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            llm_api_key: std::env::var("PULSO_LLM_API_KEY").ok(),
            llm_model: std::env::var("PULSO_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
        })
    }
}
