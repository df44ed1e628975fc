use std::sync::Arc;

use pulso_db::Store;
use pulso_llm::Chatbot;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub chatbot: Chatbot,
    pub jwt_secret: String,
}

/// Name of the session cookie carrying the signed claims.
pub const SESSION_COOKIE: &str = "pulso_session";
