use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use pulso_types::api::Claims;
use pulso_types::models::User;

use crate::error::RpcError;
use crate::state::{AppState, SESSION_COOKIE};

/// Records the one response side effect a procedure can request: expiring
/// the session cookie. The transport applies it after the handler returns.
#[derive(Clone, Default)]
pub struct SessionHandle {
    clear: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.clear.store(true, Ordering::SeqCst);
    }

    pub fn clear_requested(&self) -> bool {
        self.clear.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct RequestCtx {
    pub state: AppState,
    pub user: Option<User>,
    pub session: SessionHandle,
}

impl RequestCtx {
    pub fn new(state: AppState, user: Option<User>) -> Self {
        Self {
            state,
            user,
            session: SessionHandle::new(),
        }
    }

    /// The resolved user. Dispatch has already enforced the Protected tier;
    /// this is the handler-side witness.
    pub fn user(&self) -> Result<&User, RpcError> {
        self.user.as_ref().ok_or(RpcError::Unauthorized)
    }
}

/// Resolve the per-request context: session cookie → claims → user row.
/// Any failure along the way resolves to an anonymous context rather than
/// an error, so public procedures keep working.
pub async fn build_context(state: AppState, jar: &CookieJar) -> RequestCtx {
    let user = match jar.get(SESSION_COOKIE) {
        Some(cookie) => resolve_user(&state, cookie.value()).await,
        None => None,
    };
    RequestCtx::new(state, user)
}

async fn resolve_user(state: &AppState, token: &str) -> Option<User> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    );

    let claims = match decoded {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("session token rejected: {e}");
            return None;
        }
    };

    state.store.get_user_by_open_id(&claims.sub).await
}

/// Sign a session token for an external identity. Called by whatever
/// issues sessions (the OAuth callback lives outside this crate).
pub fn create_session_token(secret: &str, open_id: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: open_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;
    use pulso_db::{Database, Store};
    use pulso_llm::{Chatbot, ChatbotConfig};
    use pulso_types::models::UserUpsert;
    use crate::state::AppStateInner;

    fn state() -> AppState {
        Arc::new(AppStateInner {
            store: Store::connected(Database::open_in_memory().unwrap(), None),
            chatbot: Chatbot::new(ChatbotConfig {
                api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
                api_key: None,
                model: "test-model".to_string(),
            }),
            jwt_secret: "test-secret".to_string(),
        })
    }

    #[tokio::test]
    async fn session_cookie_resolves_user() {
        let state = state();
        state
            .store
            .upsert_user(UserUpsert::new("open-77"))
            .await
            .unwrap();

        let token = create_session_token(&state.jwt_secret, "open-77").unwrap();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, token));

        let ctx = build_context(state, &jar).await;
        assert_eq!(ctx.user.unwrap().open_id, "open-77");
    }

    #[tokio::test]
    async fn bad_token_resolves_to_anonymous() {
        let state = state();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not-a-jwt"));

        let ctx = build_context(state.clone(), &jar).await;
        assert!(ctx.user.is_none());

        // Valid token for an unknown identity is also anonymous.
        let token = create_session_token(&state.jwt_secret, "ghost").unwrap();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, token));
        let ctx = build_context(state, &jar).await;
        assert!(ctx.user.is_none());
    }

    #[tokio::test]
    async fn missing_cookie_resolves_to_anonymous() {
        let ctx = build_context(state(), &CookieJar::new()).await;
        assert!(ctx.user.is_none());
    }
}
