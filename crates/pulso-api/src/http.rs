//! HTTP transport for the procedure registry.
//!
//! One route, `/api/rpc/{procedure}`, keyed by dotted operation name.
//! Mutations are POST-only; queries also accept GET with the JSON input in
//! an `input` query parameter. The body of a POST is the input itself.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::Value;

use crate::context::build_context;
use crate::error::RpcError;
use crate::registry::{ProcedureKind, ProcedureRegistry};
use crate::state::{AppState, SESSION_COOKIE};

#[derive(Clone)]
pub struct RpcState {
    pub app: AppState,
    pub registry: Arc<ProcedureRegistry>,
}

pub fn rpc_router(app: AppState, registry: Arc<ProcedureRegistry>) -> Router {
    Router::new()
        .route("/api/rpc/{procedure}", get(handle_get).post(handle_post))
        .with_state(RpcState { app, registry })
}

async fn handle_get(
    State(rpc): State<RpcState>,
    Path(procedure): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    match rpc.registry.get(&procedure) {
        Some(p) if p.kind() == ProcedureKind::Query => {}
        Some(_) => return method_not_allowed(),
        None => return RpcError::NotFound(procedure).into_response(),
    }

    let input = match params.get("input") {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                return RpcError::Validation(format!("input is not valid JSON: {e}"))
                    .into_response();
            }
        },
        None => Value::Null,
    };

    run(rpc, procedure, jar, input).await
}

async fn handle_post(
    State(rpc): State<RpcState>,
    Path(procedure): Path<String>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    if rpc.registry.get(&procedure).is_none() {
        return RpcError::NotFound(procedure).into_response();
    }

    let input = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => value,
            Err(e) => {
                return RpcError::Validation(format!("body is not valid JSON: {e}"))
                    .into_response();
            }
        }
    };

    run(rpc, procedure, jar, input).await
}

async fn run(rpc: RpcState, procedure: String, jar: CookieJar, input: Value) -> Response {
    let ctx = build_context(rpc.app.clone(), &jar).await;
    let session = ctx.session.clone();

    match rpc.registry.dispatch(&procedure, ctx, input).await {
        Ok(value) => {
            let jar = if session.clear_requested() {
                let mut expired = Cookie::from(SESSION_COOKIE);
                expired.set_path("/");
                jar.remove(expired)
            } else {
                jar
            };
            (jar, Json(value)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({
            "error": {
                "code": "METHOD_NOT_SUPPORTED",
                "message": "mutations must use POST",
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use pulso_db::{Database, Store};
    use pulso_llm::{Chatbot, ChatbotConfig};
    use pulso_types::models::UserUpsert;

    use crate::context::create_session_token;
    use crate::procedures;
    use crate::state::AppStateInner;

    fn rpc_state() -> RpcState {
        let app: AppState = Arc::new(AppStateInner {
            store: Store::connected(Database::open_in_memory().unwrap(), None),
            chatbot: Chatbot::new(ChatbotConfig {
                api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
                api_key: None,
                model: "test-model".to_string(),
            }),
            jwt_secret: "test-secret".to_string(),
        });
        RpcState {
            app,
            registry: Arc::new(procedures::registry().unwrap()),
        }
    }

    async fn session_jar(rpc: &RpcState, open_id: &str) -> CookieJar {
        rpc.app
            .store
            .upsert_user(UserUpsert::new(open_id))
            .await
            .unwrap();
        let token = create_session_token(&rpc.app.jwt_secret, open_id).unwrap();
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, token))
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let rpc = rpc_state();
        let jar = session_jar(&rpc, "leaver").await;

        let response = handle_post(
            State(rpc),
            Path("auth.logout".to_string()),
            jar,
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("logout must set a removal cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn anonymous_protected_call_is_401() {
        let rpc = rpc_state();

        let response = handle_post(
            State(rpc),
            Path("auth.logout".to_string()),
            CookieJar::new(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_procedure_is_404() {
        let rpc = rpc_state();

        let response = handle_post(
            State(rpc),
            Path("no.such.op".to_string()),
            CookieJar::new(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mutations_reject_get() {
        let rpc = rpc_state();

        let response = handle_get(
            State(rpc),
            Path("analytics.recordView".to_string()),
            Query(HashMap::new()),
            CookieJar::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn queries_accept_get_with_input_parameter() {
        let rpc = rpc_state();

        let mut params = HashMap::new();
        params.insert("input".to_string(), r#"{"articleId": 1}"#.to_string());

        let response = handle_get(
            State(rpc),
            Path("likes.count".to_string()),
            Query(params),
            CookieJar::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let rpc = rpc_state();

        let response = handle_post(
            State(rpc),
            Path("analytics.recordView".to_string()),
            CookieJar::new(),
            Bytes::from_static(b"{not json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
