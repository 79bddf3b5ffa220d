//! HTTP service
//!
//! Axum router with every route behind the session binder, plus the
//! optional background sweep of expired sessions.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use eyre::{Context, Result};
use sessionstore::SessionStore;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::analysis::{ComplianceAnalyzer, ContractExtractor};
use crate::config::Config;

pub mod binder;
mod error;
mod handlers;

pub use binder::{SESSION_COOKIE, SessionId};
pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub extractor: ContractExtractor,
    pub analyzer: ComplianceAnalyzer,
}

/// Build the application router
pub fn router(state: AppState, body_limit: usize) -> Router {
    debug!(%body_limit, "router: called");
    Router::new()
        .route("/", get(handlers::index))
        .route("/version", get(handlers::version))
        .route("/health", get(handlers::health))
        .route("/upload_contract", post(handlers::upload_contract))
        .route("/upload_tasks", post(handlers::upload_tasks))
        .route("/analyze_tasks", get(handlers::analyze_tasks).post(handlers::analyze_tasks))
        .layer(from_fn_with_state(state.clone(), binder::bind_session))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    if let Some(every) = config.session.sweep_interval() {
        spawn_sweeper(state.sessions.clone(), every);
    }

    let app = router(state, config.server.body_limit_bytes());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Server error")?;
    Ok(())
}

fn spawn_sweeper(sessions: Arc<SessionStore>, every: std::time::Duration) {
    info!(interval_secs = every.as_secs(), "Starting expired-session sweep");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sessions.purge_expired();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClient;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use axum::body::{Body, to_bytes};
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use sessionstore::TokenCodec;
    use tower::ServiceExt;

    const CONTRACT_JSON: &str = r#"{"title": "Travel Policy", "definitions": {},
        "sections": [{"title": "1. Travel", "terms": [{"title": "1.1 Cap", "content": "Max $3,000."}], "subsections": []}]}"#;

    fn state_with(client: Arc<dyn LlmClient>) -> AppState {
        let prompts = Arc::new(PromptLoader::embedded_only());
        AppState {
            sessions: Arc::new(SessionStore::new(TokenCodec::new("test-secret").unwrap())),
            extractor: ContractExtractor::new(client.clone(), prompts.clone()),
            analyzer: ComplianceAnalyzer::new(client, prompts),
        }
    }

    fn multipart(filename: &str, content: &str) -> (String, String) {
        let boundary = "X-CONTRACTCHECK-BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = filename,
            c = content
        );
        (format!("multipart/form-data; boundary={}", boundary), body)
    }

    fn upload(uri: &str, cookie: Option<&str>, filename: &str, content: &str) -> Request<Body> {
        let (content_type, body) = multipart(filename, content);
        let mut builder = Request::post(uri).header(CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn session_cookie(response: &axum::response::Response) -> Option<String> {
        response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_new_visitor_gets_cookie() {
        let app = router(state_with(Arc::new(MockLlmClient::new(vec![]))), 1024 * 1024);

        let response = app.oneshot(Request::get("/version").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("session_id=session."));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=1800"));
    }

    #[tokio::test]
    async fn test_known_cookie_is_reused_and_not_resent() {
        let state = state_with(Arc::new(MockLlmClient::new(vec![])));
        let app = router(state.clone(), 1024 * 1024);

        let first = app.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        let cookie = session_cookie(&first).unwrap();

        let second = app
            .oneshot(Request::get("/health").header(COOKIE, &cookie).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(second.headers().get(SET_COOKIE).is_none());
        assert_eq!(json_body(second).await["sessions"], 1);
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_forged_cookie_is_replaced() {
        let app = router(state_with(Arc::new(MockLlmClient::new(vec![]))), 1024 * 1024);
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(COOKIE, "session_id=session.AAAA.AAAA.AAAA")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let cookie = session_cookie(&response).unwrap();
        assert_ne!(cookie, "session_id=session.AAAA.AAAA.AAAA");
    }

    #[tokio::test]
    async fn test_analyze_requires_uploads() {
        let app = router(state_with(Arc::new(MockLlmClient::new(vec![]))), 1024 * 1024);
        let response = app
            .oneshot(Request::post("/analyze_tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].as_str().unwrap().contains("No contract"));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let state = state_with(Arc::new(MockLlmClient::new(vec![])));
        let app = router(state.clone(), 1024 * 1024);

        let response = app.oneshot(upload("/upload_tasks", None, "tasks.pdf", "x")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let cookie = session_cookie(&response).unwrap();
        let token = cookie.trim_start_matches("session_id=");
        assert!(state.sessions.get(token).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_extraction_is_422() {
        let client = Arc::new(MockLlmClient::texts(&["not json", "still not json"]));
        let app = router(state_with(client), 1024 * 1024);

        let response = app
            .oneshot(upload("/upload_contract", None, "contract.txt", "Travel is capped."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_contract_stores_terms() {
        let state = state_with(Arc::new(MockLlmClient::texts(&[CONTRACT_JSON])));
        let app = router(state.clone(), 1024 * 1024);

        let response = app
            .oneshot(upload("/upload_contract", None, "policy.txt", "Travel is capped at $3,000."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = session_cookie(&response).unwrap();
        let body = json_body(response).await;
        assert_eq!(body["contract_filename"], "policy.txt");
        assert_eq!(body["contract"]["title"], "Travel Policy");

        let data = state.sessions.get(cookie.trim_start_matches("session_id="));
        assert_eq!(data["contract_json"]["sections"][0]["title"], "1. Travel");
    }
}
