//! Axum-based HTTP gateway: registration, credential check, protected page.
//!
//! Every protected route re-authenticates from the request's own
//! `Authorization` header. There is no session state, so a request either
//! carries valid credentials or receives a `401` challenge naming the
//! expected scheme and realm. Body limits and timeouts are enforced as
//! router layers.

pub mod page;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{self, AuthError, Authenticator, CredentialStore, Identity, RegisterError};
use crate::auth::store::SqliteCredentialStore;
use crate::config::Config;

/// Maximum request body size (16KB) — registration payloads are tiny.
pub const MAX_BODY_SIZE: usize = 16_384;
/// Request timeout (30s) to prevent slow-loris abuse.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub authenticator: Arc<Authenticator>,
    /// Realm string announced in `WWW-Authenticate` challenges.
    pub realm: Arc<str>,
    /// Whether new identity registration is allowed.
    pub allow_registration: bool,
    /// Maximum registered identities (0 = unlimited).
    pub max_users: u64,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: &Config) -> Self {
        Self {
            authenticator: Arc::new(Authenticator::new(store.clone())),
            store,
            realm: Arc::from(config.server.realm.as_str()),
            allow_registration: config.auth.allow_registration,
            max_users: config.auth.max_users,
        }
    }
}

/// True for bind addresses reachable from outside the local host.
fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1")
}

/// Run the HTTP gateway.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;

    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(&host) && !config.server.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host} — the API would be exposed to the internet.\n\
             Fix: use --host 127.0.0.1 (default), or set\n\
             [server] allow_public_bind = true in config.toml (NOT recommended)."
        );
    }

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::open(&db_path)?);
    tracing::info!("credential store initialized at {}", db_path.display());

    let state = AppState::new(store, &config);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_port = listener.local_addr()?.port();

    // ── CORS — allow browser clients from any origin ──
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/", get(handle_index))
        .route("/api/register", post(handle_register))
        .route("/login", get(handle_login))
        .route("/tasks", get(handle_tasks))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)));

    tracing::info!("taskvault API listening on http://{host}:{actual_port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// Concrete return type for JSON handlers (avoids `impl IntoResponse`
/// inference issues).
type ApiResponse = (StatusCode, Json<serde_json::Value>);

/// Request body for identity registration.
#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    secret: String,
}

/// Build the `401` challenge instructing the caller to retry with
/// credentials. One body for every authentication failure.
fn challenge(realm: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            format!("Basic realm=\"{realm}\""),
        )],
        Json(serde_json::json!({"error": "Authentication required"})),
    )
        .into_response()
}

/// Generic internal-failure response; detail goes to the log only.
fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
        .into_response()
}

/// Authenticate the request from its `Authorization` header. Returns the
/// identity, or the full error response to send back.
fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, Response> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.authenticator.authenticate(header_value) {
        Ok(identity) => Ok(identity),
        Err(AuthError::Unauthenticated) => Err(challenge(&state.realm)),
        Err(AuthError::Store(e)) => {
            tracing::error!("credential store failure during authentication: {e}");
            Err(internal_error())
        }
    }
}

/// GET /health — liveness, always public.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET / — index listing the available endpoints.
async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "taskvault API running",
        "endpoints": [
            "POST /api/register",
            "GET /login (Basic Auth)",
            "GET /tasks (Basic Auth)",
        ],
    }))
}

/// POST /api/register — enroll a new identity. No authentication required.
async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<RegisterBody>, axum::extract::rejection::JsonRejection>,
) -> ApiResponse {
    if !state.allow_registration {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Registration is disabled"})),
        );
    }

    // Enforce max_users limit (0 = unlimited)
    if state.max_users > 0 {
        match state.store.count() {
            Ok(count) if count >= state.max_users => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({"error": "Maximum user limit reached"})),
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("credential store failure during registration: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "Internal server error"})),
                );
            }
        }
    }

    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("Invalid request: {e}")})),
            );
        }
    };

    match auth::register(state.store.as_ref(), &body.name, &body.secret) {
        Ok(identity) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "status": "registered",
                "name": identity.name,
                "message": format!("User '{}' registered", identity.name),
            })),
        ),
        Err(RegisterError::BadInput(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": msg})),
        ),
        Err(RegisterError::Conflict(name)) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": format!("User '{name}' already exists")})),
        ),
        Err(RegisterError::Store(e)) => {
            tracing::error!("credential store failure during registration: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
        }
    }
}

/// GET /login — verify credentials; confirms access, issues nothing.
async fn handle_login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_identity(&state, &headers) {
        Ok(identity) => {
            tracing::info!(name = %identity.name, "credentials verified");
            Json(serde_json::json!({
                "status": "ok",
                "message": "Credentials verified",
                "name": identity.name,
                "user_id": identity.id,
            }))
            .into_response()
        }
        Err(response) => response,
    }
}

/// GET /tasks — protected HTML page bound to the authenticated identity.
async fn handle_tasks(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_identity(&state, &headers) {
        Ok(identity) => Html(page::render_tasks_page(&identity.name, &identity.id)).into_response(),
        Err(response) => response,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn test_state() -> AppState {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        AppState {
            authenticator: Arc::new(Authenticator::new(store.clone())),
            store,
            realm: Arc::from("task-manager"),
            allow_registration: true,
            max_users: 0,
        }
    }

    fn basic_headers(name: &str, secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{name}:{secret}")));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    async fn register(state: &AppState, name: &str, secret: &str) -> ApiResponse {
        handle_register(
            State(state.clone()),
            Ok(Json(RegisterBody {
                name: name.to_string(),
                secret: secret.to_string(),
            })),
        )
        .await
    }

    #[test]
    fn public_bind_detection() {
        assert!(!is_public_bind("127.0.0.1"));
        assert!(!is_public_bind("localhost"));
        assert!(!is_public_bind("::1"));
        assert!(is_public_bind("0.0.0.0"));
        assert!(is_public_bind("192.168.1.10"));
    }

    #[test]
    fn challenge_names_scheme_and_realm() {
        let response = challenge("task-manager");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(www, "Basic realm=\"task-manager\"");
    }

    #[tokio::test]
    async fn register_created_then_conflict() {
        let state = test_state();

        let (status, Json(body)) = register(&state, "ana", "s3cr3t").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "ana");

        // Retrying a successful registration yields a conflict, which is
        // correct, not an error to mask.
        let (status, Json(body)) = register(&state, "ana", "different").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("ana"));
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let state = test_state();

        let (status, _) = register(&state, "", "s3cr3t").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = register(&state, "ana", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_respects_gates() {
        let mut state = test_state();
        state.allow_registration = false;
        let (status, _) = register(&state, "ana", "s3cr3t").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut state = test_state();
        state.max_users = 1;
        let (status, _) = register(&state, "ana", "s3cr3t").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = register(&state, "bea", "s3cr3t").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_verifies_credentials() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        let ok = handle_login(State(state.clone()), basic_headers("ana", "s3cr3t")).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let wrong = handle_login(State(state.clone()), basic_headers("ana", "wrong")).await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert!(wrong.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn login_without_header_gets_challenge() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        let response = handle_login(State(state), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_secret_are_indistinguishable() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        let unknown = handle_login(State(state.clone()), basic_headers("ghost", "s3cr3t")).await;
        let wrong = handle_login(State(state.clone()), basic_headers("ana", "wrong")).await;

        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(
            unknown.headers().get(header::WWW_AUTHENTICATE),
            wrong.headers().get(header::WWW_AUTHENTICATE)
        );
        let unknown_body = axum::body::to_bytes(unknown.into_body(), usize::MAX)
            .await
            .unwrap();
        let wrong_body = axum::body::to_bytes(wrong.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(unknown_body, wrong_body);
    }

    #[tokio::test]
    async fn malformed_headers_never_reach_500() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        for raw in ["Basic !!!", "Bearer abc", "Basic", ""] {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, raw.parse().unwrap());
            let response = handle_login(State(state.clone()), headers).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {raw:?}");
        }
    }

    #[tokio::test]
    async fn tasks_page_is_identity_bound() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        let response = handle_tasks(State(state.clone()), basic_headers("ana", "s3cr3t")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("ana"));

        let denied = handle_tasks(State(state), HeaderMap::new()).await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert!(denied.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn login_yields_same_identity_on_every_call() {
        let state = test_state();
        register(&state, "ana", "s3cr3t").await;

        let mut ids = Vec::new();
        for _ in 0..2 {
            let response =
                handle_login(State(state.clone()), basic_headers("ana", "s3cr3t")).await;
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            ids.push(json["user_id"].as_str().unwrap().to_string());
        }
        assert_eq!(ids[0], ids[1]);
    }
}
