//! Dispatch table, built-in handlers and the catch-all.

use {
    super::{
        auth::AuthContext,
        router::{Gateway, GatewayState},
    },
    crate::{DatabaseState, ErrorResponse},
    axum::{
        Json, Router,
        body::Body,
        extract::{Request, State},
        response::{IntoResponse, Response},
        routing::get,
    },
    http::{Method, StatusCode, header},
    serde_json::{Value, json},
    std::time::SystemTime,
    tower::ServiceExt,
};

pub const EVENTS_PREFIX: &str = "/api/inngest";
pub const CHAT_PREFIX: &str = "/api/chat";
pub const SESSIONS_PREFIX: &str = "/api/sessions";

/// Every built-in route and forwarded prefix, as listed in 404 responses.
pub const AVAILABLE_ROUTES: [&str; 7] = [
    "/",
    "/api/health",
    "/api/test",
    "/api/test-protected",
    EVENTS_PREFIX,
    CHAT_PREFIX,
    SESSIONS_PREFIX,
];

async fn root(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "message": "Talent Quotient API is Running",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "environment": state.environment,
    }))
}

/// Always 200; the data store state is reported, not enforced. A store that does
/// not answer within `http.health_check_timeout` is reported unreachable.
async fn health(State(state): State<GatewayState>) -> Json<Value> {
    let database = tokio::time::timeout(state.health_check_timeout, state.store.state())
        .await
        .unwrap_or_else(|_| {
            tracing::warn!(
                store = state.store.name(),
                "Data store did not answer within {:?}",
                state.health_check_timeout
            );
            DatabaseState::Unreachable
        });
    Json(json!({
        "status": "OK",
        "environment": state.environment,
        "timestamp": humantime::format_rfc3339_millis(SystemTime::now()).to_string(),
        "database": database,
    }))
}

async fn test_open() -> Json<Value> {
    Json(json!({ "message": "API is working without auth" }))
}

/// Reports what the auth stage found. Enforces nothing.
async fn test_protected(auth: AuthContext) -> Json<Value> {
    Json(json!({
        "message": "Protected route is working",
        "hasAuthHeader": auth.credential_present,
        "authenticated": auth.is_authenticated(),
        "userId": auth.user_id(),
    }))
}

pub(crate) fn not_found(method: &Method, uri: &http::Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {method} {target} not found"),
            "availableRoutes": AVAILABLE_ROUTES,
        })),
    )
        .into_response()
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Catch-all: the frontend bundle for page navigations in production, 404 otherwise.
async fn fallback(State(state): State<GatewayState>, request: Request) -> Response {
    let serves_frontend = matches!(*request.method(), Method::GET | Method::HEAD)
        && !is_api_path(request.uri().path());

    match state.frontend {
        Some(frontend) if serves_frontend => {
            let (method, uri) = (request.method().clone(), request.uri().clone());
            let Ok(response) = frontend.files.oneshot(request).await;
            if response.status() == StatusCode::NOT_FOUND {
                return not_found(&method, &uri);
            }

            let mut response = response.map(Body::new);
            if let Some(cache_control) = frontend.cache_control
                && response.status().is_success()
            {
                response
                    .headers_mut()
                    .entry(header::CACHE_CONTROL)
                    .or_insert(cache_control);
            }
            response
        }
        _ => not_found(request.method(), request.uri()),
    }
}

/// Stand-in for a collaborator that the embedding code did not supply.
fn unconfigured(name: &'static str) -> Router {
    Router::new().fallback(move || async move {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::from_status(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{name} is not configured"),
            )),
        )
    })
}

impl Gateway {
    /// Builds the dispatch table: collaborators under their prefixes, the built-in
    /// handlers, and the catch-all. Built-in paths requested with another method than
    /// GET/HEAD fall through to the catch-all.
    #[must_use]
    pub fn setup_routes(mut self) -> Self {
        let collaborators = std::mem::take(&mut self.collaborators);
        let events = collaborators
            .events
            .unwrap_or_else(|| unconfigured("Event endpoint"));
        let chat = collaborators
            .chat
            .unwrap_or_else(|| unconfigured("Chat routes"));
        let sessions = collaborators
            .sessions
            .unwrap_or_else(|| unconfigured("Session routes"));

        let builtins: Router<GatewayState> = Router::new()
            .route("/", get(root).fallback(fallback))
            .route("/api/health", get(health).fallback(fallback))
            .route("/api/test", get(test_open).fallback(fallback))
            .route("/api/test-protected", get(test_protected).fallback(fallback))
            .nest_service(EVENTS_PREFIX, events)
            .nest_service(CHAT_PREFIX, chat)
            .nest_service(SESSIONS_PREFIX, sessions)
            .fallback(fallback);

        self.inner = self.inner.merge(builtins.with_state(self.state.clone()));
        self
    }
}
