//! Observability: request logging, request ids and the user span field.

use {
    super::{auth::AuthContext, router::Gateway},
    crate::utils::RequestIdGenerator,
    axum::{body::Body, extract::Request, middleware::Next, response::Response},
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::{
        request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
        trace::TraceLayer,
    },
    tracing::Span,
};

/// Records the authenticated user id in the `user` field of the request span.
pub(crate) async fn record_user_to_span(request: Request<Body>, next: Next) -> Response {
    if let Some(user) = request
        .extensions()
        .get::<AuthContext>()
        .and_then(AuthContext::user_id)
    {
        Span::current().record("user", user);
    }

    next.run(request).await
}

impl Gateway {
    /// Logs every request at INFO with its method and path, and its completion with
    /// status and latency. Each request runs inside an `http_request` span carrying
    /// the request id and, once known, the user id.
    #[must_use]
    pub fn setup_logging(mut self) -> Self {
        self.inner = self.inner.layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                        user = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    tracing::info!("{} {}", request.method(), request.uri());
                })
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "finished processing request"
                    );
                }),
        );
        self
    }

    /// Keeps an incoming `x-request-id` or generates a UUIDv7, and echoes it on
    /// the response.
    #[must_use]
    pub fn setup_request_id(mut self) -> Self {
        self.inner = self.inner.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(RequestIdGenerator))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );
        self
    }

    /// Fills the `user` span field from the [`AuthContext`]. Must sit inside the
    /// auth stage.
    #[must_use]
    pub fn setup_user_span(mut self) -> Self {
        self.inner = self
            .inner
            .layer(axum::middleware::from_fn(record_user_to_span));
        self
    }
}
