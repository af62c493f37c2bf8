//! Failure control: panic recovery and the global error handler.

use {
    super::router::Gateway,
    crate::{Environment, Error, ErrorReport, ErrorResponse},
    axum::{
        Json,
        extract::{Request, State},
        middleware::{self, Next},
        response::{IntoResponse, Response},
    },
    http::{StatusCode, header},
    tower_http::catch_panic::CatchPanicLayer,
};

/// Renders failures of the inner stages.
///
/// Responses built from a server-side [`Error`] are logged at ERROR and replaced by
/// a `500 {error, message}` body whose message is redacted in production. Client
/// errors are the deliberate answers of their stages and pass through. Headers set
/// by inner layers (CORS, request id) are kept.
pub(crate) async fn handle_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if !report.is_server_error() {
        tracing::debug!(kind = %report.kind, status = report.status.as_u16(), "{}", report.message);
        return response;
    }

    tracing::error!(kind = %report.kind, status = report.status.as_u16(), "Global error: {}", report.message);

    let (parts, _body) = response.into_parts();
    let mut rendered = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::server_error(&report.message, environment)),
    )
        .into_response();

    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
    rendered.extensions_mut().insert(report);
    rendered
}

/// Turns a panic payload into the message reported for it.
pub(crate) fn panic_message(err: &(dyn std::any::Any + Send + 'static)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        format!("Service panicked: {s}")
    } else if let Some(s) = err.downcast_ref::<&str>() {
        format!("Service panicked: {s}")
    } else {
        "Service panicked with a non-string payload".to_string()
    }
}

impl Gateway {
    /// Converts panics of inner stages and handlers into `Internal` errors so the
    /// global error handler can render them. The server keeps running.
    #[must_use]
    pub fn setup_catch_panic(mut self) -> Self {
        let panic_channel = self.panic_channel.clone();
        self.inner = self.inner.layer(CatchPanicLayer::custom(
            move |err: Box<dyn std::any::Any + Send + 'static>| {
                let msg = panic_message(err.as_ref());
                if let Some(ch) = &panic_channel {
                    ch.try_send(msg.clone()).ok();
                }
                Error::internal(msg).into_response()
            },
        ));
        self
    }

    /// Installs the global error handler, which renders server-side failures as 500.
    #[must_use]
    pub fn setup_error_handler(mut self) -> Self {
        let environment = self.state.environment;
        self.inner = self
            .inner
            .layer(middleware::from_fn_with_state(environment, handle_errors));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "Service panicked: owned");

        let borrowed: Box<dyn std::any::Any + Send> = Box::new("borrowed");
        assert_eq!(panic_message(borrowed.as_ref()), "Service panicked: borrowed");

        let other: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert!(panic_message(other.as_ref()).contains("non-string"));
    }
}
