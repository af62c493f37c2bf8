//! JSON body stage.

use {
    super::router::Gateway,
    crate::Error,
    axum::{
        body::Body,
        extract::{FromRequestParts, Request, State},
        middleware::{self, Next},
        response::{IntoResponse, Response},
    },
    http::{HeaderMap, header, request::Parts},
    http_body_util::{BodyExt, LengthLimitError, Limited},
    serde_json::Value,
    std::convert::Infallible,
};

/// The parsed JSON body of a request, stored in the request extensions.
///
/// The raw bytes stay available as the request body, so collaborators may use
/// either this value or axum's `Json` extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJson(pub Value);

impl<S: Send + Sync> FromRequestParts<S> for ParsedJson {
    type Rejection = Infallible;

    /// Yields `null` when the request had no JSON body.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ParsedJson>()
            .cloned()
            .unwrap_or(ParsedJson(Value::Null)))
    }
}

/// `application/json` and `application/<anything>+json`, parameters ignored.
pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json"
        || (mime.starts_with("application/") && mime.ends_with("+json"))
}

pub(crate) async fn parse_json_body(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    if !is_json_content_type(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Error::payload_too_large(limit as u64).into_response();
        }
        Err(err) => {
            return Error::invalid_input(format!("Failed to read request body: {err}"))
                .into_response();
        }
    };

    if !bytes.is_empty() {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => {
                parts.extensions.insert(ParsedJson(value));
            }
            Err(err) => {
                tracing::debug!(error = %err, "Rejecting malformed JSON body");
                return Error::invalid_input(format!("Malformed JSON body: {err}")).into_response();
            }
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

impl Gateway {
    /// Buffers and parses JSON bodies up to `http.max_payload_size_bytes`.
    #[must_use]
    pub fn setup_json_body(mut self) -> Self {
        let limit = self.config.http.max_payload_size_bytes.as_u64() as usize;
        self.inner = self
            .inner
            .layer(middleware::from_fn_with_state(limit, parse_json_body));
        self
    }
}
