//! CORS origin admission.
//!
//! Admission happens in two layers. The outer one decides: requests without an
//! `Origin` header pass, requests whose origin is on the allow-list pass, all others
//! are answered with `403` before any route runs. The inner one is a regular
//! `tower_http` `CorsLayer` that annotates responses of admitted requests and
//! answers their preflights.

use {
    super::router::Gateway,
    crate::{Config, Error, KNOWN_FRONTEND_ORIGINS},
    axum::{
        extract::{Request, State},
        middleware::{self, Next},
        response::{IntoResponse, Response},
    },
    http::{HeaderValue, Method, header},
    std::sync::Arc,
    tower_http::cors::{AllowOrigin, CorsLayer},
};

/// Origins admitted by the gateway.
///
/// Built once at startup and shared read-only. Comparison is literal: an origin
/// matches an entry when it is equal to it, equal to it plus one trailing slash, or
/// equal to it minus its trailing slash. There are no wildcards and no URL
/// normalisation, so `HTTPS://APP.EXAMPLE.COM` does not match `https://app.example.com`.
///
/// ```
/// use talent_quotient_api::OriginAllowList;
///
/// let list = OriginAllowList::new(["https://app.example.com"]);
/// assert!(list.is_allowed("https://app.example.com"));
/// assert!(list.is_allowed("https://app.example.com/"));
/// assert!(!list.is_allowed("https://evil.example.com"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginAllowList {
    origins: Vec<String>,
}

impl OriginAllowList {
    /// Builds a list from raw entries. Blank entries are dropped, duplicates kept once.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.as_ref().trim();
            if !origin.is_empty() && !list.iter().any(|known| known == origin) {
                list.push(origin.to_string());
            }
        }
        Self { origins: list }
    }

    /// The client URL, the configured origins and the known frontends.
    pub fn from_config(config: &Config) -> Self {
        let client_url = config.app.client_url();
        let configured = config.http.cors.allowed_origins.iter().map(String::as_str);
        Self::new(
            client_url
                .into_iter()
                .chain(KNOWN_FRONTEND_ORIGINS)
                .chain(configured),
        )
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|entry| {
            origin == entry
                || origin.strip_suffix('/') == Some(entry.as_str())
                || entry.strip_suffix('/') == Some(origin)
        })
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }
}

pub(crate) async fn admit_origin(
    State(allow_list): State<Arc<OriginAllowList>>,
    request: Request,
    next: Next,
) -> Response {
    // An empty Origin carries no more information than a missing one.
    let Some(origin) = request
        .headers()
        .get(header::ORIGIN)
        .filter(|origin| !origin.is_empty())
    else {
        return next.run(request).await;
    };

    if origin
        .to_str()
        .is_ok_and(|origin| allow_list.is_allowed(origin))
    {
        return next.run(request).await;
    }

    let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
    tracing::warn!(origin = %origin, "Blocked by CORS: {origin}");
    Error::origin_not_allowed().into_response()
}

impl Gateway {
    /// Installs the CORS layers: the admission check and, inside it, the `CorsLayer`
    /// that grants credentials, `GET, POST, PUT, DELETE, OPTIONS` and
    /// `content-type, authorization` to every admitted origin.
    #[must_use]
    pub fn setup_cors(mut self) -> Self {
        let allow_list = self.allow_list.clone();
        let predicate_list = allow_list.clone();

        let mut cors = CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &http::request::Parts| {
                    origin
                        .to_str()
                        .is_ok_and(|origin| predicate_list.is_allowed(origin))
                },
            ))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        if let Some(max_age) = self.config.http.cors.max_age {
            cors = cors.max_age(max_age);
        }

        self.inner = self
            .inner
            .layer(cors)
            .layer(middleware::from_fn_with_state(allow_list, admit_origin));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_and_trailing_slash_matches() {
        let list = OriginAllowList::new(["https://a.example.com", "http://localhost:5173/"]);

        assert!(list.is_allowed("https://a.example.com"));
        assert!(list.is_allowed("https://a.example.com/"));
        assert!(list.is_allowed("http://localhost:5173"));
        assert!(list.is_allowed("http://localhost:5173/"));

        assert!(!list.is_allowed("https://a.example.com//"));
        assert!(!list.is_allowed("https://A.example.com"));
        assert!(!list.is_allowed("https://a.example.com:443"));
        assert!(!list.is_allowed("https://b.example.com"));
        assert!(!list.is_allowed(""));
    }

    #[test]
    fn test_blank_and_duplicate_entries_are_dropped() {
        let list = OriginAllowList::new(["", "  ", "https://a.example.com", "https://a.example.com"]);
        assert_eq!(list.origins(), ["https://a.example.com"]);
    }

    #[test]
    fn test_from_config_includes_client_url_and_known_frontends() {
        let config = Config::default()
            .with_client_url("https://client.example.com")
            .with_cors_config(
                crate::HttpCorsConfig::default()
                    .with_allowed_origins(vec!["https://extra.example.com".into()]),
            );
        let list = OriginAllowList::from_config(&config);

        assert!(list.is_allowed("https://client.example.com"));
        assert!(list.is_allowed("https://extra.example.com"));
        assert!(list.is_allowed("https://talent-quotient-frontend.vercel.app"));
        assert!(list.is_allowed("http://localhost:5173"));
        assert_eq!(list.origins().len(), 4);
    }

    #[test]
    fn test_unset_client_url_is_ignored() {
        let mut config = Config::default();
        config.app.client_url = Some(String::new());
        let list = OriginAllowList::from_config(&config);
        assert_eq!(list.origins().len(), KNOWN_FRONTEND_ORIGINS.len());
        assert!(!list.is_allowed(""));
    }

    proptest! {
        #[test]
        fn listed_origins_are_always_allowed(host in "[a-z]{1,12}", port in 1u16..) {
            let origin = format!("https://{host}.example.com:{port}");
            let list = OriginAllowList::new([origin.as_str()]);
            prop_assert!(list.is_allowed(&origin));
            let with_slash = format!("{origin}/");
            prop_assert!(list.is_allowed(&with_slash));
        }

        #[test]
        fn unlisted_hosts_are_rejected(host in "[a-z]{1,12}", other in "[a-z]{1,12}") {
            prop_assume!(host != other);
            let list = OriginAllowList::new([format!("https://{host}.example.com")]);
            let candidate = format!("https://{other}.example.com");
            prop_assert!(!list.is_allowed(&candidate));
        }

        #[test]
        fn empty_list_rejects_everything(origin in ".*") {
            prop_assert!(!OriginAllowList::default().is_allowed(&origin));
        }
    }
}
