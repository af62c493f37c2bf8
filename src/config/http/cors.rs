use {
    crate::{Error, Result, config::app::validate_origin},
    serde::Deserialize,
    std::time::Duration,
};

/// Frontends that are always admitted, whatever the configuration says.
pub const KNOWN_FRONTEND_ORIGINS: [&str; 2] = [
    "https://talent-quotient-frontend.vercel.app",
    "http://localhost:5173",
];

/// Configuration of the CORS origin allow-list.
///
/// The effective allow-list is the union of `allowed_origins`, the `[app] client_url`
/// and [`KNOWN_FRONTEND_ORIGINS`]. It is built once when the gateway starts and never
/// changes afterwards. Every admitted origin gets the same grant: credentials, the
/// methods `GET, POST, PUT, DELETE, OPTIONS` and the headers `content-type, authorization`.
///
/// ```toml
/// [http.cors]
/// allowed_origins = ["https://staging.talentquotient.dev"]
/// max_age = "1h"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HttpCorsConfig {
    /// Extra origins to admit, e.g. `["https://staging.example.com"]`.
    /// Entries are compared literally; a single trailing slash is tolerated.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// How long browsers may cache preflight responses.
    /// No `Access-Control-Max-Age` header is sent when unset.
    #[serde(default, with = "humantime_serde")]
    pub max_age: Option<Duration>,
}

impl HttpCorsConfig {
    /// Sets the extra origins admitted by the allow-list.
    ///
    /// ```rust
    /// use talent_quotient_api::HttpCorsConfig;
    ///
    /// let cors = HttpCorsConfig::default()
    ///     .with_allowed_origins(vec!["https://app.example.com".into()]);
    /// assert_eq!(cors.allowed_origins.len(), 1);
    /// ```
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Sets the preflight cache duration.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for origin in &self.allowed_origins {
            validate_origin(origin).map_err(|reason| {
                Error::config(format!("[http.cors] allowed origin '{origin}' {reason}"))
            })?;
        }
        Ok(())
    }
}
