//! Core Gateway struct and initialization methods.

use {
    super::{admission::OriginAllowList, auth::TokenVerifier},
    crate::{Config, DataStore, Environment, Result},
    axum::Router,
    std::{sync::Arc, time::Duration},
    tower_http::services::{ServeDir, ServeFile},
};

/// Builder for the gateway's `axum::Router`.
///
/// The gateway owns the cross-cutting pipeline (logging, JSON body, CORS admission,
/// auth context, error handling) and a fixed dispatch table. The business logic lives
/// in collaborators supplied by the embedding code:
///
/// - the event endpoint mounted at `/api/inngest`
/// - the chat route group mounted at `/api/chat`
/// - the session route group mounted at `/api/sessions`
/// - a [`DataStore`] checked before the listener is bound and on every health check
///
/// Collaborators that are not supplied answer `503 Service Unavailable`.
///
/// Production redaction only applies to failures returned as [`crate::Error`].
/// A collaborator that builds its own 5xx response, e.g.
/// `(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())`, is passed through
/// untouched, so route groups should return `Result<_, talent_quotient_api::Error>`.
///
/// ```rust,no_run
/// use axum::{Router, routing::post};
/// use std::sync::Arc;
/// use talent_quotient_api::{Config, Gateway, PgDataStore, Result};
///
/// # async fn example() -> Result<()> {
/// let config = Config::from_env()?;
/// let store = Arc::new(PgDataStore::from_config(&config.database)?);
///
/// Gateway::new(config, store)?
///     .with_chat_routes(Router::new().route("/", post(|| async { "chat" })))
///     .setup_pipeline()?
///     .start()
///     .await
/// # }
/// ```
pub struct Gateway {
    pub(crate) config: Config,
    pub(crate) state: GatewayState,
    pub(crate) inner: Router,
    pub(crate) allow_list: Arc<OriginAllowList>,
    pub(crate) verifier: Option<Arc<TokenVerifier>>,
    pub(crate) collaborators: Collaborators,
    pub(crate) panic_channel: Option<tokio::sync::mpsc::Sender<String>>,
}

/// State shared by the built-in handlers.
#[derive(Clone)]
pub(crate) struct GatewayState {
    pub environment: Environment,
    pub store: Arc<dyn DataStore>,
    pub health_check_timeout: Duration,
    pub frontend: Option<FrontendBundle>,
}

/// The production frontend: files from the bundle directory, the entry document
/// for everything else.
#[derive(Clone)]
pub(crate) struct FrontendBundle {
    pub files: ServeDir<ServeFile>,
    pub cache_control: Option<http::HeaderValue>,
}

#[derive(Default)]
pub(crate) struct Collaborators {
    pub events: Option<Router>,
    pub chat: Option<Router>,
    pub sessions: Option<Router>,
}

impl Gateway {
    /// Creates a new `Gateway` from a configuration and a data store.
    ///
    /// Validates the configuration, builds the origin allow-list and the token
    /// verifier, and prepares the frontend bundle when running in production.
    /// No I/O happens here; the data store is first contacted by [`Gateway::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the JWT key cannot be
    /// parsed.
    pub fn new(config: Config, store: Arc<dyn DataStore>) -> Result<Gateway> {
        config.validate()?;

        let allow_list = Arc::new(OriginAllowList::from_config(&config));
        tracing::debug!(origins = ?allow_list.origins(), "CORS allow-list");

        let verifier = config
            .http
            .auth
            .as_ref()
            .map(TokenVerifier::from_config)
            .transpose()?
            .map(Arc::new);

        let environment = config.app.environment;
        let frontend = if environment.is_production() {
            Some(FrontendBundle::from_config(&config)?)
        } else {
            None
        };

        Ok(Gateway {
            state: GatewayState {
                environment,
                store,
                health_check_timeout: config.http.health_check_timeout,
                frontend,
            },
            config,
            inner: Router::new(),
            allow_list,
            verifier,
            collaborators: Collaborators::default(),
            panic_channel: None,
        })
    }

    /// Mounts the event-processing endpoint at `/api/inngest`.
    #[must_use]
    pub fn with_event_endpoint(mut self, router: Router) -> Self {
        self.collaborators.events = Some(router);
        self
    }

    /// Mounts the chat route group at `/api/chat`.
    #[must_use]
    pub fn with_chat_routes(mut self, router: Router) -> Self {
        self.collaborators.chat = Some(router);
        self
    }

    /// Mounts the session route group at `/api/sessions`.
    #[must_use]
    pub fn with_session_routes(mut self, router: Router) -> Self {
        self.collaborators.sessions = Some(router);
        self
    }

    /// Sets a notification channel for panic messages.
    ///
    /// Every panic caught by the pipeline sends its message to this channel,
    /// which is handy for alerting.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use talent_quotient_api::{Config, DataStore, Gateway};
    /// # fn example(store: Arc<dyn DataStore>) -> talent_quotient_api::Result<()> {
    /// let (tx, mut rx) = tokio::sync::mpsc::channel(100);
    /// let gateway = Gateway::new(Config::default(), store)?.with_panic_notification_channel(tx);
    ///
    /// tokio::spawn(async move {
    ///     while let Some(panic_msg) = rx.recv().await {
    ///         eprintln!("Panic caught: {panic_msg}");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn with_panic_notification_channel(self, ch: tokio::sync::mpsc::Sender<String>) -> Self {
        Self {
            panic_channel: Some(ch),
            ..self
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The origin allow-list built from the configuration.
    pub fn allow_list(&self) -> Arc<OriginAllowList> {
        self.allow_list.clone()
    }

    /// Consumes the gateway and returns the assembled router, e.g. for `oneshot` tests
    /// or to serve it with a custom listener.
    pub fn into_router(self) -> Router {
        self.inner
    }
}

impl FrontendBundle {
    pub(crate) fn from_config(config: &Config) -> Result<Self> {
        let frontend = &config.frontend;
        let index = frontend.index_path();
        if !index.is_file() {
            tracing::warn!(
                index = %index.display(),
                "Frontend entry document not found; unmatched paths will answer 404"
            );
        }

        let files = ServeDir::new(&frontend.directory)
            .append_index_html_on_directories(true)
            .precompressed_br()
            .precompressed_gzip()
            .fallback(ServeFile::new(index));

        let cache_control = frontend
            .cache_max_age
            .map(|max_age| http::HeaderValue::from_str(&format!("public, max-age={max_age}")))
            .transpose()?;

        Ok(Self {
            files,
            cache_control,
        })
    }
}
