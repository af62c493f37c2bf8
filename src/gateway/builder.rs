//! Orchestration: setup_pipeline(), start() and shutdown handling.

use {
    super::router::Gateway,
    crate::Result,
    std::{
        future::{Future, IntoFuture},
        net::SocketAddr,
        time::Duration,
    },
    tokio::{net::TcpListener, signal, sync::watch},
};

impl Gateway {
    /// Installs the dispatch table and every pipeline stage in the right order.
    ///
    /// Later layers wrap earlier ones, so the stages are added innermost first.
    /// The resulting order, outermost first:
    ///
    /// 1. Request id (kept from `x-request-id` or generated, echoed on the response)
    /// 2. Request logging, inside an `http_request` span
    /// 3. Global error handler (server-side failures become a 500 JSON body)
    /// 4. Panic recovery
    /// 5. JSON body parsing, bounded by `http.max_payload_size_bytes`
    /// 6. CORS admission against the origin allow-list, then CORS headers
    /// 7. Auth context
    /// 8. User span field
    /// 9. Dispatch
    ///
    /// # Errors
    ///
    /// Returns an error if a stage cannot be built from the configuration.
    pub fn setup_pipeline(self) -> Result<Self> {
        tracing::debug!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.state.environment,
            "Assembling request pipeline"
        );

        Ok(self
            .setup_routes()
            .setup_user_span()
            .setup_auth_context()
            .setup_cors()
            .setup_json_body()
            .setup_catch_panic()
            .setup_error_handler()
            .setup_logging()
            .setup_request_id())
    }

    /// Connects the data store, binds the listener and serves until SIGINT or
    /// SIGTERM.
    ///
    /// # Errors
    ///
    /// Fails with a `Database` error when the store cannot be reached; the listener
    /// is never bound in that case. Fails with an `Io` error when the address cannot
    /// be bound.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Same as [`Gateway::start`], but stops when `signal` completes.
    pub async fn start_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.connect_store().await?;

        let bind_addr = self.config.http.full_bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Bound to {}", &bind_addr);

        self.run(listener, signal).await
    }

    /// Connects the data store and serves on an already bound listener until
    /// `signal` completes.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.connect_store().await?;
        self.run(listener, signal).await
    }

    async fn connect_store(&self) -> Result<()> {
        let store = &self.state.store;
        if let Err(err) = store.connect().await {
            tracing::error!(store = store.name(), "Failed to connect to the data store: {err}");
            return Err(err);
        }
        tracing::info!(store = store.name(), "Connected to the data store");
        Ok(())
    }

    async fn run<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let port = listener.local_addr()?.port();
        tracing::info!("Server is running on port {port}");

        let shutdown_timeout = self.config.http.shutdown_timeout;
        let (initiated_tx, mut initiated_rx) = watch::channel(false);

        let service = self
            .inner
            .into_make_service_with_connect_info::<SocketAddr>();
        let serve_future = axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                signal.await;
                tracing::info!(
                    "Shutdown signal received, starting graceful shutdown (timeout: {}s)",
                    shutdown_timeout.as_secs()
                );
                initiated_tx.send(true).ok();
            })
            .into_future();

        // The timeout starts once shutdown is initiated, not when serving starts.
        tokio::select! {
            result = serve_future => {
                result?;
                tracing::info!("Graceful shutdown completed");
            }
            _ = grace_period(&mut initiated_rx, shutdown_timeout) => {
                tracing::warn!("Graceful shutdown timeout expired, forcing shutdown");
            }
        }

        Ok(())
    }
}

async fn grace_period(initiated: &mut watch::Receiver<bool>, timeout: Duration) {
    let started = initiated.wait_for(|started| *started).await.is_ok();
    if !started {
        // Sender gone without a shutdown: the serve branch decides.
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(timeout).await;
}

/// Completes on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires, so the server
/// keeps running in restricted environments.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::debug!("Ctrl+C signal received"),
            Err(err) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
                tracing::debug!("SIGTERM signal received");
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grace_period_waits_for_initiation() {
        let (tx, mut rx) = watch::channel(false);
        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            grace_period(&mut rx, Duration::from_millis(1)),
        )
        .await;
        assert!(waiting.is_err(), "grace period must not start before shutdown");

        tx.send(true).unwrap();
        tokio::time::timeout(
            Duration::from_secs(1),
            grace_period(&mut rx, Duration::from_millis(1)),
        )
        .await
        .expect("grace period should elapse after initiation");
    }
}
