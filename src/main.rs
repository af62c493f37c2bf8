use {
    std::{process::ExitCode, sync::Arc},
    talent_quotient_api::{Config, Gateway, PgDataStore, Result},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(kind = %err.kind(), "Server stopped: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Fall back to the default subscriber so a bad configuration is still reported.
    let config = Config::from_env().inspect_err(|_| Config::default().setup_tracing())?;
    config.setup_tracing();

    tracing::info!(
        environment = %config.app.environment,
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let store = Arc::new(PgDataStore::from_config(&config.database)?);

    // Route groups and the event endpoint are deployed separately and answer 503
    // until they are mounted here.
    Gateway::new(config, store)?
        .setup_pipeline()?
        .start()
        .await
}
