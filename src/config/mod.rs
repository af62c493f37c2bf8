//!
//! Configuration structures and utilities for wiring up the gateway.
//!
//! A configuration can be created in many ways:
//! - From an environment-specific TOML file via `Config::from_rust_env` or `Config::from_toml_file`
//! - From a TOML string via `Config::from_toml` or `str::parse`
//! - From the built-in defaults plus the `PORT`, `CLIENT_URL` and `DATABASE_URL`
//!   environment variables via `Config::from_env`
//! - Constructed programmatically via the builder methods on `Config`
//!
//! In the TOML-based methods, environment variables can be referenced using the
//! {{ VAR_NAME }} syntax and are substituted before parsing (see
//! `replace_handlebars_with_env`). This keeps secrets out of the TOML files.
//!
//! Sections:
//!
//! - `AppConfig` (`[app]`): execution mode and client URL
//! - `HttpConfig` (`[http]`, `[http.cors]`, `[http.auth]`): listener and pipeline settings
//! - `FrontendConfig` (`[frontend]`): the production frontend bundle
//! - `DatabaseConfig` (`[database]`): data store connection pool
//! - `LoggingConfig` (`[logging]`): log format and level
//!
mod app;
mod http;
mod logging;

#[cfg(feature = "postgres")]
mod database;
#[cfg(feature = "postgres")]
pub use database::*;

pub use app::{AppConfig, Environment};
pub use http::*;
pub use logging::*;

pub use byte_unit::Byte;

use {
    crate::{Error, Result, utils::replace_handlebars_with_env},
    serde::Deserialize,
    std::{env, fs, io, str::FromStr, time::Duration},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[cfg(feature = "postgres")]
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    ///
    /// Loads `config/{RUST_ENV}.toml`, falling back to the built-in defaults when
    /// `RUST_ENV` is unset or names a file that does not exist.
    ///
    /// Any other failure is a `Configuration` error: a file that exists but cannot
    /// be read or parsed never silently turns into the defaults.
    ///
    pub fn load() -> Result<Config> {
        let rust_env = match env::var("RUST_ENV") {
            Ok(rust_env) => rust_env,
            Err(env::VarError::NotPresent) => return Ok(Config::default()),
            Err(err) => return Err(Error::config(format!("RUST_ENV is unusable: {err}"))),
        };

        let path = format!("config/{rust_env}.toml");
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(err) => return Err(Error::config(format!("Cannot read {path}: {err}"))),
        };

        Self::from_toml(&text).map_err(|err| Error::config(format!("Invalid {path}: {err}")))
    }

    ///
    /// Loads the configuration from a file based on the RUST_ENV environment variable.
    /// Fails when RUST_ENV is not set.
    ///
    pub fn from_rust_env() -> Result<Config> {
        Self::from_toml_file(env::var("RUST_ENV")?)
    }

    ///
    /// Given an environment name, loads `config/{env}.toml`, substitutes any
    /// environment variables and parses the result.
    ///
    pub fn from_toml_file(env: impl AsRef<str>) -> Result<Config> {
        let path = format!("config/{}.toml", env.as_ref());
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    ///
    /// Parses a configuration string in TOML format into a Config struct.
    ///
    pub fn from_toml(toml_str: &str) -> Result<Config> {
        toml_str.parse()
    }

    ///
    /// The configuration used by the binary: `Config::load()` followed by the
    /// environment overrides read once at startup.
    ///
    pub fn from_env() -> Result<Config> {
        Self::load()?.with_env_overrides()
    }

    ///
    /// Applies `PORT`, `CLIENT_URL` and `DATABASE_URL` from the process environment.
    /// Unset variables leave the configuration untouched.
    ///
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(port) = env::var("PORT") {
            self.http.bind_port = port.trim().parse().map_err(|_| {
                Error::config(format!("PORT must be a number between 0 and 65535, got '{port}'"))
            })?;
        }
        if let Ok(client_url) = env::var("CLIENT_URL") {
            self.app.client_url = Some(client_url);
        }
        #[cfg(feature = "postgres")]
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
        Ok(self)
    }

    /// Sets the execution mode of the AppConfig.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.app.environment = environment;
        self
    }

    /// Sets the client URL of the AppConfig. It is added to the CORS allow-list.
    pub fn with_client_url<S: AsRef<str>>(mut self, url: S) -> Self {
        self.app.client_url = Some(url.as_ref().into());
        self
    }

    /// Sets the HTTP server bind address of the HttpConfig.
    pub fn with_bind_addr<S: AsRef<str>>(mut self, addr: S) -> Self {
        self.http.bind_addr = addr.as_ref().into();
        self
    }

    /// Sets the HTTP server bind port of the HttpConfig.
    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.http.bind_port = port;
        self
    }

    /// Sets the maximum JSON payload size in bytes of the HttpConfig.
    pub fn with_max_payload_size_bytes(mut self, size: u64) -> Self {
        self.http.max_payload_size_bytes = Byte::from_u64(size);
        self
    }

    /// Sets how long in-flight requests may drain during shutdown.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.http.shutdown_timeout = timeout;
        self
    }

    /// Sets the CORS configuration of the HttpConfig.
    pub fn with_cors_config(mut self, cors_config: HttpCorsConfig) -> Self {
        self.http.cors = cors_config;
        self
    }

    /// Enables bearer token verification.
    pub fn with_auth_config(mut self, auth_config: HttpAuthConfig) -> Self {
        self.http.auth = Some(auth_config);
        self
    }

    /// Sets the directory holding the production frontend bundle.
    pub fn with_frontend_dir<S: AsRef<str>>(mut self, directory: S) -> Self {
        self.frontend.directory = directory.as_ref().into();
        self
    }

    /// Sets the Cache-Control max-age of frontend bundle responses.
    pub fn with_frontend_cache_max_age(mut self, seconds: u64) -> Self {
        self.frontend.cache_max_age = Some(seconds);
        self
    }

    /// Sets the Postgres database connection URL of the DatabaseConfig.
    #[cfg(feature = "postgres")]
    pub fn with_pg_url(mut self, url: &str) -> Self {
        self.database.url = url.into();
        self
    }

    /// Sets the maximum pool size of the DatabaseConfig.
    #[cfg(feature = "postgres")]
    pub fn with_pg_max_pool_size(mut self, size: u8) -> Self {
        self.database.max_pool_size = size;
        self
    }

    /// Sets the connection timeout of the DatabaseConfig.
    #[cfg(feature = "postgres")]
    pub fn with_pg_connect_timeout(mut self, timeout: Duration) -> Self {
        self.database.connect_timeout = timeout;
        self
    }

    /// Sets the log format of the LoggingConfig.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.logging.format = format;
        self
    }

    /// Sets the log level directive of the LoggingConfig.
    pub fn with_log_level<S: AsRef<str>>(mut self, level: S) -> Self {
        self.logging.level = level.as_ref().into();
        self
    }

    /// Ensures that the configuration is valid.
    /// Most values have sensible defaults; this checks the ones that cannot be
    /// defaulted and the combinations that make no sense.
    pub fn validate(&self) -> Result<()> {
        self.app.validate()?;
        self.http.validate()?;
        self.frontend.validate()?;
        #[cfg(feature = "postgres")]
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    ///
    /// Sets up the tracing subscriber for logging based on the LoggingConfig.
    ///
    /// NOTE: This should be called early during startup to ensure logging is configured
    ///       before any log messages are emitted.
    ///
    pub fn setup_tracing(&self) {
        use tracing_subscriber::prelude::*;
        let env_filter = self.logging.env_filter();
        match self.logging.format {
            LogFormat::Json => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().json())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Default => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Compact => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().compact())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Pretty => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .with(env_filter)
                    .try_init();
            }
        }
    }
}

///
/// Parses a configuration string with references to environment variables
/// into a Config struct by substituting the environment variables and then
/// parsing the resulting TOML.
///
impl FromStr for Config {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let config_file = replace_handlebars_with_env(s);
        let config = toml::from_str::<Config>(&config_file)?;
        Ok(config)
    }
}
