mod auth;
mod cors;
mod frontend;

pub use auth::*;
pub use cors::*;
pub use frontend::*;

use {
    crate::{Error, Result},
    serde::Deserialize,
    std::time::Duration,
};

///
/// Settings of the HTTP listener and of the request pipeline.
///
/// ```toml
/// [http]
/// bind_addr = "0.0.0.0"
/// bind_port = 3000
/// max_payload_size_bytes = "100KiB"
/// shutdown_timeout = "30s"
/// health_check_timeout = "2s"
/// ```
///
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// IP address to listen on. Defaults to every interface.
    #[serde(default = "HttpConfig::default_bind_addr")]
    pub bind_addr: String,

    /// Port to listen on. The `PORT` environment variable overrides it
    /// when the configuration is loaded with `Config::from_env`.
    #[serde(default = "HttpConfig::default_bind_port")]
    pub bind_port: u16,

    /// Largest JSON body the body stage buffers. Larger bodies get a 413.
    #[serde(default = "HttpConfig::default_max_payload_size_bytes")]
    pub max_payload_size_bytes: byte_unit::Byte,

    /// How long in-flight requests may take to drain once shutdown starts.
    #[serde(
        default = "HttpConfig::default_shutdown_timeout",
        with = "humantime_serde"
    )]
    pub shutdown_timeout: Duration,

    /// Longest a health check waits for the data store before reporting it unreachable.
    #[serde(
        default = "HttpConfig::default_health_check_timeout",
        with = "humantime_serde"
    )]
    pub health_check_timeout: Duration,

    #[serde(default)]
    pub cors: HttpCorsConfig,

    /// Bearer token verification. Without it every request is anonymous.
    #[serde(default)]
    pub auth: Option<HttpAuthConfig>,
}

impl HttpConfig {
    pub fn full_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }

    fn default_bind_addr() -> String {
        "0.0.0.0".into()
    }

    fn default_bind_port() -> u16 {
        3000
    }

    fn default_max_payload_size_bytes() -> byte_unit::Byte {
        byte_unit::Byte::from_u64(100 * 1024)
    }

    fn default_shutdown_timeout() -> Duration {
        Duration::from_secs(30)
    }

    fn default_health_check_timeout() -> Duration {
        Duration::from_secs(2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(Error::invalid_input(
                "HTTP bind_addr is required. Set [http] bind_addr = \"0.0.0.0\" or \"127.0.0.1\" in config.",
            ));
        }

        if self.bind_addr.parse::<std::net::IpAddr>().is_err() {
            return Err(Error::invalid_input(
                "HTTP bind_addr must be a valid IP address. Examples: \"127.0.0.1\", \"0.0.0.0\", \"::1\"",
            ));
        }

        if self.max_payload_size_bytes.as_u64() == 0 {
            return Err(Error::invalid_input(
                "HTTP max_payload_size_bytes must be > 0. Set [http] max_payload_size_bytes = \"100KiB\" in config.",
            ));
        }

        if self.health_check_timeout.is_zero() {
            return Err(Error::invalid_input(
                "HTTP health_check_timeout must be > 0. Set [http] health_check_timeout = \"2s\" in config.",
            ));
        }

        self.cors.validate()?;

        match &self.auth {
            Some(auth) => auth.validate()?,
            None => tracing::warn!(
                "No [http.auth] configuration found. Bearer tokens will not be verified \
                 and every request is treated as anonymous."
            ),
        }

        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            bind_addr: Self::default_bind_addr(),
            bind_port: Self::default_bind_port(),
            max_payload_size_bytes: Self::default_max_payload_size_bytes(),
            shutdown_timeout: Self::default_shutdown_timeout(),
            health_check_timeout: Self::default_health_check_timeout(),
            cors: HttpCorsConfig::default(),
            auth: None,
        }
    }
}
