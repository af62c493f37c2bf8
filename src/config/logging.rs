use {
    crate::{Error, Result},
    serde::Deserialize,
    tracing_subscriber::EnvFilter,
};

///
/// Configuration for logging and tracing.
///
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Format for log output.
    /// The default format is `default`, which is "full" human-readable format.
    /// Other options are `json`, `compact`, and `pretty`.
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive used when `RUST_LOG` is not set, e.g. `"info"` or
    /// `"talent_quotient_api=debug,tower_http=info"`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }

    /// The filter applied to the subscriber. `RUST_LOG` wins over `level`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            Error::config(format!("[logging] level '{}' is invalid: {e}", self.level))
        })?;
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            format: LogFormat::default(),
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Default,
    Compact,
    Pretty,
}
