use {
    crate::{Error, Result},
    serde::{Deserialize, Serialize},
    std::{env, fmt, str::FromStr},
    url::Url,
};

///
/// Execution mode of the gateway.
///
/// Production turns on the frontend bundle and redacts the message of server-side
/// errors. When not configured explicitly the mode follows `RUST_ENV`: `prod`,
/// `production`, `release` or an unset variable select production, anything else
/// selects development.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn from_rust_env() -> Self {
        match env::var("RUST_ENV") {
            Ok(name) => Self::from_env_name(&name),
            Err(_) => Environment::Production,
        }
    }

    fn from_env_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "prod" | "production" | "release" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_rust_env()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(Error::config(format!(
                "Unknown environment '{other}'. Use \"development\" or \"production\"."
            ))),
        }
    }
}

///
/// Application level settings: execution mode and the URL of the primary frontend.
///
/// ```toml
/// [app]
/// environment = "development"
/// client_url = "{{ CLIENT_URL }}"
/// ```
///
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    /// URL of the deployed frontend. It is always added to the CORS allow-list.
    /// An empty value (e.g. an unset `{{ CLIENT_URL }}`) is treated as absent.
    #[serde(default)]
    pub client_url: Option<String>,
}

impl AppConfig {
    /// The client URL, ignoring blank values.
    pub fn client_url(&self) -> Option<&str> {
        self.client_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(client_url) = self.client_url() {
            validate_origin(client_url).map_err(|reason| {
                Error::config(format!("[app] client_url '{client_url}' {reason}"))
            })?;
        }
        Ok(())
    }
}

/// Checks that `origin` is an absolute `http`/`https` URL with a host.
pub(crate) fn validate_origin(origin: &str) -> std::result::Result<(), String> {
    let url = Url::parse(origin).map_err(|e| format!("is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("must use the http or https scheme".into());
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("must include a host".into());
    }
    Ok(())
}
