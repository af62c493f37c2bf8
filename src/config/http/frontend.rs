use {
    crate::{Error, Result},
    serde::Deserialize,
    std::path::PathBuf,
};

/// Upper bound for `cache_max_age` (one year).
pub const MAX_CACHE_AGE_SECONDS: u64 = 31_536_000;

/// The pre-built single-page application served in production.
///
/// Any `GET`/`HEAD` request outside `/api` that no route claims is answered from
/// `directory`. Paths without a matching file get the entry document (`index`) so
/// that client-side routing works. In development the bundle is never served.
///
/// ```toml
/// [frontend]
/// directory = "../frontend/dist"
/// index = "index.html"
/// cache_max_age = 3600
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "FrontendConfig::default_directory")]
    pub directory: String,

    #[serde(default = "FrontendConfig::default_index")]
    pub index: String,

    /// Adds `Cache-Control: public, max-age=<n>` to bundle responses.
    #[serde(default)]
    pub cache_max_age: Option<u64>,
}

impl FrontendConfig {
    fn default_directory() -> String {
        "../frontend/dist".into()
    }

    fn default_index() -> String {
        "index.html".into()
    }

    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.directory).join(&self.index)
    }

    pub fn validate(&self) -> Result<()> {
        if self.directory.trim().is_empty() {
            return Err(Error::invalid_input(
                "Frontend directory is required. Set [frontend] directory = \"../frontend/dist\" in config.",
            ));
        }

        if self.index.trim().is_empty() {
            return Err(Error::invalid_input(
                "Frontend entry document is required. Set [frontend] index = \"index.html\" in config.",
            ));
        }

        if let Some(max_age) = self.cache_max_age
            && max_age > MAX_CACHE_AGE_SECONDS
        {
            return Err(Error::invalid_input(
                "cache_max_age exceeds 31536000 (1 year). Use values like 86400 (1 day) or 604800 (1 week).",
            ));
        }

        Ok(())
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        FrontendConfig {
            directory: Self::default_directory(),
            index: Self::default_index(),
            cache_max_age: None,
        }
    }
}
