//! # talent-quotient-api
//!
//! The HTTP gateway of the Talent Quotient backend.
//!
//! Every inbound request goes through one fixed pipeline (request id, logging,
//! error handling, panic recovery, JSON body parsing, CORS admission, auth context)
//! before it is dispatched to one of:
//!
//! - a built-in handler (`/`, `/api/health`, `/api/test`, `/api/test-protected`)
//! - a collaborator mounted under `/api/inngest`, `/api/chat` or `/api/sessions`
//! - the production frontend bundle, for page navigations outside `/api`
//! - the JSON 404 handler
//!
//! The collaborators and the data store are supplied by the embedding binary, so the
//! gateway can be tested in isolation with fakes.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::post};
//! use std::sync::Arc;
//! use talent_quotient_api::{Config, Gateway, ParsedJson, PgDataStore, Result};
//!
//! async fn chat(ParsedJson(body): ParsedJson) -> String {
//!     format!("got {body}")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     config.setup_tracing();
//!
//!     let store = Arc::new(PgDataStore::from_config(&config.database)?);
//!
//!     Gateway::new(config, store)?
//!         .with_chat_routes(Router::new().route("/", post(chat)))
//!         .setup_pipeline()?
//!         .start()
//!         .await
//! }
//! ```
//!
//! # Configuration
//!
//! `Config::from_env` reads `config/{RUST_ENV}.toml` when it exists, otherwise the
//! built-in defaults, then applies the `PORT`, `CLIENT_URL` and `DATABASE_URL`
//! environment variables. A file that exists but does not parse is an error:
//!
//! ```rust
//! use talent_quotient_api::{Config, Environment};
//!
//! let config: Config = r#"
//!     [app]
//!     environment = "production"
//!     client_url = "https://app.example.com"
//!
//!     [http]
//!     bind_port = 8080
//!     max_payload_size_bytes = "1MiB"
//! "#.parse().unwrap();
//!
//! assert_eq!(config.app.environment, Environment::Production);
//! assert_eq!(config.http.full_bind_addr(), "0.0.0.0:8080");
//! ```
//!
//! # Error Handling
//!
//! The crate uses its own [`Result`] type. Errors render as JSON:
//!
//! ```json
//! {
//!   "error": "Internal Server Error",
//!   "message": "Something went wrong"
//! }
//! ```
//!
//! Server-side messages are only disclosed outside of production.
//!
//! # Cargo Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `postgres` (default) | PostgreSQL data store and `[database]` section |
mod config;
mod error;
mod gateway;
mod store;
mod utils;

pub use config::*;
pub use error::*;
pub use gateway::*;
pub use store::*;
pub use utils::*;

pub type Result<T> = std::result::Result<T, Error>;
