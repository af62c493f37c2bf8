//! The request pipeline and its builder.
//!
//! Every inbound request runs through the same ordered stages, outermost first:
//!
//! ```text
//! request id -> logging -> error handler -> panic recovery -> JSON body
//!     -> CORS admission -> CORS headers -> auth context -> user span -> dispatch
//! ```
//!
//! The implementation is split across submodules:
//!
//! - [`router`] - `Gateway` struct, shared state and collaborator wiring
//! - [`routes`] - dispatch table, built-in handlers, 404 and frontend fallback
//! - [`admission`] - origin allow-list and CORS admission
//! - [`body`] - JSON body buffering and parsing
//! - [`auth`] - bearer token verification and `AuthContext`
//! - [`observability`] - request logging, request ids, user span
//! - [`control`] - panic recovery and the global error handler
//! - [`builder`] - orchestration (`setup_pipeline`, `start`, shutdown)

mod admission;
mod auth;
mod body;
mod builder;
mod control;
mod observability;
mod router;
mod routes;

pub use admission::OriginAllowList;
pub use auth::{AuthContext, Identity, TokenVerifier};
pub use body::ParsedJson;
pub use builder::shutdown_signal;
pub use router::Gateway;
pub use routes::{AVAILABLE_ROUTES, CHAT_PREFIX, EVENTS_PREFIX, SESSIONS_PREFIX};

#[cfg(test)]
mod tests;
