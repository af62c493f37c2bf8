//!
//! Small helpers shared by the config layer and the request pipeline.
//!
//! - [`Sensitive`] hides secrets (JWT keys, database passwords) from debug output
//! - [`RequestIdGenerator`] keeps or mints the `x-request-id` of each request
//! - [`replace_handlebars_with_env`] expands `{{ VAR }}` placeholders in config files
//!

use {
    http::{HeaderValue, Request},
    regex::{Captures, Regex},
    serde::Deserialize,
    std::{env, sync::LazyLock},
    tower_http::request_id::{MakeRequestId, RequestId},
    uuid::{ContextV7, Timestamp, Uuid},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

/// Matches `{{ VAR_NAME }}` with optional inner whitespace. Names are upper-case
/// letters, digits and underscores.
static HANDLEBAR_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Z0-9_]+)\s*\}\}").unwrap());

/// Wrapper for secret values.
///
/// `Debug` prints `Sensitive(****)` and the inner value is zeroed when dropped.
/// The value itself stays reachable through field `0`.
///
/// ```
/// use talent_quotient_api::Sensitive;
///
/// let secret = Sensitive::from("jwt-signing-secret");
/// assert_eq!(format!("{secret:?}"), "Sensitive(****)");
/// assert_eq!(secret.0, "jwt-signing-secret");
/// ```
#[derive(Clone, Deserialize, Default, Zeroize, ZeroizeOnDrop)]
pub struct Sensitive<T: Default + Zeroize>(pub T);

impl Sensitive<String> {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<T: Default + Zeroize + PartialEq> PartialEq for Sensitive<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Default + Zeroize> std::fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sensitive(****)")
    }
}

/// Request id source for `SetRequestIdLayer`.
///
/// An incoming `x-request-id` header is kept as is. Otherwise a fresh UUIDv7
/// is generated so ids sort by arrival time in the logs.
///
/// ```
/// use talent_quotient_api::RequestIdGenerator;
/// use tower_http::request_id::SetRequestIdLayer;
///
/// let layer = SetRequestIdLayer::x_request_id(RequestIdGenerator);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, req: &Request<B>) -> Option<RequestId> {
        match req.headers().get("x-request-id") {
            Some(value) => Some(RequestId::new(value.clone())),
            None => {
                let cx = ContextV7::new().with_additional_precision();
                let uuid = Uuid::new_v7(Timestamp::now(cx));
                let value = HeaderValue::from_str(&uuid.to_string()).ok()?;
                Some(RequestId::new(value))
            }
        }
    }
}

/// Replaces every `{{ VAR }}` placeholder in `input` with the value of the
/// environment variable `VAR`.
///
/// Unset variables become the empty string and a warning is logged. This runs
/// over the raw TOML text before it is parsed, so secrets such as the database
/// password or the JWT secret can stay out of the config files.
///
/// ```
/// use talent_quotient_api::replace_handlebars_with_env;
///
/// let rendered = replace_handlebars_with_env("url = \"{{ TQ_DOC_MISSING_VAR }}\"");
/// assert_eq!(rendered, "url = \"\"");
/// ```
pub fn replace_handlebars_with_env(input: &str) -> String {
    HANDLEBAR_REGEXP
        .replace_all(input, |caps: &Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!(
                    variable = %var_name,
                    "Environment variable not found, substituting with empty string"
                );
                String::new()
            })
        })
        .to_string()
}
