//! Authentication context: bearer token verification that never rejects.
//!
//! The gateway only works out *who* is calling. Whether a caller may do something
//! is decided by the route groups, which extract [`AuthContext`] from the request.

use {
    super::router::Gateway,
    crate::{Error, HttpAuthConfig, Result},
    axum::{
        extract::{FromRequestParts, Request, State},
        middleware::{self, Next},
        response::Response,
    },
    http::{HeaderMap, header, request::Parts},
    jsonwebtoken::{Algorithm, DecodingKey, Validation, decode},
    serde::Deserialize,
    std::{convert::Infallible, sync::Arc},
};

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// `sub` claim.
    pub user_id: String,
    /// `sid` claim, when the issuer provides one.
    pub session_id: Option<String>,
    pub issuer: Option<String>,
}

/// What the auth stage learned about a request.
///
/// Always present on requests that went through the pipeline. Extracting it in a
/// handler never fails; outside the pipeline it defaults to anonymous.
///
/// ```rust
/// use talent_quotient_api::AuthContext;
///
/// async fn whoami(auth: AuthContext) -> String {
///     match auth.user_id() {
///         Some(user) => format!("hello {user}"),
///         None => "hello stranger".into(),
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// An `Authorization` header was sent, whatever its content.
    pub credential_present: bool,
    /// Set only when a bearer token verified.
    pub identity: Option<Identity>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.user_id.as_str())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    azp: Option<String>,
}

/// Verifies bearer JWTs against the configured key.
///
/// HS256 with a shared secret or RS256 with a PEM public key. `exp` is required and
/// checked with the configured leeway; `iss` and `azp` are checked when configured.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl TokenVerifier {
    pub fn from_config(config: &HttpAuthConfig) -> Result<Self> {
        let (key, algorithm) = match (&config.jwt_secret, &config.jwt_public_key_pem) {
            (Some(secret), _) if !secret.0.trim().is_empty() => {
                (DecodingKey::from_secret(secret.0.as_bytes()), Algorithm::HS256)
            }
            (_, Some(pem)) if !pem.0.trim().is_empty() => {
                let key = DecodingKey::from_rsa_pem(pem.0.as_bytes()).map_err(|e| {
                    Error::config(format!("[http.auth] jwt_public_key_pem is not a valid RSA key: {e}"))
                })?;
                (key, Algorithm::RS256)
            }
            _ => {
                return Err(Error::config(
                    "[http.auth] requires jwt_secret or jwt_public_key_pem",
                ));
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.leeway;
        validation.validate_aud = false;
        if let Some(issuer) = config.issuer.as_deref().map(str::trim)
            && !issuer.is_empty()
        {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key,
            validation,
            authorized_parties: config
                .authorized_parties
                .iter()
                .map(|party| party.trim().to_string())
                .filter(|party| !party.is_empty())
                .collect(),
        })
    }

    /// Returns the identity carried by `token`, or an `Authentication` error.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;

        if !self.authorized_parties.is_empty() {
            let azp = claims.azp.as_deref().unwrap_or_default();
            if !self.authorized_parties.iter().any(|party| party == azp) {
                return Err(Error::authentication(format!(
                    "Token issued for unauthorized party '{azp}'"
                )));
            }
        }

        Ok(Identity {
            user_id: claims.sub,
            session_id: claims.sid,
            issuer: claims.iss,
        })
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub(crate) fn resolve_auth_context(
    verifier: Option<&TokenVerifier>,
    headers: &HeaderMap,
) -> AuthContext {
    let credential_present = headers.contains_key(header::AUTHORIZATION);
    let identity = match (verifier, bearer_token(headers)) {
        (Some(verifier), Some(token)) => match verifier.verify(token) {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::debug!(error = %err, "Bearer token rejected, continuing anonymously");
                None
            }
        },
        _ => None,
    };

    AuthContext {
        credential_present,
        identity,
    }
}

pub(crate) async fn attach_auth_context(
    State(verifier): State<Option<Arc<TokenVerifier>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = resolve_auth_context(verifier.as_deref(), request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}

impl Gateway {
    /// Attaches an [`AuthContext`] to every request.
    #[must_use]
    pub fn setup_auth_context(mut self) -> Self {
        let verifier = self.verifier.clone();
        self.inner = self
            .inner
            .layer(middleware::from_fn_with_state(verifier, attach_auth_context));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "unit-test-signing-secret";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        sid: &'a str,
        iss: &'a str,
        azp: &'a str,
        exp: u64,
    }

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn token(exp: u64, azp: &str) -> String {
        let claims = TestClaims {
            sub: "user_42",
            sid: "sess_7",
            iss: "https://issuer.example.com",
            azp,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_config(
            &HttpAuthConfig::with_secret(SECRET).with_issuer("https://issuer.example.com"),
        )
        .unwrap()
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let identity = verifier().verify(&token(now() + 600, "app")).unwrap();
        assert_eq!(identity.user_id, "user_42");
        assert_eq!(identity.session_id.as_deref(), Some("sess_7"));
        assert_eq!(identity.issuer.as_deref(), Some("https://issuer.example.com"));
    }

    #[test]
    fn test_expired_token_is_an_authentication_error() {
        let err = verifier().verify(&token(now() - 3600, "app")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Authentication);
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let verifier = TokenVerifier::from_config(
            &HttpAuthConfig::with_secret(SECRET).with_issuer("https://other.example.com"),
        )
        .unwrap();
        assert!(verifier.verify(&token(now() + 600, "app")).is_err());
    }

    #[test]
    fn test_blank_issuer_is_not_checked() {
        let verifier =
            TokenVerifier::from_config(&HttpAuthConfig::with_secret(SECRET).with_issuer("  "))
                .unwrap();
        assert!(verifier.verify(&token(now() + 600, "app")).is_ok());
    }

    #[test]
    fn test_authorized_parties() {
        let verifier = TokenVerifier::from_config(
            &HttpAuthConfig::with_secret(SECRET)
                .with_authorized_parties(vec!["https://app.example.com".into()]),
        )
        .unwrap();
        assert!(
            verifier
                .verify(&token(now() + 600, "https://app.example.com"))
                .is_ok()
        );
        assert!(
            verifier
                .verify(&token(now() + 600, "https://evil.example.com"))
                .is_err()
        );
    }

    #[test]
    fn test_invalid_pem_is_a_configuration_error() {
        let result = TokenVerifier::from_config(&HttpAuthConfig::with_public_key_pem("not a pem"));
        assert_eq!(
            result.err().map(|e| e.kind()),
            Some(crate::ErrorKind::Configuration)
        );
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&bearer("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&bearer("bearer   abc")), Some("abc"));
        assert_eq!(bearer_token(&bearer("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&bearer("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_context_without_verifier_is_anonymous() {
        let context = resolve_auth_context(None, &bearer(&format!("Bearer {}", token(now() + 600, "app"))));
        assert!(context.credential_present);
        assert!(!context.is_authenticated());
    }

    #[test]
    fn test_context_with_garbage_token_never_rejects() {
        let verifier = verifier();
        let context = resolve_auth_context(Some(&verifier), &bearer("Bearer not-a-jwt"));
        assert_eq!(
            context,
            AuthContext {
                credential_present: true,
                identity: None
            }
        );

        let context = resolve_auth_context(Some(&verifier), &HeaderMap::new());
        assert_eq!(context, AuthContext::anonymous());
    }
}
