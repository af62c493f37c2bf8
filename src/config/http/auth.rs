use {
    crate::{Error, Result, utils::Sensitive},
    serde::Deserialize,
};

///
/// Configuration for verifying bearer tokens.
///
/// Exactly one key source must be set: `jwt_secret` for HS256 tokens or
/// `jwt_public_key_pem` for RS256 tokens. Keep both out of the TOML files by
/// referencing environment variables:
///
/// ```toml
/// [http.auth]
/// jwt_public_key_pem = "{{ AUTH_JWT_PUBLIC_KEY }}"
/// issuer = "https://clerk.talentquotient.dev"
/// authorized_parties = ["https://talent-quotient-frontend.vercel.app"]
/// ```
///
/// Verification never rejects a request. Tokens that fail any check simply
/// produce an anonymous authentication context.
///
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpAuthConfig {
    /// Shared HS256 secret.
    #[serde(default)]
    pub jwt_secret: Option<Sensitive<String>>,

    /// PEM encoded RSA public key for RS256 tokens.
    #[serde(default)]
    pub jwt_public_key_pem: Option<Sensitive<String>>,

    /// Expected `iss` claim. Not checked when unset.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Accepted values of the `azp` claim. Not checked when empty.
    #[serde(default)]
    pub authorized_parties: Vec<String>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    #[serde(default = "HttpAuthConfig::default_leeway")]
    pub leeway: u64,
}

impl HttpAuthConfig {
    fn default_leeway() -> u64 {
        60
    }

    /// Creates a configuration for HS256 tokens signed with `secret`.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            jwt_secret: Some(Sensitive::from(secret)),
            leeway: Self::default_leeway(),
            ..Default::default()
        }
    }

    /// Creates a configuration for RS256 tokens verified with a PEM public key.
    pub fn with_public_key_pem(pem: &str) -> Self {
        Self {
            jwt_public_key_pem: Some(Sensitive::from(pem)),
            leeway: Self::default_leeway(),
            ..Default::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let has_secret = self.jwt_secret.as_ref().is_some_and(|s| !s.0.trim().is_empty());
        let has_pem = self
            .jwt_public_key_pem
            .as_ref()
            .is_some_and(|s| !s.0.trim().is_empty());

        match (has_secret, has_pem) {
            (true, true) => Err(Error::config(
                "[http.auth] accepts either jwt_secret or jwt_public_key_pem, not both.",
            )),
            (false, false) => Err(Error::config(
                "[http.auth] requires jwt_secret or jwt_public_key_pem. Remove the section to disable token verification.",
            )),
            _ => Ok(()),
        }
    }
}
