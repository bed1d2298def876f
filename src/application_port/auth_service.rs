use crate::domain_model::{Credential, Principal, RoleName, TokenKind, Username};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token revoked")]
    Revoked,
    #[error("wrong token kind")]
    WrongKind,
    #[error("refresh token reuse detected")]
    ReuseDetected,
    #[error("invalid credentials")]
    BadCredentials,
    #[error("subject not found")]
    SubjectNotFound,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub principal: Principal,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone)]
pub struct LogoutInput {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Logout never fails from the caller's perspective; the subject is
/// reported when one could be resolved from either presented token.
#[derive(Debug, Clone)]
pub struct LogoutOutcome {
    pub subject: Option<Username>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Stateless signing and verification of self-describing tokens. The only
/// process-wide input is the signing key injected at construction.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Sign a token of the given kind. Roles are embedded on access tokens
    /// and ignored for refresh tokens. Returns the compact token and its
    /// expiry instant.
    async fn issue(
        &self,
        subject: &Username,
        kind: TokenKind,
        roles: &[RoleName],
    ) -> Result<(String, DateTime<Utc>), AuthError>;

    /// Full verification: signature first, then expiry.
    async fn verify(&self, token: &str) -> Result<Credential, AuthError>;

    /// Signature-checked decode that ignores expiry. Fails `Malformed` on
    /// anything that does not parse or does not carry a valid signature.
    async fn peek(&self, token: &str) -> Result<Credential, AuthError>;

    async fn extract_subject(&self, token: &str) -> Result<Username, AuthError> {
        Ok(self.peek(token).await?.subject)
    }

    async fn extract_kind(&self, token: &str) -> Result<TokenKind, AuthError> {
        Ok(self.peek(token).await?.kind)
    }
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

/// Session lifecycle orchestration. `authenticate` is the single shared
/// verification pipeline; the HTTP and handshake entry points each apply
/// their own failure policy on top of it (soft-continue vs hard-reject).
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;

    /// Rotate the token pair. The presented token must be of kind refresh,
    /// valid, and identical to the one on record for its subject.
    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError>;

    /// Best-effort session teardown. Revokes the presented access token and
    /// clears stored tokens for whichever subject could be resolved.
    async fn logout(&self, request: LogoutInput) -> LogoutOutcome;

    /// Revocation check, verification, and identity resolution for an
    /// access token candidate.
    async fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError>;
}
