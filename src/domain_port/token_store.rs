use crate::application_port::AuthError;
use crate::domain_model::{TokenKind, Username};

/// TTL-keyed store for the live token pair and the revocation set.
///
/// Every operation is atomic at the single-key level only; rotation
/// tolerates a narrow window where the old and new pair coexist. A backend
/// outage surfaces as `AuthError::Store`, which callers treat as
/// unauthenticated (fail closed).
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Upsert the live token of `kind` for `subject`, replacing any prior
    /// value. The store TTL evicts the entry independently of the token's
    /// own embedded expiry.
    async fn put(
        &self,
        subject: &Username,
        kind: TokenKind,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;

    async fn get(&self, subject: &Username, kind: TokenKind) -> Result<Option<String>, AuthError>;

    /// Insert `raw_token` into the revocation set for `ttl_secs` seconds.
    async fn revoke(&self, raw_token: &str, ttl_secs: u64) -> Result<(), AuthError>;

    async fn is_revoked(&self, raw_token: &str) -> Result<bool, AuthError>;

    /// Remove both the access and refresh entries for `subject`. Idempotent.
    async fn clear_subject(&self, subject: &Username) -> Result<(), AuthError>;
}
