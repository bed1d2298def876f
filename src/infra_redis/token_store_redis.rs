use crate::application_port::AuthError;
use crate::domain_model::{TokenKind, Username};
use crate::domain_port::TokenStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

const ACCESS_TOKEN_PREFIX: &str = "access_token";
const REFRESH_TOKEN_PREFIX: &str = "refresh_token";
const BLACKLIST_PREFIX: &str = "blacklist";

pub struct RedisTokenStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisTokenStore {
    pub fn new(conn: ConnectionManager, op_timeout: Duration) -> Self {
        RedisTokenStore { conn, op_timeout }
    }

    fn token_key(subject: &Username, kind: TokenKind) -> String {
        let prefix = match kind {
            TokenKind::Access => ACCESS_TOKEN_PREFIX,
            TokenKind::Refresh => REFRESH_TOKEN_PREFIX,
        };
        format!("{}:{}", prefix, subject)
    }

    fn blacklist_key(raw_token: &str) -> String {
        format!("{}:{}", BLACKLIST_PREFIX, raw_token)
    }

    /// No credential check may block indefinitely on the backend; a timeout
    /// surfaces as a store error, which callers treat as unauthenticated.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, redis::RedisError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| AuthError::Store(e.to_string())),
            Err(_) => Err(AuthError::Store("redis operation timed out".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(
        &self,
        subject: &Username,
        kind: TokenKind,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let key = Self::token_key(subject, kind);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.set_ex(&key, token, ttl_secs).await })
            .await
    }

    async fn get(&self, subject: &Username, kind: TokenKind) -> Result<Option<String>, AuthError> {
        let key = Self::token_key(subject, kind);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get(&key).await }).await
    }

    async fn revoke(&self, raw_token: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let key = Self::blacklist_key(raw_token);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.set_ex(&key, "blacklisted", ttl_secs).await })
            .await
    }

    async fn is_revoked(&self, raw_token: &str) -> Result<bool, AuthError> {
        let key = Self::blacklist_key(raw_token);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.exists(&key).await }).await
    }

    async fn clear_subject(&self, subject: &Username) -> Result<(), AuthError> {
        let keys = [
            Self::token_key(subject, TokenKind::Access),
            Self::token_key(subject, TokenKind::Refresh),
        ];
        let mut conn = self.conn.clone();
        let _: usize = self.bounded(async move { conn.del(&keys).await }).await?;
        Ok(())
    }
}
