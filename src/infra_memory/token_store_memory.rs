use crate::application_port::AuthError;
use crate::domain_model::{TokenKind, Username};
use crate::domain_port::TokenStore;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    token: String,
    expires_at: Instant,
}

/// Process-local store backend. Entries are evicted lazily on read, which
/// is enough for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<(String, TokenKind), Entry>,
    revoked: DashMap<String, Instant>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn deadline(ttl_secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(ttl_secs)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(
        &self,
        subject: &Username,
        kind: TokenKind,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        self.tokens.insert(
            (subject.0.clone(), kind),
            Entry {
                token: token.to_owned(),
                expires_at: Self::deadline(ttl_secs),
            },
        );
        Ok(())
    }

    async fn get(&self, subject: &Username, kind: TokenKind) -> Result<Option<String>, AuthError> {
        let key = (subject.0.clone(), kind);
        if let Some(entry) = self.tokens.get(&key) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.token.clone()));
            }
        } else {
            return Ok(None);
        }
        self.tokens.remove(&key);
        Ok(None)
    }

    async fn revoke(&self, raw_token: &str, ttl_secs: u64) -> Result<(), AuthError> {
        self.revoked
            .insert(raw_token.to_owned(), Self::deadline(ttl_secs));
        Ok(())
    }

    async fn is_revoked(&self, raw_token: &str) -> Result<bool, AuthError> {
        if let Some(deadline) = self.revoked.get(raw_token) {
            if Instant::now() < *deadline {
                return Ok(true);
            }
        } else {
            return Ok(false);
        }
        self.revoked.remove(raw_token);
        Ok(false)
    }

    async fn clear_subject(&self, subject: &Username) -> Result<(), AuthError> {
        self.tokens.remove(&(subject.0.clone(), TokenKind::Access));
        self.tokens.remove(&(subject.0.clone(), TokenKind::Refresh));
        Ok(())
    }
}
