use crate::domain_model::{RoleName, Username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded credential. Produced only by the token codec, either fully
/// verified (`verify`) or signature-checked with expiry ignored (`peek`).
#[derive(Debug, Clone)]
pub struct Credential {
    pub subject: Username,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub roles: Vec<RoleName>,
}

impl Credential {
    /// Seconds until the embedded expiry, zero if already past it.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let secs = (self.expires_at - now).num_seconds();
        if secs <= 0 { 0 } else { secs as u64 }
    }
}
