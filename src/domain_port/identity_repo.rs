use crate::application_port::AuthError;
use crate::domain_model::{RoleName, UserId};

/// Identity as the user backend currently knows it: role names plus the
/// stored credential hash.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<RoleName>,
    pub is_active: bool,
}

/// External collaborator used to materialize a verified principal. The
/// auth core never writes through this port.
#[async_trait::async_trait]
pub trait IdentityRepo: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, AuthError>;
}
