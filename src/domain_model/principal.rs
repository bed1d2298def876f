use crate::domain_model::{RoleName, UserId, Username};
use serde::Serialize;

/// A verified, request-scoped identity. Never stored; owned by the request
/// or connection that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: Username,
    pub roles: Vec<RoleName>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}
