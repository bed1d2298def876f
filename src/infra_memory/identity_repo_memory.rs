use crate::application_port::AuthError;
use crate::domain_model::{RoleName, UserId, Username};
use crate::domain_port::{IdentityRecord, IdentityRepo};
use dashmap::DashMap;

/// Identity backend holding records seeded at assembly time. Starts empty,
/// so every login against an unseeded instance fails with bad credentials.
#[derive(Default)]
pub struct MemoryIdentityRepo {
    records: DashMap<String, IdentityRecord>,
}

impl MemoryIdentityRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: IdentityRecord) {
        self.records.insert(record.username.clone(), record);
    }

    pub fn insert_user(&self, username: &Username, password_hash: &str, roles: &[&str]) {
        self.insert(IdentityRecord {
            user_id: UserId(uuid::Uuid::new_v4()),
            username: username.0.clone(),
            password_hash: password_hash.to_owned(),
            roles: roles.iter().copied().map(RoleName::from).collect(),
            is_active: true,
        });
    }

    pub fn deactivate(&self, username: &Username) {
        if let Some(mut record) = self.records.get_mut(username.as_str()) {
            record.is_active = false;
        }
    }
}

#[async_trait::async_trait]
impl IdentityRepo for MemoryIdentityRepo {
    async fn get_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, AuthError> {
        Ok(self.records.get(username).map(|r| r.value().clone()))
    }
}
