use crate::application_port::AuthError;
use crate::domain_model::{RoleName, UserId};
use crate::domain_port::{IdentityRecord, IdentityRepo};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlIdentityRepo {
    pool: MySqlPool,
}

impl MySqlIdentityRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlIdentityRepo { pool }
    }

    #[inline]
    fn uid_from_bytes(id: &[u8]) -> Result<UserId, AuthError> {
        Ok(UserId(
            Uuid::from_slice(id).map_err(|e| AuthError::Store(e.to_string()))?,
        ))
    }

    fn row_to_record(row: &MySqlRow) -> Result<IdentityRecord, AuthError> {
        let member_id_bytes: Vec<u8> = row
            .try_get("member_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = Self::uid_from_bytes(&member_id_bytes)?;

        let username: String = row
            .try_get("username")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let is_active: bool = row
            .try_get("is_active")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(IdentityRecord {
            user_id,
            username,
            password_hash,
            roles: Vec::new(),
            is_active,
        })
    }
}

#[async_trait::async_trait]
impl IdentityRepo for MySqlIdentityRepo {
    async fn get_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT member_id, username, password_hash, is_active
FROM member
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        let Some(row) = row_opt else {
            return Ok(None);
        };
        let mut record = Self::row_to_record(&row)?;

        let role_rows = sqlx::query(
            r#"
SELECT r.name
FROM role r
JOIN member_role mr ON mr.role_id = r.role_id
JOIN member m ON m.member_id = mr.member_id
WHERE m.username = ?
"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        record.roles = role_rows
            .iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map(RoleName)
                    .map_err(|e| AuthError::Store(e.to_string()))
            })
            .collect::<Result<_, _>>()?;

        Ok(Some(record))
    }
}
