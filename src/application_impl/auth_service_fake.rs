use crate::application_port::*;
use crate::domain_model::{Principal, RoleName, UserId, Username};
use chrono::{Duration, Utc};

#[derive(Debug)]
pub struct FakeAuthService;

impl FakeAuthService {
    pub fn new() -> Self {
        Self
    }
}

// Minimal fake implementation for basic wiring only.
// Extend to simulate more error cases and configurable responses when needed.
#[async_trait::async_trait]
impl AuthService for FakeAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        Ok(LoginResult {
            principal: get_fake_principal(&request.username),
            tokens: get_fake_tokens(&request.username),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError> {
        if let Some(username) = refresh_token.strip_prefix("fake-refresh-token:") {
            Ok(LoginResult {
                principal: get_fake_principal(username),
                tokens: get_fake_tokens(username),
            })
        } else {
            Err(AuthError::Malformed)
        }
    }

    async fn logout(&self, request: LogoutInput) -> LogoutOutcome {
        let subject = request
            .access_token
            .as_deref()
            .and_then(|t| t.strip_prefix("fake-access-token:"))
            .or_else(|| {
                request
                    .refresh_token
                    .as_deref()
                    .and_then(|t| t.strip_prefix("fake-refresh-token:"))
            })
            .map(Username::from);
        LogoutOutcome { subject }
    }

    async fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError> {
        if let Some(username) = raw_token.strip_prefix("fake-access-token:") {
            Ok(get_fake_principal(username))
        } else {
            Err(AuthError::Malformed)
        }
    }
}

fn get_fake_principal(username: &str) -> Principal {
    Principal {
        user_id: UserId(uuid::Uuid::new_v5(
            &uuid::Uuid::NAMESPACE_OID,
            username.as_bytes(),
        )),
        username: Username::from(username),
        roles: vec![RoleName::from("ROLE_USER")],
    }
}

fn get_fake_tokens(username: &str) -> AuthTokens {
    let now = Utc::now();
    AuthTokens {
        access_token: AccessToken(format!("fake-access-token:{}", username)),
        access_token_expires_at: now + Duration::hours(1),
        refresh_token: RefreshToken(format!("fake-refresh-token:{}", username)),
        refresh_token_expires_at: now + Duration::hours(12),
    }
}
