use crate::application_port::*;
use crate::domain_model::{Credential, Principal, RoleName, TokenKind, Username};
use crate::domain_port::{IdentityRecord, IdentityRepo, TokenStore};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let argon2 = argon2::Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::Internal(format!("invalid PHC hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!("verify error: {}", e))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

/// One claim set for both kinds; `kind` disambiguates so a refresh token
/// can never pass as an access token. Roles ride only on access tokens.
/// The jti keeps two tokens issued in the same second distinct, which the
/// store comparison in `refresh` relies on.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    kind: TokenKind,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roles: Option<Vec<String>>,
}

impl Claims {
    fn into_credential(self) -> Result<Credential, AuthError> {
        let issued_at = DateTime::from_timestamp(self.iat, 0).ok_or(AuthError::Malformed)?;
        let expires_at = DateTime::from_timestamp(self.exp, 0).ok_or(AuthError::Malformed)?;
        Ok(Credential {
            subject: Username(self.sub),
            kind: self.kind,
            issued_at,
            expires_at,
            roles: self
                .roles
                .unwrap_or_default()
                .into_iter()
                .map(RoleName)
                .collect(),
        })
    }
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = validate_exp;
        // tokens are issued and checked by the same process; no skew to absorb
        v.leeway = 0;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        v
    }

    fn decode_claims(&self, token: &str, validate_exp: bool) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &self.validation(validate_exp),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed,
        })?;
        Ok(data.claims)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue(
        &self,
        subject: &Username,
        kind: TokenKind,
        roles: &[RoleName],
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        };
        // whole-second timestamps, so the returned expiry is exactly what
        // the claim says
        let iat = Utc::now().timestamp();
        let exp = iat + ttl.as_secs() as i64;
        let exp_dt = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::Internal("expiry timestamp out of range".to_string()))?;
        let claims = Claims {
            sub: subject.0.clone(),
            kind,
            exp,
            iat,
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            roles: match kind {
                TokenKind::Access => Some(roles.iter().map(|r| r.0.clone()).collect()),
                TokenKind::Refresh => None,
            },
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok((token, exp_dt))
    }

    async fn verify(&self, token: &str) -> Result<Credential, AuthError> {
        self.decode_claims(token, true)?.into_credential()
    }

    async fn peek(&self, token: &str) -> Result<Credential, AuthError> {
        // expiry is a separate concern from parseability
        self.decode_claims(token, false)?.into_credential()
    }
}

fn ttl_secs(until: DateTime<Utc>) -> u64 {
    let secs = (until - Utc::now()).num_seconds();
    if secs <= 0 { 1 } else { secs as u64 }
}

pub struct RealAuthService {
    identity_repo: Arc<dyn IdentityRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    token_store: Arc<dyn TokenStore>,
}

impl RealAuthService {
    pub fn new(
        identity_repo: Arc<dyn IdentityRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            identity_repo,
            credential_hasher,
            token_codec,
            token_store,
        }
    }

    async fn resolve_active(&self, username: &str) -> Result<IdentityRecord, AuthError> {
        let rec = self
            .identity_repo
            .get_by_username(username)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;
        if !rec.is_active {
            return Err(AuthError::SubjectNotFound);
        }
        Ok(rec)
    }

    fn principal_of(rec: &IdentityRecord) -> Principal {
        Principal {
            user_id: rec.user_id,
            username: Username::new(rec.username.clone()),
            roles: rec.roles.clone(),
        }
    }

    /// Rotation is "issue new, store new": the old pair stays verifiable by
    /// signature until the store overwrite lands, and the store comparison
    /// in `refresh` is what retires it.
    async fn issue_pair(&self, rec: &IdentityRecord) -> Result<AuthTokens, AuthError> {
        let subject = Username::new(rec.username.clone());

        let (access_token, access_exp) = self
            .token_codec
            .issue(&subject, TokenKind::Access, &rec.roles)
            .await?;
        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue(&subject, TokenKind::Refresh, &[])
            .await?;

        self.token_store
            .put(
                &subject,
                TokenKind::Access,
                &access_token,
                ttl_secs(access_exp),
            )
            .await?;
        self.token_store
            .put(
                &subject,
                TokenKind::Refresh,
                &refresh_token,
                ttl_secs(refresh_exp),
            )
            .await?;

        Ok(AuthTokens {
            access_token: AccessToken(access_token),
            refresh_token: RefreshToken(refresh_token),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = request;

        // every identity failure collapses into one caller-visible error
        let rec = self
            .resolve_active(&username)
            .await
            .map_err(|_| AuthError::BadCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::BadCredentials);
        }

        let tokens = self.issue_pair(&rec).await?;

        Ok(LoginResult {
            principal: Self::principal_of(&rec),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError> {
        let kind = self.token_codec.extract_kind(refresh_token).await?;
        if kind != TokenKind::Refresh {
            return Err(AuthError::WrongKind);
        }

        let credential = self.token_codec.verify(refresh_token).await?;
        let rec = self.resolve_active(credential.subject.as_str()).await?;

        // reuse detection: only the token currently on record is authoritative
        let authoritative = self
            .token_store
            .get(&credential.subject, TokenKind::Refresh)
            .await?;
        match authoritative {
            Some(stored) if stored == refresh_token => {}
            _ => return Err(AuthError::ReuseDetected),
        }

        let tokens = self.issue_pair(&rec).await?;

        Ok(LoginResult {
            principal: Self::principal_of(&rec),
            tokens,
        })
    }

    async fn logout(&self, request: LogoutInput) -> LogoutOutcome {
        let LogoutInput {
            access_token,
            refresh_token,
        } = request;

        let mut subject = None;
        if let Some(token) = access_token.as_deref() {
            subject = self.token_codec.extract_subject(token).await.ok();
        }
        if subject.is_none() {
            if let Some(token) = refresh_token.as_deref() {
                subject = self.token_codec.extract_subject(token).await.ok();
            }
        }

        if let Some(token) = access_token.as_deref() {
            if let Ok(credential) = self.token_codec.peek(token).await {
                let remaining = credential.remaining_secs(Utc::now());
                if remaining > 0 {
                    if let Err(e) = self.token_store.revoke(token, remaining).await {
                        warn!("logout: revoking access token failed: {}", e);
                    }
                }
            }
        }

        if let Some(subject) = &subject {
            if let Err(e) = self.token_store.clear_subject(subject).await {
                warn!("logout: clearing tokens for {} failed: {}", subject, e);
            }
        }

        LogoutOutcome { subject }
    }

    async fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError> {
        // a store outage here means revoked-unknown: fail closed
        if self.token_store.is_revoked(raw_token).await? {
            return Err(AuthError::Revoked);
        }

        let credential = self.token_codec.verify(raw_token).await?;
        if credential.kind != TokenKind::Access {
            return Err(AuthError::WrongKind);
        }

        let rec = self.resolve_active(credential.subject.as_str()).await?;

        Ok(Self::principal_of(&rec))
    }
}
