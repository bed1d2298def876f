use std::sync::Arc;
use std::time::Duration;
use wicket::application_impl::{Argon2PasswordHasher, JwtConfig, JwtHs256Codec, RealAuthService};
use wicket::application_port::{
    AuthError, AuthService, CredentialHasher, LoginInput, LogoutInput, TokenCodec,
};
use wicket::domain_model::{TokenKind, Username};
use wicket::domain_port::TokenStore;
use wicket::infra_memory::{MemoryIdentityRepo, MemoryTokenStore};

const PASSWORD: &str = "correct horse";

fn test_codec() -> Arc<JwtHs256Codec> {
    Arc::new(JwtHs256Codec::new(JwtConfig {
        issuer: "wicket.auth".to_string(),
        audience: "wicket-client".to_string(),
        access_ttl: Duration::from_secs(3600),
        refresh_ttl: Duration::from_secs(43200),
        signing_key: b"test-secret".to_vec(),
    }))
}

struct Harness {
    service: RealAuthService,
    identity: Arc<MemoryIdentityRepo>,
    store: Arc<MemoryTokenStore>,
    codec: Arc<JwtHs256Codec>,
}

async fn harness() -> Harness {
    let identity = Arc::new(MemoryIdentityRepo::new());
    let hash = Argon2PasswordHasher.hash_password(PASSWORD).await.unwrap();
    identity.insert_user(&Username::from("alice"), &hash, &["ROLE_USER"]);

    let codec = test_codec();
    let store = Arc::new(MemoryTokenStore::new());
    let service = RealAuthService::new(
        identity.clone(),
        Arc::new(Argon2PasswordHasher),
        codec.clone(),
        store.clone(),
    );

    Harness {
        service,
        identity,
        store,
        codec,
    }
}

fn login_input(password: &str) -> LoginInput {
    LoginInput {
        username: "alice".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn login_issues_verifiable_pair_and_persists_it() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    assert_eq!(result.principal.username, Username::from("alice"));
    assert!(result.principal.has_role("ROLE_USER"));

    let credential = h
        .codec
        .verify(&result.tokens.access_token.0)
        .await
        .unwrap();
    assert_eq!(credential.subject, Username::from("alice"));
    assert_eq!(credential.kind, TokenKind::Access);

    let stored = h
        .store
        .get(&Username::from("alice"), TokenKind::Refresh)
        .await
        .unwrap();
    assert_eq!(stored, Some(result.tokens.refresh_token.0.clone()));
}

#[tokio::test]
async fn login_collapses_identity_failures_into_bad_credentials() {
    let h = harness().await;

    let err = h.service.login(login_input("wrong")).await.unwrap_err();
    assert!(matches!(err, AuthError::BadCredentials), "got {:?}", err);

    let err = h
        .service
        .login(LoginInput {
            username: "nobody".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::BadCredentials), "got {:?}", err);
}

#[tokio::test]
async fn authenticate_accepts_a_fresh_access_token() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    let principal = h
        .service
        .authenticate(&result.tokens.access_token.0)
        .await
        .unwrap();

    assert_eq!(principal.username, Username::from("alice"));
    assert!(principal.has_role("ROLE_USER"));
}

#[tokio::test]
async fn authenticate_rejects_a_refresh_token() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    let err = h
        .service
        .authenticate(&result.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WrongKind), "got {:?}", err);
}

#[tokio::test]
async fn authenticate_rejects_a_deactivated_subject() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    h.identity.deactivate(&Username::from("alice"));

    let err = h
        .service
        .authenticate(&result.tokens.access_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SubjectNotFound), "got {:?}", err);
}

#[tokio::test]
async fn refresh_rotates_the_pair() {
    let h = harness().await;

    let first = h.service.login(login_input(PASSWORD)).await.unwrap();
    let second = h
        .service
        .refresh(&first.tokens.refresh_token.0)
        .await
        .unwrap();

    assert_ne!(
        first.tokens.refresh_token.0,
        second.tokens.refresh_token.0
    );
    assert_ne!(first.tokens.access_token.0, second.tokens.access_token.0);

    let stored = h
        .store
        .get(&Username::from("alice"), TokenKind::Refresh)
        .await
        .unwrap();
    assert_eq!(stored, Some(second.tokens.refresh_token.0.clone()));
}

#[tokio::test]
async fn presenting_a_superseded_refresh_token_is_reuse() {
    let h = harness().await;

    let first = h.service.login(login_input(PASSWORD)).await.unwrap();
    h.service
        .refresh(&first.tokens.refresh_token.0)
        .await
        .unwrap();

    // the same, validly signed token a second time
    let err = h
        .service
        .refresh(&first.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReuseDetected), "got {:?}", err);
}

#[tokio::test]
async fn refresh_rejects_an_access_token() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    let err = h
        .service
        .refresh(&result.tokens.access_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WrongKind), "got {:?}", err);
}

#[tokio::test]
async fn refresh_after_logout_is_reuse() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    h.service
        .logout(LogoutInput {
            access_token: Some(result.tokens.access_token.0.clone()),
            refresh_token: Some(result.tokens.refresh_token.0.clone()),
        })
        .await;

    let err = h
        .service
        .refresh(&result.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReuseDetected), "got {:?}", err);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    let access_token = result.tokens.access_token.0.clone();

    let outcome = h
        .service
        .logout(LogoutInput {
            access_token: Some(access_token.clone()),
            refresh_token: None,
        })
        .await;
    assert_eq!(outcome.subject, Some(Username::from("alice")));

    assert!(h.store.is_revoked(&access_token).await.unwrap());
    let err = h.service.authenticate(&access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Revoked), "got {:?}", err);
}

#[tokio::test]
async fn logout_never_fails() {
    let h = harness().await;

    let outcome = h
        .service
        .logout(LogoutInput {
            access_token: None,
            refresh_token: None,
        })
        .await;
    assert_eq!(outcome.subject, None);

    let outcome = h
        .service
        .logout(LogoutInput {
            access_token: Some("garbage".to_string()),
            refresh_token: Some("also garbage".to_string()),
        })
        .await;
    assert_eq!(outcome.subject, None);
}

#[tokio::test]
async fn logout_resolves_the_subject_from_the_refresh_token_alone() {
    let h = harness().await;

    let result = h.service.login(login_input(PASSWORD)).await.unwrap();
    let outcome = h
        .service
        .logout(LogoutInput {
            access_token: None,
            refresh_token: Some(result.tokens.refresh_token.0.clone()),
        })
        .await;
    assert_eq!(outcome.subject, Some(Username::from("alice")));

    let stored = h
        .store
        .get(&Username::from("alice"), TokenKind::Access)
        .await
        .unwrap();
    assert_eq!(stored, None);
}

struct OutageStore;

#[async_trait::async_trait]
impl TokenStore for OutageStore {
    async fn put(
        &self,
        _subject: &Username,
        _kind: TokenKind,
        _token: &str,
        _ttl_secs: u64,
    ) -> Result<(), AuthError> {
        Err(AuthError::Store("backend down".to_string()))
    }

    async fn get(
        &self,
        _subject: &Username,
        _kind: TokenKind,
    ) -> Result<Option<String>, AuthError> {
        Err(AuthError::Store("backend down".to_string()))
    }

    async fn revoke(&self, _raw_token: &str, _ttl_secs: u64) -> Result<(), AuthError> {
        Err(AuthError::Store("backend down".to_string()))
    }

    async fn is_revoked(&self, _raw_token: &str) -> Result<bool, AuthError> {
        Err(AuthError::Store("backend down".to_string()))
    }

    async fn clear_subject(&self, _subject: &Username) -> Result<(), AuthError> {
        Err(AuthError::Store("backend down".to_string()))
    }
}

#[tokio::test]
async fn store_outage_fails_closed() {
    let identity = Arc::new(MemoryIdentityRepo::new());
    let hash = Argon2PasswordHasher.hash_password(PASSWORD).await.unwrap();
    identity.insert_user(&Username::from("alice"), &hash, &["ROLE_USER"]);

    let codec = test_codec();
    let (token, _) = codec
        .issue(&Username::from("alice"), TokenKind::Access, &[])
        .await
        .unwrap();

    let service = RealAuthService::new(
        identity,
        Arc::new(Argon2PasswordHasher),
        codec,
        Arc::new(OutageStore),
    );

    // a validly signed token is still not accepted when the revocation
    // check cannot be answered
    let err = service.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Store(_)), "got {:?}", err);
}
