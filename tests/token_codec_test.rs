use std::time::Duration;
use wicket::application_impl::{JwtConfig, JwtHs256Codec};
use wicket::application_port::{AuthError, TokenCodec};
use wicket::domain_model::{RoleName, TokenKind, Username};

fn codec_with(key: &str, access_secs: u64, refresh_secs: u64) -> JwtHs256Codec {
    JwtHs256Codec::new(JwtConfig {
        issuer: "wicket.auth".to_string(),
        audience: "wicket-client".to_string(),
        access_ttl: Duration::from_secs(access_secs),
        refresh_ttl: Duration::from_secs(refresh_secs),
        signing_key: key.as_bytes().to_vec(),
    })
}

fn codec() -> JwtHs256Codec {
    codec_with("test-secret", 3600, 43200)
}

#[tokio::test]
async fn issue_then_verify_round_trips_subject_and_kind() {
    let codec = codec();
    let subject = Username::from("alice");
    let roles = [RoleName::from("ROLE_USER"), RoleName::from("ROLE_ADMIN")];

    let (token, expires_at) = codec
        .issue(&subject, TokenKind::Access, &roles)
        .await
        .unwrap();
    let credential = codec.verify(&token).await.unwrap();

    assert_eq!(credential.subject, subject);
    assert_eq!(credential.kind, TokenKind::Access);
    assert_eq!(credential.expires_at, expires_at);
    assert_eq!(credential.roles.len(), 2);
    assert!(credential.roles.contains(&RoleName::from("ROLE_ADMIN")));
}

#[tokio::test]
async fn refresh_tokens_carry_no_roles() {
    let codec = codec();
    let subject = Username::from("alice");

    let (token, _) = codec
        .issue(&subject, TokenKind::Refresh, &[RoleName::from("ROLE_USER")])
        .await
        .unwrap();
    let credential = codec.verify(&token).await.unwrap();

    assert_eq!(credential.kind, TokenKind::Refresh);
    assert!(credential.roles.is_empty());
}

#[tokio::test]
async fn two_issuances_produce_distinct_tokens() {
    let codec = codec();
    let subject = Username::from("alice");

    let (first, _) = codec.issue(&subject, TokenKind::Access, &[]).await.unwrap();
    let (second, _) = codec.issue(&subject, TokenKind::Access, &[]).await.unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn verify_rejects_expired_token() {
    let codec = codec_with("test-secret", 0, 0);
    let subject = Username::from("alice");

    let (token, _) = codec.issue(&subject, TokenKind::Access, &[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let err = codec.verify(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Expired), "got {:?}", err);
}

#[tokio::test]
async fn verify_rejects_foreign_signature() {
    let forger = codec_with("other-secret", 3600, 43200);
    let subject = Username::from("alice");

    let (token, _) = forger
        .issue(&subject, TokenKind::Access, &[])
        .await
        .unwrap();

    let err = codec().verify(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature), "got {:?}", err);
}

#[tokio::test]
async fn verify_rejects_garbage() {
    let err = codec().verify("not-a-token").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed), "got {:?}", err);

    let err = codec().verify("aaaa.bbbb.cccc").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed), "got {:?}", err);
}

#[tokio::test]
async fn extraction_works_on_expired_tokens() {
    let codec = codec_with("test-secret", 0, 0);
    let subject = Username::from("alice");

    let (token, _) = codec
        .issue(&subject, TokenKind::Refresh, &[])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(codec.extract_subject(&token).await.unwrap(), subject);
    assert_eq!(
        codec.extract_kind(&token).await.unwrap(),
        TokenKind::Refresh
    );
}

#[tokio::test]
async fn extraction_fails_malformed_on_unparseable_input() {
    let err = codec().extract_subject("garbage").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed), "got {:?}", err);

    let err = codec().extract_kind("garbage").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed), "got {:?}", err);
}
