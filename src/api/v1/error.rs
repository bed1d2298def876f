use crate::api::pages::PageUnauthorized;
use crate::application_port::AuthError;
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::{StatusCode, Uri};
use warp::{Rejection, Reply, reject};

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("Refresh token cookie is missing")]
    MissingRefreshToken,
    #[error("Not a refresh token")]
    WrongTokenKind,
    #[error("Refresh token has expired")]
    ExpiredRefreshToken,
    #[error("Refresh token reused or superseded")]
    ReusedRefreshToken,
    #[error("Refresh token is not valid")]
    InvalidRefreshToken,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    /// Login failures collapse into one message; nothing in the response
    /// says whether the username or the password was wrong.
    pub fn from_login(error: AuthError) -> ApiErrorCode {
        match error {
            AuthError::BadCredentials => ApiErrorCode::InvalidCredentials,
            e => Self::internal(e),
        }
    }

    /// Rotation failures stay distinguishable: reuse means the client
    /// should drop the whole session, plain expiry means re-login.
    pub fn from_refresh(error: AuthError) -> ApiErrorCode {
        match error {
            AuthError::WrongKind => ApiErrorCode::WrongTokenKind,
            AuthError::Expired => ApiErrorCode::ExpiredRefreshToken,
            AuthError::ReuseDetected => ApiErrorCode::ReusedRefreshToken,
            AuthError::Malformed
            | AuthError::InvalidSignature
            | AuthError::Revoked
            | AuthError::SubjectNotFound
            | AuthError::BadCredentials => ApiErrorCode::InvalidRefreshToken,
            e => Self::internal(e),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::Unauthorized
            | ApiErrorCode::MissingRefreshToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::WrongTokenKind
            | ApiErrorCode::ExpiredRefreshToken
            | ApiErrorCode::ReusedRefreshToken
            | ApiErrorCode::InvalidRefreshToken => StatusCode::BAD_REQUEST,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

pub async fn recover_error(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if err.find::<PageUnauthorized>().is_some() {
        return Ok(warp::redirect::found(Uri::from_static("/login")).into_response());
    }

    if let Some(code) = err.find::<ApiErrorCode>() {
        let body = match code {
            ApiErrorCode::Unauthorized => json!({"error": "unauthorized"}),
            _ => json!({"message": code.to_string()}),
        };
        let reply = warp::reply::json(&body);
        return Ok(warp::reply::with_status(reply, code.status()).into_response());
    }

    if err.is_not_found() {
        let reply = warp::reply::json(&json!({"message": "not found"}));
        return Ok(warp::reply::with_status(reply, StatusCode::NOT_FOUND).into_response());
    }

    let reply = warp::reply::json(&json!({"message": format!("Unhandled error: {:?}", err)}));
    Ok(warp::reply::with_status(reply, StatusCode::INTERNAL_SERVER_ERROR).into_response())
}
