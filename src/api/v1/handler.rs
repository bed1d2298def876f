use super::error::ApiErrorCode;
use super::router::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, bearer_token};
use crate::application_port::{AuthService, AuthTokens, LoginInput, LogoutInput};
use crate::domain_model::{Principal, S2CEvent, SessionEnded};
use crate::server::{ConnectionAcceptor, OutboundQueue};
use chrono::Utc;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use warp::http::HeaderValue;
use warp::http::header::SET_COOKIE;
use warp::{self, Reply, reject};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    username: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    username: String,
}

fn session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clearing_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", 0, secure)
}

fn append_cookie(response: &mut warp::reply::Response, cookie: &str) -> Result<(), ApiErrorCode> {
    let value = HeaderValue::from_str(cookie).map_err(ApiErrorCode::internal)?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

/// Dual-channel delivery: the access token rides in the body for API
/// clients, and both tokens are set as HTTP-only cookies for the browser.
fn token_reply(
    username: &str,
    tokens: &AuthTokens,
    secure: bool,
) -> Result<warp::reply::Response, ApiErrorCode> {
    let now = Utc::now();
    let access_max_age = (tokens.access_token_expires_at - now).num_seconds().max(0);
    let refresh_max_age = (tokens.refresh_token_expires_at - now).num_seconds().max(0);

    let body = TokenResponse {
        access_token: tokens.access_token.0.clone(),
        username: username.to_owned(),
    };
    let mut response = warp::reply::json(&body).into_response();
    append_cookie(
        &mut response,
        &session_cookie(
            ACCESS_TOKEN_COOKIE,
            &tokens.access_token.0,
            access_max_age,
            secure,
        ),
    )?;
    append_cookie(
        &mut response,
        &session_cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token.0,
            refresh_max_age,
            secure,
        ),
    )?;
    Ok(response)
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
    secure: bool,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from_login)
        .map_err(reject::custom)?;

    debug!("login succeeded for {}", result.principal.username);
    token_reply(
        result.principal.username.as_str(),
        &result.tokens,
        secure,
    )
    .map_err(reject::custom)
}

pub async fn refresh(
    refresh_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    secure: bool,
) -> Result<impl warp::Reply, warp::Rejection> {
    let presented = refresh_cookie
        .filter(|c| !c.is_empty())
        .ok_or_else(|| reject::custom(ApiErrorCode::MissingRefreshToken))?;

    let result = auth_service
        .refresh(&presented)
        .await
        .map_err(ApiErrorCode::from_refresh)
        .map_err(reject::custom)?;

    debug!("token rotation succeeded for {}", result.principal.username);
    token_reply(
        result.principal.username.as_str(),
        &result.tokens,
        secure,
    )
    .map_err(reject::custom)
}

pub async fn logout(
    body: Option<LogoutRequest>,
    auth_header: Option<String>,
    access_cookie: Option<String>,
    refresh_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    outbound_queue: Arc<dyn OutboundQueue>,
    secure: bool,
) -> Result<impl warp::Reply, warp::Rejection> {
    // extraction order: body, then bearer header, then cookie
    let access_token = body
        .and_then(|b| b.access_token)
        .or_else(|| bearer_token(auth_header))
        .or(access_cookie)
        .filter(|t| !t.is_empty());

    let outcome = auth_service
        .logout(LogoutInput {
            access_token,
            refresh_token: refresh_cookie.filter(|t| !t.is_empty()),
        })
        .await;

    // notify a live streaming connection, off the response path
    if let Some(subject) = outcome.subject {
        tokio::spawn(async move {
            let event = S2CEvent::SessionEnded(SessionEnded {
                reason: "signed out".to_owned(),
            });
            if let Err(e) = outbound_queue.enqueue(&subject, &event).await {
                debug!("no live connection to notify for {}: {}", subject, e);
            }
        });
    }

    let body = MessageResponse {
        message: "signed out".to_owned(),
    };
    let mut response = warp::reply::json(&body).into_response();
    append_cookie(&mut response, &clearing_cookie(ACCESS_TOKEN_COOKIE, secure))
        .map_err(reject::custom)?;
    append_cookie(&mut response, &clearing_cookie(REFRESH_TOKEN_COOKIE, secure))
        .map_err(reject::custom)?;
    Ok(response)
}

pub async fn validate(principal: Principal) -> Result<impl warp::Reply, warp::Rejection> {
    let response = ValidateResponse {
        username: principal.username.to_string(),
    };
    Ok(warp::reply::json(&response))
}

pub async fn join_session(
    socket: warp::ws::WebSocket,
    principal: Principal,
    connection_acceptor: Arc<dyn ConnectionAcceptor>,
) {
    let (s2c, c2s) = socket.split();
    if let Err(e) = connection_acceptor
        .accept_connection(Box::new(s2c), Box::new(c2s), principal)
        .await
    {
        error!("accepting connection: {}", e);
    }
}
