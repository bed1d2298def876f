use super::error::ApiErrorCode;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::Principal;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use warp::{Filter, reject};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with_secure(server.secure_cookies))
        .and_then(handler::login);

    // rotation reads the refresh cookie and nothing else
    let refresh = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(REFRESH_TOKEN_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with_secure(server.secure_cookies))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(optional_json_body())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::cookie::optional::<String>(ACCESS_TOKEN_COOKIE))
        .and(warp::cookie::optional::<String>(REFRESH_TOKEN_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with(server.outbound_queue.clone()))
        .and(with_secure(server.secure_cookies))
        .and_then(handler::logout);

    let validate = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("validate"))
        .and(warp::path::end())
        .and(with_api_authorization(server.auth_service.clone()))
        .and_then(handler::validate);

    let connect = warp::get()
        .and(warp::path("connect"))
        .and(warp::path::end())
        .and(with_handshake_verification(server.auth_service.clone()))
        .and(warp::ws())
        .and(with(server.connection_acceptor.clone()))
        .map(
            |principal: Principal,
             ws: warp::ws::Ws,
             connection_acceptor: Arc<dyn ConnectionAcceptor>| {
                ws.on_upgrade(move |socket| {
                    handler::join_session(socket, principal, connection_acceptor)
                })
            },
        );

    login.or(refresh).or(logout).or(validate).or(connect)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_secure(secure: bool) -> impl Filter<Extract = (bool,), Error = Infallible> + Clone {
    warp::any().map(move || secure)
}

fn optional_json_body()
-> impl Filter<Extract = (Option<handler::LogoutRequest>,), Error = warp::Rejection> + Clone {
    warp::body::json()
        .map(Some)
        .or_else(|_| async { Ok::<(Option<handler::LogoutRequest>,), warp::Rejection>((None,)) })
}

pub(crate) fn bearer_token(header: Option<String>) -> Option<String> {
    header.and_then(|h| h.strip_prefix("Bearer ").map(str::to_owned))
}

/// Per-request credential pass: cookie first, then bearer header. The
/// extractor list is closed; a token in the query string or a form field is
/// never honored. Any failure leaves the request unauthenticated and the
/// accept/reject decision with the route's own authorization guard.
pub fn with_soft_authentication(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Option<Principal>,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(ACCESS_TOKEN_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .then(move |cookie: Option<String>, header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let candidate = cookie
                    .filter(|c| !c.is_empty())
                    .or_else(|| bearer_token(header));
                let Some(raw_token) = candidate else {
                    return None;
                };
                match auth_service.authenticate(&raw_token).await {
                    Ok(principal) => Some(principal),
                    Err(e) => {
                        debug!("request authentication failed: {}", e);
                        None
                    }
                }
            }
        })
}

pub fn with_api_authorization(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    with_soft_authentication(auth_service).and_then(|principal: Option<Principal>| async move {
        principal.ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))
    })
}

/// Handshake policy: header only, and every failure mode tears the
/// handshake down before any message exchange. A connection that slipped
/// through unauthenticated would never be re-checked.
fn with_handshake_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let Some(token) = bearer_token(header) else {
                return Err(reject::custom(ApiErrorCode::Unauthorized));
            };
            match auth_service.authenticate(&token).await {
                Ok(principal) => Ok(principal),
                Err(e) => {
                    warn!("handshake authentication failed: {}", e);
                    Err(reject::custom(ApiErrorCode::Unauthorized))
                }
            }
        }
    })
}
