use crate::api::v1::with_soft_authentication;
use crate::domain_model::Principal;
use crate::server::Server;
use std::sync::Arc;
use warp::{Filter, reject};

/// Marker rejection for unauthenticated browser navigation; the recovery
/// layer turns it into a redirect to the login form instead of a JSON 401.
#[derive(Debug)]
pub struct PageUnauthorized;

impl reject::Reject for PageUnauthorized {}

/// Browser-facing routes. Rendering lives elsewhere; these carry only the
/// enforcement policy for non-API navigation.
pub fn pages(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login_form = warp::get()
        .and(warp::path("login"))
        .and(warp::path::end())
        .map(|| warp::reply::html("<!doctype html><title>Sign in</title>"));

    let profile = warp::get()
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(with_page_authorization(server.auth_service.clone()))
        .map(|principal: Principal| {
            warp::reply::html(format!(
                "<!doctype html><title>{}</title>",
                principal.username
            ))
        });

    login_form.or(profile)
}

fn with_page_authorization(
    auth_service: Arc<dyn crate::application_port::AuthService>,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    with_soft_authentication(auth_service).and_then(|principal: Option<Principal>| async move {
        principal.ok_or_else(|| reject::custom(PageUnauthorized))
    })
}
