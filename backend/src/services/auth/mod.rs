//! Public account endpoints: self-service enrollment and login. Both answer with a
//! bearer token.

mod enroll;
mod login;

use actix_web::web::{post, scope};
use actix_web::Scope;
use serde::Serialize;

const API_PATH: &str = "/api/auth";

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

/// Registered routes:
///
/// * `POST /enroll` (`enroll::process`): creates a `user` account.
/// * `POST /login` (`login::process`): exchanges NSTIN and password for a token.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/enroll", post().to(enroll::process))
        .route("/login", post().to(login::process))
}
