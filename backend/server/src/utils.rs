use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::RngCore;
use tracing::warn;

use crate::{database::UserRecord, error::AppError, state::State};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const AUTH_COOKIE: &str = "auth";

pub const CSRF_TOKEN_BYTES: usize = 16;
pub const SESSION_TOKEN_BYTES: usize = 32;

pub fn random_token(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buffer);

    hex::encode(buffer)
}

/// Readable by page scripts, they echo it back in `X-CSRF-Token`.
pub fn csrf_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

pub fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Hands out a CSRF cookie to any client that does not carry one yet.
pub async fn set_csrf_cookie(jar: CookieJar, request: Request, next: Next) -> Response {
    let missing = jar.get(CSRF_COOKIE).is_none();
    let mut response = next.run(request).await;

    if missing {
        match HeaderValue::from_str(&csrf_cookie(random_token(CSRF_TOKEN_BYTES)).to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to build CSRF cookie: {e}"),
        }
    }

    response
}

/// Double-submit check: the header must repeat the cookie.
pub fn validate_csrf(jar: &CookieJar, headers: &HeaderMap) -> Result<(), AppError> {
    let cookie = jar.get(CSRF_COOKIE).map(Cookie::value);
    let header = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => Ok(()),
        _ => Err(AppError::InvalidCsrf),
    }
}

pub fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(AUTH_COOKIE)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
}

pub async fn current_user(state: &State, jar: &CookieJar) -> Result<Option<UserRecord>, AppError> {
    let Some(token) = session_token(jar) else {
        return Ok(None);
    };

    let Some(user_id) = state.database.get_session(token).await? else {
        return Ok(None);
    };

    Ok(state.database.get_user(user_id).await?)
}

pub async fn require_user(state: &State, jar: &CookieJar) -> Result<UserRecord, AppError> {
    current_user(state, jar).await?.ok_or(AppError::Unauthorized)
}

pub fn is_fingerprint(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
