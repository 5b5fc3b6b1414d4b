use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

/// Name of the cookie holding the session token issued by the data service.
pub const SESSION_COOKIE: &str = "ilmo_session";

const SESSION_TTL_DAYS: i64 = 14;

/// Claims
///
/// Payload of the session JWT. The data service signs it with the shared secret; the web
/// layer only validates it before forwarding it as a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: Uuid,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Session
///
/// A validated session token of the current request. Having a session does not mean the
/// viewer exists: the user may have been deleted since the token was issued, which is why
/// the viewer itself always comes from the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

impl Session {
    /// Resolves the session from the session cookie, or from an `Authorization: Bearer`
    /// header for non-browser clients. Invalid or expired tokens resolve to `None`.
    pub fn from_headers(headers: &HeaderMap, config: &AppConfig) -> Option<Session> {
        let jar = CookieJar::from_headers(headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(str::to_string)
            })?;

        let claims = decode_token(&token, &config.jwt_secret)?;
        Some(Session {
            token,
            user_id: claims.sub,
        })
    }
}

/// Validates signature and expiry of a session token.
pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                _ => tracing::warn!(error = %e, "rejected malformed session token"),
            }
            None
        }
    }
}

/// Signs a session token. Used by the in-memory data service; the real service issues
/// its own tokens with the same secret.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + ttl.as_secs()) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Cookie storing a freshly issued session token.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure())
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Expired cookie that makes the browser drop the session.
pub fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure())
        .max_age(time::Duration::ZERO)
        .build()
}
