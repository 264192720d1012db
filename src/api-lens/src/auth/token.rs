use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose};
use cookie::{Cookie, SameSite};
use data_model_lens::models::UserId;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "page_lens_session";

/// How far ahead of this server's clock a token's issue time may be.
const MAX_CLOCK_SKEW_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token issued in the future")]
    IssuedInFuture,

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Generate an identity token with format: user_id:issued_at:nonce:signature
/// The signature is HMAC-SHA256(user_id:issued_at:nonce, secret)
pub fn generate_token(user_id: UserId, secret: &str) -> Result<String, TokenError> {
    let issued_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    generate_token_at(user_id, issued_at, secret)
}

fn generate_token_at(user_id: UserId, issued_at: u64, secret: &str) -> Result<String, TokenError> {
    let nonce: [u8; 16] = rand::random();
    let nonce_b64 = general_purpose::URL_SAFE_NO_PAD.encode(nonce);

    let payload = format!("{}:{}:{}", user_id, issued_at, nonce_b64);
    let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac(&payload, secret)?.finalize().into_bytes());

    Ok(format!("{}:{}", payload, signature))
}

/// Verifies the signature and age of a token and returns the user it was issued to.
pub fn verify_token(token: &str, secret: &str, max_age_secs: u64) -> Result<UserId, TokenError> {
    let (payload, provided_signature) = token.rsplit_once(':').ok_or(TokenError::InvalidFormat)?;

    let parts: Vec<&str> = payload.split(':').collect();
    let [user_id, issued_at, _nonce] = parts.as_slice() else {
        return Err(TokenError::InvalidFormat);
    };

    let signature = general_purpose::URL_SAFE_NO_PAD.decode(provided_signature)?;
    // verify_slice compares in constant time
    mac(payload, secret)?
        .verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let issued_at: u64 = issued_at.parse().map_err(|_| TokenError::InvalidFormat)?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    if issued_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
        return Err(TokenError::IssuedInFuture);
    }
    if now.saturating_sub(issued_at) > max_age_secs {
        return Err(TokenError::Expired);
    }

    user_id.parse().map_err(|_| TokenError::InvalidFormat)
}

fn mac(payload: &str, secret: &str) -> Result<HmacSha256, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| TokenError::HmacError(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// The token from `Authorization: Bearer <token>`, else from the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find_map(parse_session_cookie)
    })
}

/// Create a session cookie with the token
pub fn create_session_cookie(token: &str, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX)))
        .path("/")
        .build()
}

/// Create a cookie to clear the session (for logout)
pub fn create_logout_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(0))
        .path("/")
        .build()
}

/// Parse the session token from a Cookie header
pub fn parse_session_cookie(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
