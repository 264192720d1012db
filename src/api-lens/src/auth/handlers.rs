use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use data_model_lens::api::{LoginPayload, RegisterPayload, TokenResponse};
use data_model_lens::models::{User, UserId};
use std::time::Instant;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use super::password::{MIN_PASSWORD_LENGTH, hash_password, verify_password};
use super::token::{create_logout_cookie, create_session_cookie, generate_token};
use crate::errors::AuthError;
use crate::state::AppState;

const MIN_LOGIN_DURATION: Duration = Duration::from_secs(1);

/// POST /api/auth/register
/// Creates an account and signs the new user in.
pub async fn post_register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    let email = payload.email.trim();

    if username.is_empty() {
        return Err(AuthError::InvalidRegistration("username must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::InvalidRegistration("email is not valid".to_string()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidRegistration(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let password_hash = hash_password(&payload.password, state.auth.password_hash_cost)?;
    let user = User::new(username.to_string(), email.to_string(), password_hash);
    state.users.insert_user(&user).await.inspect_err(|e| warn!("Registration of {} failed: {}", username, e))?;
    info!("Registered user {} ({})", user.id, user.username);

    let (body, cookie) = sign_in(&state, user.id)?;
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(body)))
}

/// POST /api/auth/login
/// Authenticates by username or email, enforces minimum 1-second response time
pub async fn post_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let start = Instant::now();
    let Json(payload) = payload?;

    let user = state.users.find_user_by_identifier(payload.identifier.trim()).await?;
    let is_valid = match &user {
        Some(user) => verify_password(&payload.password, &user.password_hash)?,
        None => false,
    };

    // Same response time whether the account exists or not
    let elapsed = start.elapsed();
    if elapsed < MIN_LOGIN_DURATION {
        sleep(MIN_LOGIN_DURATION - elapsed).await;
    }

    let user = match user {
        Some(user) if is_valid => user,
        _ => {
            warn!("Failed login attempt for {}", payload.identifier);
            return Err(AuthError::InvalidCredentials);
        }
    };

    debug!("Successful login for {}", user.id);
    let (body, cookie) = sign_in(&state, user.id)?;
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)))
}

/// POST /api/auth/logout
/// Clears the session cookie. Bearer tokens stay valid until they expire.
pub async fn post_logout() -> impl IntoResponse {
    debug!("User logged out");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, create_logout_cookie().to_string())],
        Json(serde_json::json!({"success": true})),
    )
}

/// Issues a token for `user_id`, returned both in the body and as a session cookie.
fn sign_in(state: &AppState, user_id: UserId) -> Result<(TokenResponse, String), AuthError> {
    let token = generate_token(user_id, &state.auth.token_secret)?;
    let cookie = create_session_cookie(&token, state.auth.token_duration_seconds).to_string();
    Ok((
        TokenResponse {
            user_id,
            token,
            expires_in: state.auth.token_duration_seconds,
        },
        cookie,
    ))
}
